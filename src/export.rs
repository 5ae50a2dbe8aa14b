//! JSON export of the monitor state.

use serde::{Deserialize, Serialize};
use treewatch_types::{
    current_timestamp_ms, ActivationEvent, ObservationCycle, SchemaVersion, TreeSnapshot,
    SCHEMA_VERSION,
};

use crate::config::MonitorConfig;
use crate::error::{Result, TreewatchError};
use crate::monitor::EventMonitor;
use crate::query::TreeQuery;

/// Summary counters over the tree and the event history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub node_count: usize,
    pub root_count: usize,
    pub lazy_count: usize,
    pub active_count: usize,
    pub total_activations: u64,
    pub event_count: usize,
    pub cycle_count: usize,
}

impl Statistics {
    pub fn collect(query: &TreeQuery, monitor: &EventMonitor) -> Self {
        Self {
            node_count: query.node_count(),
            root_count: query.root_count(),
            lazy_count: query.lazy_count(),
            active_count: query.active_count(),
            total_activations: query.total_activations(),
            event_count: monitor.event_count(),
            cycle_count: monitor.cycle_count(),
        }
    }
}

/// Everything the monitor knows, in one serializable document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub version: SchemaVersion,
    pub timestamp_ms: u64,
    pub config: MonitorConfig,
    pub tree: TreeSnapshot,
    pub events: Vec<ActivationEvent>,
    pub cycles: Vec<ObservationCycle>,
    pub statistics: Statistics,
}

impl ExportDocument {
    pub fn new(
        config: MonitorConfig,
        tree: TreeSnapshot,
        monitor: &EventMonitor,
        statistics: Statistics,
    ) -> Self {
        Self {
            version: SchemaVersion::current(),
            timestamp_ms: current_timestamp_ms(),
            config,
            tree,
            events: monitor.events().cloned().collect(),
            cycles: monitor.cycles().cloned().collect(),
            statistics,
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(TreewatchError::Export)
    }

    /// Parse a previously written export.
    ///
    /// The version is checked before the rest of the document, so a document
    /// from another major version is reported as such even if its layout no
    /// longer matches.
    pub fn from_json(json: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Header {
            version: SchemaVersion,
        }

        let header: Header = serde_json::from_str(json).map_err(TreewatchError::Import)?;
        if !header.version.is_compatible() {
            return Err(TreewatchError::IncompatibleVersion {
                found: header.version,
                supported: SCHEMA_VERSION,
            });
        }
        serde_json::from_str(json).map_err(TreewatchError::Import)
    }
}
