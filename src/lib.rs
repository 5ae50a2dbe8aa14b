//! # treewatch
//!
//! Runtime introspection for a tree of reactive UI nodes.
//!
//! treewatch keeps a model of the live node tree supplied by a host, records
//! which nodes reacted and why, simulates how an activation spreads to
//! descendants, and lays the tree out for a renderer. It never reaches into a
//! UI framework itself: the host is abstracted behind [`HostAdapter`].
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Visualizer                          │
//! │                                                              │
//! │  HostAdapter ──scan──▶ NodeRegistry ──▶ TreeQuery            │
//! │                          ▲   │                               │
//! │                          │   └────────▶ GraphLayoutEngine    │
//! │   PropagationTracker ────┘                                   │
//! │   EventMonitor (events, cycles)                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`registry`]**: the flat node set and identity-preserving re-scan; the
//!   only place node state changes
//! - **[`monitor`]**: activation events grouped into bounded cycles
//! - **[`propagation`]**: propagation depth analysis and simulated cascades
//! - **[`layout`]**: breadth-first layered layout
//! - **[`query`]**: read-only lookups, counts and filtered views
//! - **[`host`]**: the [`HostAdapter`] trait plus memory, file and channel hosts
//! - **[`visualizer`]**: wires everything together and runs the re-scan timer
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use treewatch::{HostNodeRef, NodeRegistry, StaticHost, TreeQuery};
//!
//! let host = StaticHost::new(vec![
//!     HostNodeRef::new("app")
//!         .type_name("AppRoot")
//!         .child(HostNodeRef::new("list").type_name("UserList")),
//! ]);
//!
//! let registry = Arc::new(NodeRegistry::new());
//! registry.scan(&host);
//! registry.increment_activation("list", None, None);
//!
//! let query = TreeQuery::new(registry.clone());
//! assert_eq!(query.find_by_selector("<user-list>").len(), 1);
//! assert_eq!(query.path_to_root("list").len(), 2);
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod host;
pub mod layout;
pub mod monitor;
pub mod propagation;
pub mod query;
pub mod registry;
pub mod visualizer;

pub use crate::config::{Environment, MonitorConfig, MonitorConfigBuilder};
pub use error::{ConfigError, HostAdapterError, Result, TreewatchError};
pub use export::{ExportDocument, Statistics};
pub use host::{ChannelHost, FnHost, HostAdapter, HostNodeRef, JsonFileHost, StaticHost};
pub use layout::{GraphLayoutEngine, GraphView, LayoutConfig};
pub use monitor::EventMonitor;
pub use propagation::{compute_propagation_depth, PropagationConfig, PropagationTracker};
pub use query::{FilterMode, TreeFilter, TreeQuery};
pub use registry::{NodeRegistry, ScanOutcome};
pub use visualizer::Visualizer;

pub use treewatch_types::{
    ActivationEvent, Confidence, GraphViewEdge, GraphViewNode, MonitorableNode, ObservationCycle,
    Position, SchemaVersion, TreeSnapshot, TriggerKind, TriggerSource, UpdateStrategy,
};
