//! Activation events and the cycles that group them.

use alloc::string::String;
use alloc::vec::Vec;

use crate::TriggerKind;

/// A single "this node just reacted" record. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActivationEvent {
    pub id: String,
    /// Unix timestamp in milliseconds.
    pub timestamp_ms: u64,
    pub node_id: String,
    pub trigger: TriggerKind,
    pub is_manual: bool,
}

/// A bounded window grouping activations that happened together.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObservationCycle {
    pub id: String,
    pub start_ms: u64,

    /// Absent while the cycle is open.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub end_ms: Option<u64>,

    pub events: Vec<ActivationEvent>,

    /// Distinct node ids touched by `events`, in first-seen order.
    pub affected_node_ids: Vec<String>,
}

impl ObservationCycle {
    /// Open a new, empty cycle.
    pub fn open(id: impl Into<String>, start_ms: u64) -> Self {
        Self {
            id: id.into(),
            start_ms,
            end_ms: None,
            events: Vec::new(),
            affected_node_ids: Vec::new(),
        }
    }

    /// Attach an event, keeping `affected_node_ids` free of duplicates.
    pub fn attach(&mut self, event: ActivationEvent) {
        if !self.affects(&event.node_id) {
            self.affected_node_ids.push(event.node_id.clone());
        }
        self.events.push(event);
    }

    /// Returns true if any attached event targeted `node_id`.
    pub fn affects(&self, node_id: &str) -> bool {
        self.affected_node_ids.iter().any(|id| id == node_id)
    }

    pub fn is_open(&self) -> bool {
        self.end_ms.is_none()
    }

    /// Wall-clock length of a closed cycle.
    pub fn duration_ms(&self) -> Option<u64> {
        self.end_ms.map(|end| end.saturating_sub(self.start_ms))
    }
}
