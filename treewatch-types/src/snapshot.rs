//! TreeSnapshot - a point-in-time copy of the observed tree.

use alloc::string::String;
use alloc::vec::Vec;

use crate::MonitorableNode;

/// A point-in-time copy of every node in the registry.
///
/// Snapshots are values: later registry mutations never show through.
///
/// # Example
///
/// ```rust
/// use treewatch_types::{MonitorableNode, TreeSnapshot};
///
/// let root = MonitorableNode::new("root", "Root", "<root>");
/// let snapshot = TreeSnapshot::with_timestamp(1703160000000, vec![root.clone()], vec![root]);
///
/// assert_eq!(snapshot.len(), 1);
/// assert!(snapshot.get("root").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TreeSnapshot {
    /// Unix timestamp in milliseconds when this snapshot was taken.
    pub timestamp_ms: u64,

    /// All nodes in discovery (pre-order) order.
    pub nodes: Vec<MonitorableNode>,

    /// The top-level nodes, in host order.
    pub root_nodes: Vec<MonitorableNode>,
}

impl TreeSnapshot {
    /// Create a snapshot stamped with the current time.
    #[cfg(feature = "std")]
    pub fn new(nodes: Vec<MonitorableNode>, root_nodes: Vec<MonitorableNode>) -> Self {
        Self::with_timestamp(crate::current_timestamp_ms(), nodes, root_nodes)
    }

    /// Create a snapshot with a specific timestamp.
    pub fn with_timestamp(
        timestamp_ms: u64,
        nodes: Vec<MonitorableNode>,
        root_nodes: Vec<MonitorableNode>,
    ) -> Self {
        Self {
            timestamp_ms,
            nodes,
            root_nodes,
        }
    }

    /// Check if the snapshot is empty (no nodes).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes in the snapshot.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Get a node by id.
    pub fn get(&self, id: &str) -> Option<&MonitorableNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Iterate over all node ids.
    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.nodes.iter().map(|n| &n.id)
    }

    /// Total activations across all nodes.
    pub fn total_activations(&self) -> u64 {
        self.nodes.iter().map(|n| n.activation_count).sum()
    }
}
