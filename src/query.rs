//! Read-only queries over the node registry.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use treewatch_types::MonitorableNode;

use crate::registry::NodeRegistry;

/// Which nodes a filtered view keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    #[default]
    All,
    /// Only nodes that are active right now.
    ActiveOnly,
    /// Only nodes with the lazy update strategy.
    LazyOnly,
    /// Only nodes activated at least once.
    ModifiedOnly,
}

impl FilterMode {
    fn keeps(&self, node: &MonitorableNode) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::ActiveOnly => node.is_active,
            FilterMode::LazyOnly => node.is_lazy(),
            FilterMode::ModifiedOnly => node.activation_count > 0,
        }
    }
}

/// Criteria for [`TreeQuery::filtered`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeFilter {
    pub mode: FilterMode,
    /// Names or selectors to hide.
    pub exclude: Vec<String>,
    /// Hide nodes that have never been activated and are not active.
    pub show_only_changes: bool,
}

impl TreeFilter {
    pub fn matches(&self, node: &MonitorableNode) -> bool {
        if self
            .exclude
            .iter()
            .any(|excluded| *excluded == node.name || *excluded == node.selector)
        {
            return false;
        }
        if self.show_only_changes && !node.has_activity() {
            return false;
        }
        self.mode.keeps(node)
    }
}

/// Read-only query surface over a shared [`NodeRegistry`].
///
/// Every result is an owned copy; nothing returned here can mutate the registry.
#[derive(Debug, Clone)]
pub struct TreeQuery {
    registry: Arc<NodeRegistry>,
}

impl TreeQuery {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self { registry }
    }

    pub fn find_by_id(&self, id: &str) -> Option<MonitorableNode> {
        self.registry.get(id)
    }

    /// All nodes whose selector equals `selector`.
    pub fn find_by_selector(&self, selector: &str) -> Vec<MonitorableNode> {
        self.collect(|n| n.selector == selector)
    }

    /// All nodes whose name starts with `prefix`.
    pub fn find_by_name_prefix(&self, prefix: &str) -> Vec<MonitorableNode> {
        self.collect(|n| n.name.starts_with(prefix))
    }

    /// All nodes whose name contains `fragment`.
    pub fn find_by_name_containing(&self, fragment: &str) -> Vec<MonitorableNode> {
        self.collect(|n| n.name.contains(fragment))
    }

    /// The chain of nodes from the root down to `id`, inclusive.
    ///
    /// Empty when `id` is unknown.
    pub fn path_to_root(&self, id: &str) -> Vec<MonitorableNode> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(id.to_string());

        while let Some(current) = next.take() {
            if !seen.insert(current.clone()) {
                break;
            }
            let Some(node) = self.registry.get(&current) else {
                break;
            };
            next = node.parent.clone();
            path.push(node);
        }

        path.reverse();
        path
    }

    pub fn node_count(&self) -> usize {
        self.registry.len()
    }

    pub fn root_count(&self) -> usize {
        self.count(MonitorableNode::is_root)
    }

    pub fn lazy_count(&self) -> usize {
        self.count(MonitorableNode::is_lazy)
    }

    pub fn active_count(&self) -> usize {
        self.count(|n| n.is_active)
    }

    pub fn total_activations(&self) -> u64 {
        self.registry
            .with_nodes(|nodes| nodes.iter().map(|n| n.activation_count).sum())
    }

    /// Nodes passing `filter`, in discovery order.
    pub fn filtered(&self, filter: &TreeFilter) -> Vec<MonitorableNode> {
        self.collect(|n| filter.matches(n))
    }

    fn collect(&self, pred: impl Fn(&MonitorableNode) -> bool) -> Vec<MonitorableNode> {
        self.registry
            .with_nodes(|nodes| nodes.iter().filter(|n| pred(n)).cloned().collect())
    }

    fn count(&self, pred: impl Fn(&MonitorableNode) -> bool) -> usize {
        self.registry
            .with_nodes(|nodes| nodes.iter().filter(|n| pred(n)).count())
    }
}
