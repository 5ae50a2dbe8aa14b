//! Node registry: the flat node set and its identity-preserving re-scan.
//!
//! The registry is the only component that mutates node state. Everything
//! else reads it through [`NodeRegistry::snapshot`], [`NodeRegistry::get`] or
//! [`NodeRegistry::with_nodes`].

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use treewatch_types::{current_timestamp_ms, MonitorableNode, TreeSnapshot, TriggerSource};

use crate::error::HostAdapterError;
use crate::host::{HostAdapter, HostNodeRef};

/// What a call to [`NodeRegistry::scan`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A new tree with this many nodes was installed.
    Completed { nodes: usize },
    /// The host failed or returned malformed data; the tree is now empty.
    Failed,
    /// Another scan was in flight; nothing changed.
    Skipped,
}

/// Flat storage for one scan's worth of nodes.
#[derive(Debug, Default)]
struct RegistryState {
    /// Nodes in discovery (pre-order) order.
    nodes: Vec<MonitorableNode>,
    /// id -> position in `nodes`.
    index: HashMap<String, usize>,
    /// Positions of root nodes, in host order.
    roots: Vec<usize>,
}

impl RegistryState {
    /// Build a fresh state from the host's root list.
    ///
    /// Rejects empty and duplicate ids so the uniqueness invariant holds for
    /// every installed tree.
    fn build(roots: &[HostNodeRef]) -> Result<Self, HostAdapterError> {
        let total = roots.iter().map(HostNodeRef::subtree_len).sum();
        let mut state = Self {
            nodes: Vec::with_capacity(total),
            index: HashMap::with_capacity(total),
            roots: Vec::with_capacity(roots.len()),
        };
        let mut stack: Vec<(&HostNodeRef, Option<&str>, usize)> =
            roots.iter().rev().map(|root| (root, None, 0)).collect();

        while let Some((host_node, parent, depth)) = stack.pop() {
            if host_node.id.is_empty() {
                return Err(HostAdapterError::Malformed("node with empty id".to_string()));
            }
            if state.index.contains_key(&host_node.id) {
                return Err(HostAdapterError::Malformed(format!(
                    "duplicate id `{}`",
                    host_node.id
                )));
            }

            let mut node = MonitorableNode::new(
                host_node.id.clone(),
                host_node.resolved_name(),
                host_node.resolved_selector(),
            );
            node.update_strategy = host_node.resolved_strategy();
            node.parent = parent.map(str::to_string);
            node.depth = depth;
            node.children = host_node.children.iter().map(|c| c.id.clone()).collect();

            let position = state.nodes.len();
            state.index.insert(host_node.id.clone(), position);
            if parent.is_none() {
                state.roots.push(position);
            }
            state.nodes.push(node);

            for child in host_node.children.iter().rev() {
                stack.push((child, Some(host_node.id.as_str()), depth + 1));
            }
        }

        Ok(state)
    }

    /// Carry accumulated activity forward from `previous` for every id that survived.
    fn merge_from(&mut self, previous: &RegistryState) {
        for node in &mut self.nodes {
            let Some(old) = previous.get(&node.id) else {
                continue;
            };
            node.activation_count = old.activation_count;
            node.is_active = old.is_active;
            node.last_activation_ms = old.last_activation_ms;
            node.trigger_source = old.trigger_source.clone();
            node.propagated_from = old.propagated_from.clone();
        }
    }

    fn get(&self, id: &str) -> Option<&MonitorableNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut MonitorableNode> {
        let position = *self.index.get(id)?;
        self.nodes.get_mut(position)
    }
}

/// Clears the scanning flag when dropped, whatever path the scan took.
struct ScanGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ScanGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Stores the observed tree and owns all node mutation.
///
/// Share it as `Arc<NodeRegistry>`; every method takes `&self`.
///
/// # Example
///
/// ```
/// use treewatch::{HostNodeRef, NodeRegistry, StaticHost};
///
/// let host = StaticHost::new(vec![
///     HostNodeRef::new("app").child(HostNodeRef::new("nav")),
/// ]);
/// let registry = NodeRegistry::new();
/// registry.scan(&host);
///
/// registry.increment_activation("nav", None, None);
/// assert_eq!(registry.get("nav").unwrap().activation_count, 1);
/// ```
#[derive(Debug)]
pub struct NodeRegistry {
    state: RwLock<RegistryState>,
    scanning: AtomicBool,
    revision: watch::Sender<u64>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: RwLock::new(RegistryState::default()),
            scanning: AtomicBool::new(false),
            revision,
        }
    }

    /// Rebuild the tree from the host.
    ///
    /// Nodes whose id existed before keep their activation count, activity,
    /// timestamp and propagation info; structure and metadata always come from
    /// the new scan. If the host fails, panics or returns malformed data the
    /// registry ends up empty. A scan requested while another is running is
    /// dropped.
    pub fn scan(&self, host: &dyn HostAdapter) -> ScanOutcome {
        let Some(_guard) = ScanGuard::acquire(&self.scanning) else {
            debug!(host = host.description(), "scan already in progress, skipping");
            return ScanOutcome::Skipped;
        };

        let built = read_roots(host).and_then(|roots| RegistryState::build(&roots));

        let (mut fresh, outcome) = match built {
            Ok(fresh) => {
                let nodes = fresh.nodes.len();
                (fresh, ScanOutcome::Completed { nodes })
            }
            Err(e) => {
                warn!(host = host.description(), error = %e, "host scan failed, clearing tree");
                (RegistryState::default(), ScanOutcome::Failed)
            }
        };

        {
            let mut state = self.state.write();
            fresh.merge_from(&state);
            *state = fresh;
        }
        self.bump_revision();

        if let ScanOutcome::Completed { nodes } = outcome {
            debug!(host = host.description(), nodes, "scan complete");
        }
        outcome
    }

    /// Returns true while a scan is running.
    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::Acquire)
    }

    /// Set a node's active flag.
    ///
    /// Becoming active stamps `last_activation_ms`; becoming inactive keeps the
    /// last stamp for display. Returns false for an unknown id.
    pub fn mark_active(&self, id: &str, active: bool) -> bool {
        let updated = {
            let mut state = self.state.write();
            match state.get_mut(id) {
                Some(node) => {
                    if active && !node.is_active {
                        node.last_activation_ms = Some(current_timestamp_ms());
                    }
                    node.is_active = active;
                    true
                }
                None => false,
            }
        };

        if updated {
            self.bump_revision();
        } else {
            debug!(id, "mark_active on unknown node");
        }
        updated
    }

    /// Record one activation of a node.
    ///
    /// Increments the count, marks it active and stamps the time. `trigger` and
    /// `propagated_from` are recorded when given and left alone otherwise.
    /// Returns false for an unknown id.
    pub fn increment_activation(
        &self,
        id: &str,
        trigger: Option<TriggerSource>,
        propagated_from: Option<&str>,
    ) -> bool {
        let updated = {
            let mut state = self.state.write();
            match state.get_mut(id) {
                Some(node) => {
                    node.activation_count += 1;
                    node.is_active = true;
                    node.last_activation_ms = Some(current_timestamp_ms());
                    if let Some(trigger) = trigger {
                        node.trigger_source = Some(trigger);
                    }
                    if let Some(from) = propagated_from {
                        node.propagated_from = Some(from.to_string());
                    }
                    true
                }
                None => false,
            }
        };

        if updated {
            self.bump_revision();
        } else {
            debug!(id, "increment_activation on unknown node");
        }
        updated
    }

    /// Record an activation that starts a new propagation at `id`.
    ///
    /// Like [`increment_activation`](Self::increment_activation) with a trigger,
    /// but also drops any `propagated_from` left by an earlier cascade so the
    /// node counts as an origin again. Returns false for an unknown id.
    pub fn begin_propagation(&self, id: &str, trigger: TriggerSource) -> bool {
        let updated = {
            let mut state = self.state.write();
            match state.get_mut(id) {
                Some(node) => {
                    node.activation_count += 1;
                    node.is_active = true;
                    node.last_activation_ms = Some(current_timestamp_ms());
                    node.trigger_source = Some(trigger);
                    node.propagated_from = None;
                    true
                }
                None => false,
            }
        };

        if updated {
            self.bump_revision();
        }
        updated
    }

    /// Mark every node inactive. Counts are untouched.
    pub fn reset_activity(&self) {
        {
            let mut state = self.state.write();
            for node in &mut state.nodes {
                node.is_active = false;
            }
        }
        self.bump_revision();
    }

    /// Forget all accumulated activity: counts, flags, timestamps and
    /// propagation info. Structure is untouched.
    pub fn clear_activation_history(&self) {
        {
            let mut state = self.state.write();
            for node in &mut state.nodes {
                node.activation_count = 0;
                node.is_active = false;
                node.last_activation_ms = None;
                node.trigger_source = None;
                node.propagated_from = None;
            }
        }
        info!("activation history cleared");
        self.bump_revision();
    }

    /// Copy the current tree out of the registry.
    pub fn snapshot(&self) -> TreeSnapshot {
        let state = self.state.read();
        let roots = state.roots.iter().map(|&i| state.nodes[i].clone()).collect();
        TreeSnapshot::new(state.nodes.clone(), roots)
    }

    /// Copy one node out of the registry.
    pub fn get(&self, id: &str) -> Option<MonitorableNode> {
        self.state.read().get(id).cloned()
    }

    /// Run `f` over the current nodes (discovery order) without copying them.
    pub fn with_nodes<R>(&self, f: impl FnOnce(&[MonitorableNode]) -> R) -> R {
        f(&self.state.read().nodes)
    }

    /// Ids of the root nodes in host order.
    pub fn root_ids(&self) -> Vec<String> {
        let state = self.state.read();
        state.roots.iter().map(|&i| state.nodes[i].id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().nodes.is_empty()
    }

    /// Subscribe to change notifications.
    ///
    /// The value is a revision counter that increases after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Current revision counter.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

/// Ask the host for its roots, turning a panic into an error.
fn read_roots(host: &dyn HostAdapter) -> Result<Vec<HostNodeRef>, HostAdapterError> {
    match panic::catch_unwind(AssertUnwindSafe(|| host.roots())) {
        Ok(result) => result,
        Err(payload) => Err(HostAdapterError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
