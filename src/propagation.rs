//! Propagation depth analysis and simulated activation cascades.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::{self, Instant};
use tracing::{debug, info};
use treewatch_types::{MonitorableNode, TriggerKind, TriggerSource};

use crate::registry::NodeRegistry;

/// Compute how far each node sits from the origin of its propagation.
///
/// Origins are nodes carrying a trigger source that were not themselves
/// propagated to; they get depth 0. Depth then grows along the reverse
/// `propagated_from` relation, breadth-first, with the first depth reached
/// winning. Nodes not reachable from any origin are absent from the map.
/// Dangling references and cycles are tolerated.
pub fn compute_propagation_depth(nodes: &[MonitorableNode]) -> HashMap<String, usize> {
    let mut caused: HashMap<&str, Vec<&str>> = HashMap::new();
    for node in nodes {
        if let Some(from) = node.propagated_from.as_deref() {
            caused.entry(from).or_default().push(node.id.as_str());
        }
    }

    let mut depths = HashMap::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<(&str, usize)> = VecDeque::new();

    for node in nodes.iter().filter(|n| n.is_propagation_origin()) {
        if visited.insert(node.id.as_str()) {
            queue.push_back((node.id.as_str(), 0));
        }
    }

    while let Some((id, depth)) = queue.pop_front() {
        depths.insert(id.to_string(), depth);
        for &next in caused.get(id).into_iter().flatten() {
            if visited.insert(next) {
                queue.push_back((next, depth + 1));
            }
        }
    }

    depths
}

/// Timing for simulated cascades.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationConfig {
    /// Added per tree level below the origin.
    pub step_delay: Duration,
    /// Added per sibling index within a parent.
    pub sibling_delay: Duration,
    /// Deepest level a cascade reaches; `None` walks the whole subtree.
    pub max_cascade_depth: Option<usize>,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(150),
            sibling_delay: Duration::from_millis(40),
            max_cascade_depth: None,
        }
    }
}

/// One scheduled activation in a cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CascadeStep {
    node_id: String,
    parent_id: String,
    offset: Duration,
}

/// Plan the cascade below `root_id` in breadth-first, child-index order.
///
/// Offsets never decrease along the plan, so a single task can sleep through
/// them in sequence.
fn plan_cascade(
    nodes: &[MonitorableNode],
    root_id: &str,
    config: &PropagationConfig,
) -> Vec<CascadeStep> {
    let by_id: HashMap<&str, &MonitorableNode> =
        nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let mut steps = Vec::new();
    let mut visited: HashSet<&str> = HashSet::from([root_id]);
    let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(root_id, 0)]);
    let mut last = Duration::ZERO;

    while let Some((parent_id, level)) = queue.pop_front() {
        let child_level = level + 1;
        if config.max_cascade_depth.is_some_and(|max| child_level > max) {
            continue;
        }
        let Some(parent) = by_id.get(parent_id) else {
            continue;
        };

        for (index, child_id) in parent.children.iter().enumerate() {
            if !by_id.contains_key(child_id.as_str()) || !visited.insert(child_id.as_str()) {
                continue;
            }
            let offset = config.step_delay * child_level as u32 + config.sibling_delay * index as u32;
            last = last.max(offset);
            steps.push(CascadeStep {
                node_id: child_id.clone(),
                parent_id: parent_id.to_string(),
                offset: last,
            });
            queue.push_back((child_id.as_str(), child_level));
        }
    }

    steps
}

/// Decrements the running-cascade count when a cascade task ends.
struct PendingCascade {
    pending: Arc<AtomicUsize>,
}

impl PendingCascade {
    fn new(pending: Arc<AtomicUsize>) -> Self {
        pending.fetch_add(1, Ordering::AcqRel);
        Self { pending }
    }
}

impl Drop for PendingCascade {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Runs simulated activation cascades against a registry.
///
/// Every cascade is tagged with the generation current when it started.
/// [`cancel_all`](Self::cancel_all) bumps the generation under the same lock
/// that each step holds while applying, so no step lands after it returns.
#[derive(Debug)]
pub struct PropagationTracker {
    registry: Arc<NodeRegistry>,
    config: PropagationConfig,
    generation: Arc<Mutex<u64>>,
    cancel_tx: watch::Sender<u64>,
    pending: Arc<AtomicUsize>,
}

impl PropagationTracker {
    pub fn new(registry: Arc<NodeRegistry>, config: PropagationConfig) -> Self {
        let (cancel_tx, _) = watch::channel(0);
        Self {
            registry,
            config,
            generation: Arc::new(Mutex::new(0)),
            cancel_tx,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// Depths for the registry's current nodes.
    pub fn current_depths(&self) -> HashMap<String, usize> {
        self.registry.with_nodes(compute_propagation_depth)
    }

    /// Simulate an activation at `root_id` spreading to its subtree.
    ///
    /// The root is activated immediately as the trigger source. Descendants are
    /// activated later, breadth-first, each marked as propagated from its
    /// parent. Returns false if `root_id` is unknown.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn simulate(&self, root_id: &str, kind: TriggerKind, description: &str) -> bool {
        let trigger = TriggerSource::certain(kind, description);
        if !self.registry.begin_propagation(root_id, trigger) {
            debug!(root_id, "simulate on unknown node");
            return false;
        }

        let steps = self
            .registry
            .with_nodes(|nodes| plan_cascade(nodes, root_id, &self.config));
        info!(root_id, kind = kind.label(), steps = steps.len(), "simulating propagation");
        if steps.is_empty() {
            return true;
        }

        let generation = *self.generation.lock();
        let guard = PendingCascade::new(self.pending.clone());
        let registry = self.registry.clone();
        let lock = self.generation.clone();
        let mut cancel_rx = self.cancel_tx.subscribe();

        tokio::spawn(async move {
            let _guard = guard;
            let start = Instant::now();

            for step in steps {
                let cancelled = tokio::select! {
                    _ = time::sleep_until(start + step.offset) => false,
                    _ = cancel_rx.changed() => true,
                };
                if cancelled {
                    return;
                }

                {
                    let current = lock.lock();
                    if *current != generation {
                        return;
                    }
                    registry.increment_activation(&step.node_id, None, Some(&step.parent_id));
                }
                debug!(node = %step.node_id, from = %step.parent_id, "cascade step");
            }
        });

        true
    }

    /// Cancel every running cascade. No cascade step is applied after this returns.
    pub fn cancel_all(&self) {
        let mut generation = self.generation.lock();
        *generation += 1;
        self.cancel_tx.send_replace(*generation);
        drop(generation);

        let pending = self.pending_cascades();
        if pending > 0 {
            debug!(pending, "cancelled cascades");
        }
    }

    /// Number of cascade tasks that have not finished yet.
    pub fn pending_cascades(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

impl Drop for PropagationTracker {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostNodeRef, StaticHost};

    fn node(id: &str) -> MonitorableNode {
        MonitorableNode::new(id, id, format!("<{id}>"))
    }

    fn origin(id: &str) -> MonitorableNode {
        let mut n = node(id);
        n.trigger_source = Some(TriggerSource::certain(TriggerKind::ManualTrigger, "test"));
        n
    }

    fn from(id: &str, parent: &str) -> MonitorableNode {
        let mut n = node(id);
        n.propagated_from = Some(parent.to_string());
        n
    }

    #[test]
    fn depth_is_breadth_first_from_origin() {
        let nodes = vec![origin("A"), from("B", "A"), from("C", "A"), from("D", "B")];
        let depths = compute_propagation_depth(&nodes);

        assert_eq!(depths.len(), 4);
        assert_eq!(depths["A"], 0);
        assert_eq!(depths["B"], 1);
        assert_eq!(depths["C"], 1);
        assert_eq!(depths["D"], 2);
    }

    #[test]
    fn unreachable_nodes_are_absent() {
        let nodes = vec![origin("A"), node("lonely"), from("orphan", "ghost")];
        let depths = compute_propagation_depth(&nodes);

        assert_eq!(depths.len(), 1);
        assert!(!depths.contains_key("lonely"));
        assert!(!depths.contains_key("orphan"));
    }

    #[test]
    fn cycles_terminate() {
        let nodes = vec![origin("A"), from("B", "C"), from("C", "B"), from("X", "A"), from("A2", "X")];
        let depths = compute_propagation_depth(&nodes);

        assert_eq!(depths["X"], 1);
        assert_eq!(depths["A2"], 2);
        assert!(!depths.contains_key("B"));
    }

    #[test]
    fn several_origins_each_start_at_zero() {
        let nodes = vec![origin("A"), origin("Z"), from("B", "A"), from("C", "B"), from("C2", "Z")];
        let depths = compute_propagation_depth(&nodes);

        assert_eq!(depths["Z"], 0);
        assert_eq!(depths["C"], 2);
        assert_eq!(depths["C2"], 1);
    }

    fn tree() -> Vec<MonitorableNode> {
        let mut a = node("A");
        a.children = vec!["B".into(), "C".into()];
        let mut b = node("B");
        b.parent = Some("A".into());
        b.children = vec!["D".into()];
        let mut c = node("C");
        c.parent = Some("A".into());
        let mut d = node("D");
        d.parent = Some("B".into());
        vec![a, b, c, d]
    }

    #[test]
    fn plan_is_breadth_first_with_monotonic_offsets() {
        let plan = plan_cascade(&tree(), "A", &PropagationConfig::default());

        let order: Vec<(&str, &str)> =
            plan.iter().map(|s| (s.node_id.as_str(), s.parent_id.as_str())).collect();
        assert_eq!(order, vec![("B", "A"), ("C", "A"), ("D", "B")]);

        assert_eq!(plan[0].offset, Duration::from_millis(150));
        assert_eq!(plan[1].offset, Duration::from_millis(190));
        assert_eq!(plan[2].offset, Duration::from_millis(300));
        assert!(plan.windows(2).all(|w| w[0].offset <= w[1].offset));
    }

    #[test]
    fn plan_respects_max_depth() {
        let config = PropagationConfig {
            max_cascade_depth: Some(1),
            ..PropagationConfig::default()
        };
        let plan = plan_cascade(&tree(), "A", &config);
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn plan_for_leaf_is_empty() {
        assert!(plan_cascade(&tree(), "D", &PropagationConfig::default()).is_empty());
    }

    fn registry() -> Arc<NodeRegistry> {
        let registry = Arc::new(NodeRegistry::new());
        registry.scan(&StaticHost::new(vec![HostNodeRef::new("A")
            .child(HostNodeRef::new("B").child(HostNodeRef::new("D")))
            .child(HostNodeRef::new("C"))]));
        registry
    }

    #[tokio::test(start_paused = true)]
    async fn simulate_spreads_through_subtree() {
        let registry = registry();
        let tracker = PropagationTracker::new(registry.clone(), PropagationConfig::default());

        assert!(tracker.simulate("A", TriggerKind::UserInteraction, "click"));
        let a = registry.get("A").unwrap();
        assert!(a.is_propagation_origin());
        assert_eq!(a.trigger_source.unwrap().details, "click");
        assert_eq!(registry.get("B").unwrap().activation_count, 0);

        time::sleep(Duration::from_secs(1)).await;

        assert_eq!(registry.get("D").unwrap().propagated_from.as_deref(), Some("B"));
        let depths = tracker.current_depths();
        assert_eq!(depths["A"], 0);
        assert_eq!(depths["B"], 1);
        assert_eq!(depths["C"], 1);
        assert_eq!(depths["D"], 2);
        assert_eq!(tracker.pending_cascades(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn children_fire_after_parents() {
        let registry = registry();
        let tracker = PropagationTracker::new(registry.clone(), PropagationConfig::default());
        tracker.simulate("A", TriggerKind::ManualTrigger, "test");

        time::sleep(Duration::from_millis(160)).await;
        assert_eq!(registry.get("B").unwrap().activation_count, 1);
        assert_eq!(registry.get("C").unwrap().activation_count, 0);
        assert_eq!(registry.get("D").unwrap().activation_count, 0);

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(registry.get("D").unwrap().activation_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn simulate_unknown_root_returns_false() {
        let tracker = PropagationTracker::new(registry(), PropagationConfig::default());
        assert!(!tracker.simulate("ghost", TriggerKind::Unknown, "x"));
        assert_eq!(tracker.pending_cascades(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_stops_pending_steps() {
        let registry = registry();
        let tracker = PropagationTracker::new(registry.clone(), PropagationConfig::default());
        tracker.simulate("A", TriggerKind::ManualTrigger, "test");

        time::sleep(Duration::from_millis(160)).await;
        tracker.cancel_all();
        time::sleep(Duration::from_secs(2)).await;

        assert_eq!(registry.get("B").unwrap().activation_count, 1);
        assert_eq!(registry.get("C").unwrap().activation_count, 0);
        assert_eq!(registry.get("D").unwrap().activation_count, 0);
        assert_eq!(tracker.pending_cascades(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn resimulating_a_propagated_node_makes_it_an_origin() {
        let registry = registry();
        let tracker = PropagationTracker::new(registry.clone(), PropagationConfig::default());
        tracker.simulate("A", TriggerKind::ManualTrigger, "first");
        time::sleep(Duration::from_secs(1)).await;

        tracker.simulate("B", TriggerKind::InputChange, "second");
        time::sleep(Duration::from_secs(1)).await;

        let depths = tracker.current_depths();
        assert_eq!(depths["B"], 0);
        assert_eq!(depths["D"], 1);
        assert_eq!(depths["A"], 0);
        assert_eq!(depths["C"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn simulate_after_cancel_still_runs() {
        let registry = registry();
        let tracker = PropagationTracker::new(registry.clone(), PropagationConfig::default());
        tracker.cancel_all();

        tracker.simulate("B", TriggerKind::SignalUpdate, "count");
        time::sleep(Duration::from_secs(1)).await;

        assert_eq!(registry.get("D").unwrap().activation_count, 1);
        assert_eq!(registry.get("A").unwrap().activation_count, 0);
    }
}
