//! The visualizer: one object wiring the registry, monitor, tracker, layout
//! and query components together around a host.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};
use treewatch_types::{MonitorableNode, TreeSnapshot, TriggerKind};

use crate::config::MonitorConfig;
use crate::error::Result;
use crate::export::{ExportDocument, Statistics};
use crate::host::HostAdapter;
use crate::layout::{GraphLayoutEngine, GraphView};
use crate::monitor::EventMonitor;
use crate::propagation::PropagationTracker;
use crate::query::TreeQuery;
use crate::registry::{NodeRegistry, ScanOutcome};

/// Handle to the background re-scan task.
///
/// The task stops when the handle is stopped or dropped.
#[derive(Debug)]
struct RescanHandle {
    stop_tx: watch::Sender<bool>,
}

impl RescanHandle {
    fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

impl Drop for RescanHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Periodic re-scan task started by [`Visualizer::start_monitoring`].
async fn rescan_loop(
    registry: Arc<NodeRegistry>,
    host: Arc<dyn HostAdapter>,
    epoch: Arc<Mutex<u64>>,
    started: u64,
    period: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let registry = registry.clone();
                let host = host.clone();
                let epoch = epoch.clone();
                let applied = task::spawn_blocking(move || {
                    let current = epoch.lock();
                    if *current != started {
                        return false;
                    }
                    registry.scan(host.as_ref());
                    true
                })
                .await;

                if !matches!(applied, Ok(true)) {
                    break;
                }
            }
        }
    }
    debug!("rescan loop stopped");
}

/// Observes a host's node tree and everything that happens to it.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use treewatch::{HostNodeRef, MonitorConfig, StaticHost, TriggerKind, Visualizer};
///
/// # tokio_test::block_on(async {
/// let host = Arc::new(StaticHost::new(vec![
///     HostNodeRef::new("app").child(HostNodeRef::new("list")),
/// ]));
/// let visualizer = Visualizer::new(host, MonitorConfig::default()).unwrap();
///
/// visualizer.start_monitoring();
/// visualizer.simulate("app", TriggerKind::UserInteraction, "button click");
/// tokio::time::sleep(Duration::from_millis(500)).await;
///
/// assert_eq!(visualizer.statistics().total_activations, 2);
/// visualizer.stop_monitoring();
/// # });
/// ```
#[derive(Debug)]
pub struct Visualizer {
    host: Arc<dyn HostAdapter>,
    config: MonitorConfig,
    registry: Arc<NodeRegistry>,
    monitor: Mutex<EventMonitor>,
    tracker: PropagationTracker,
    layout: GraphLayoutEngine,
    query: TreeQuery,
    rescan: Mutex<Option<RescanHandle>>,
    /// Bumped by every stop. A re-scan applies only while holding this lock
    /// and only if the value still matches the one it was started with.
    epoch: Arc<Mutex<u64>>,
}

impl Visualizer {
    /// Wire up a visualizer for `host`. Fails if the config is invalid.
    pub fn new(host: Arc<dyn HostAdapter>, config: MonitorConfig) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(NodeRegistry::new());
        let tracker = PropagationTracker::new(registry.clone(), config.propagation());
        let query = TreeQuery::new(registry.clone());
        let monitor = EventMonitor::with_max_history_size(config.max_history_size);

        Ok(Self {
            host,
            config,
            registry,
            monitor: Mutex::new(monitor),
            tracker,
            layout: GraphLayoutEngine::default(),
            query,
            rescan: Mutex::new(None),
            epoch: Arc::new(Mutex::new(0)),
        })
    }

    /// Scan once and start the periodic re-scan.
    ///
    /// Returns false, doing nothing, when the config is disabled. Calling it
    /// while already monitoring is a no-op. Must be called from within a Tokio
    /// runtime.
    ///
    /// Periodic scans run on the blocking pool, so hosts may do blocking I/O.
    pub fn start_monitoring(&self) -> bool {
        if !self.config.enabled {
            info!("monitoring disabled by configuration");
            return false;
        }
        if self.is_monitoring() {
            return true;
        }

        // Host code runs here; no visualizer lock may be held.
        self.registry.scan(self.host.as_ref());

        let mut rescan = self.rescan.lock();
        if rescan.is_some() {
            return true;
        }

        let epoch = *self.epoch.lock();
        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(rescan_loop(
            self.registry.clone(),
            self.host.clone(),
            self.epoch.clone(),
            epoch,
            self.config.rescan_interval(),
            stop_rx,
        ));

        info!(
            host = self.host.description(),
            interval_ms = self.config.rescan_interval_ms,
            "monitoring started"
        );
        *rescan = Some(RescanHandle { stop_tx });
        true
    }

    /// Stop the re-scan timer and cancel running cascades.
    ///
    /// Waits for a re-scan already in flight; no re-scan replaces the tree
    /// after this returns. The tree and the event history are kept. Must not
    /// be called from inside a host's `roots`.
    pub fn stop_monitoring(&self) {
        *self.epoch.lock() += 1;
        let handle = self.rescan.lock().take();
        self.tracker.cancel_all();
        if let Some(handle) = handle {
            handle.stop();
            info!("monitoring stopped");
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.rescan.lock().is_some()
    }

    /// Re-scan the host right now.
    pub fn refresh(&self) -> ScanOutcome {
        self.registry.scan(self.host.as_ref())
    }

    /// Record that a node reacted: one event plus one activation.
    ///
    /// Returns false, recording nothing, for an unknown node.
    pub fn record_activation(&self, node_id: &str, trigger: TriggerKind, is_manual: bool) -> bool {
        if !self.registry.increment_activation(node_id, None, None) {
            return false;
        }
        self.monitor.lock().record_event(node_id, trigger, is_manual);
        true
    }

    /// Open a cycle on the monitor.
    pub fn start_cycle(&self) -> String {
        self.monitor.lock().start_cycle()
    }

    /// Close the open cycle, if any.
    pub fn end_cycle(&self) {
        self.monitor.lock().end_cycle();
    }

    /// Simulate a propagation from `root_id` and record it as a manual event.
    pub fn simulate(&self, root_id: &str, kind: TriggerKind, description: &str) -> bool {
        if !self.tracker.simulate(root_id, kind, description) {
            return false;
        }
        self.monitor.lock().record_event(root_id, kind, true);
        true
    }

    /// Forget all events, cycles and per-node activity.
    pub fn clear_history(&self) {
        self.tracker.cancel_all();
        self.monitor.lock().clear_history();
        self.registry.clear_activation_history();
    }

    /// Mark every node inactive.
    pub fn reset_activity(&self) {
        self.registry.reset_activity();
    }

    /// The current tree, filtered by the configured [`TreeFilter`](crate::TreeFilter).
    pub fn filtered_tree(&self) -> Vec<MonitorableNode> {
        self.query.filtered(&self.config.filter)
    }

    pub fn statistics(&self) -> Statistics {
        Statistics::collect(&self.query, &self.monitor.lock())
    }

    pub fn graph_view(&self) -> GraphView {
        self.layout.graph_view(&self.registry.snapshot())
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        self.registry.snapshot()
    }

    pub fn export(&self) -> ExportDocument {
        let monitor = self.monitor.lock();
        let statistics = Statistics::collect(&self.query, &monitor);
        ExportDocument::new(
            self.config.clone(),
            self.registry.snapshot(),
            &monitor,
            statistics,
        )
    }

    /// The full export as pretty-printed JSON.
    pub fn export_json(&self) -> Result<String> {
        self.export().to_json()
    }

    /// Look up a node and its path from the root, logging both in debug mode.
    pub fn focus(&self, id: &str) -> Option<Vec<MonitorableNode>> {
        let path = self.query.path_to_root(id);
        let node = path.last()?;

        if self.config.debug_mode {
            let ids: Vec<&str> = path.iter().map(|n| n.id.as_str()).collect();
            info!(
                id = %node.id,
                name = %node.name,
                selector = %node.selector,
                activations = node.activation_count,
                path = ?ids,
                "focused node"
            );
        }
        Some(path)
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn query(&self) -> &TreeQuery {
        &self.query
    }

    pub fn tracker(&self) -> &PropagationTracker {
        &self.tracker
    }

    pub fn layout(&self) -> &GraphLayoutEngine {
        &self.layout
    }

    /// Lock the event monitor for direct access.
    pub fn monitor(&self) -> MutexGuard<'_, EventMonitor> {
        self.monitor.lock()
    }
}

impl Drop for Visualizer {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FnHost, HostNodeRef, StaticHost};
    use crate::query::FilterMode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{OnceLock, Weak};
    use std::time::Duration;

    fn host() -> Arc<StaticHost> {
        Arc::new(StaticHost::new(vec![HostNodeRef::new("app")
            .type_name("AppRoot")
            .child(HostNodeRef::new("list").type_name("UserList"))
            .child(HostNodeRef::new("footer").type_name("Footer"))]))
    }

    fn visualizer(config: MonitorConfig) -> Visualizer {
        Visualizer::new(host(), config).unwrap()
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = MonitorConfig::builder().max_history_size(0).build();
        assert!(Visualizer::new(host(), config).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn start_scans_and_is_idempotent() {
        let v = visualizer(MonitorConfig::default());
        assert!(v.snapshot().is_empty());

        assert!(v.start_monitoring());
        assert!(v.start_monitoring());
        assert!(v.is_monitoring());
        assert_eq!(v.snapshot().len(), 3);

        v.stop_monitoring();
        v.stop_monitoring();
        assert!(!v.is_monitoring());
        assert_eq!(v.snapshot().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_config_never_starts() {
        let v = visualizer(MonitorConfig::builder().enabled(false).build());
        assert!(!v.start_monitoring());
        assert!(!v.is_monitoring());
        assert!(v.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_rescan_picks_up_host_changes() {
        let host = host();
        let config = MonitorConfig::builder()
            .rescan_interval(Duration::from_millis(100))
            .build();
        let v = Visualizer::new(host.clone(), config).unwrap();
        v.start_monitoring();

        host.set_roots(vec![HostNodeRef::new("solo")]);
        assert_eq!(v.snapshot().len(), 3);

        time::sleep(Duration::from_millis(150)).await;
        assert_eq!(v.snapshot().len(), 1);

        v.stop_monitoring();
        host.set_roots(vec![]);
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(v.snapshot().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn no_rescan_lands_after_stop() {
        let config = MonitorConfig::builder()
            .rescan_interval(Duration::from_millis(1))
            .build();

        for _ in 0..100 {
            let host = Arc::new(StaticHost::new(vec![HostNodeRef::new("a")]));
            let v = Visualizer::new(host.clone(), config.clone()).unwrap();
            v.start_monitoring();
            time::sleep(Duration::from_millis(3)).await;

            v.stop_monitoring();
            host.set_roots(vec![HostNodeRef::new("b"), HostNodeRef::new("c")]);
            time::sleep(Duration::from_millis(10)).await;

            assert_eq!(v.snapshot().len(), 1);
        }
    }

    #[tokio::test]
    async fn host_can_call_back_during_start() {
        let slot: Arc<OnceLock<Weak<Visualizer>>> = Arc::new(OnceLock::new());
        let callbacks = Arc::new(AtomicUsize::new(0));

        let host = {
            let slot = slot.clone();
            let callbacks = callbacks.clone();
            Arc::new(FnHost::new("reentrant", move || {
                if let Some(v) = slot.get().and_then(Weak::upgrade) {
                    let _ = v.is_monitoring();
                    callbacks.fetch_add(1, Ordering::SeqCst);
                }
                Ok(vec![HostNodeRef::new("app")])
            }))
        };

        let v = Arc::new(Visualizer::new(host, MonitorConfig::default()).unwrap());
        slot.set(Arc::downgrade(&v)).unwrap();

        assert!(v.start_monitoring());
        assert_eq!(callbacks.load(Ordering::SeqCst), 1);
        assert!(v.is_monitoring());
        v.stop_monitoring();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn blocking_host_does_not_stall_runtime() {
        let scans = Arc::new(AtomicUsize::new(0));
        let host = {
            let scans = scans.clone();
            Arc::new(FnHost::new("slow", move || {
                scans.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(50));
                Ok(vec![HostNodeRef::new("app")])
            }))
        };
        let config = MonitorConfig::builder()
            .rescan_interval(Duration::from_millis(5))
            .build();
        let v = Visualizer::new(host, config).unwrap();
        v.start_monitoring();

        let mut worst = Duration::ZERO;
        for _ in 0..20 {
            let before = std::time::Instant::now();
            time::sleep(Duration::from_millis(5)).await;
            worst = worst.max(before.elapsed());
        }
        v.stop_monitoring();

        assert!(scans.load(Ordering::SeqCst) >= 2);
        assert!(worst < Duration::from_millis(45), "runtime stalled for {worst:?}");
    }

    #[test]
    fn record_activation_counts_and_logs() {
        let v = visualizer(MonitorConfig::default());
        v.refresh();

        v.start_cycle();
        assert!(v.record_activation("list", TriggerKind::InputChange, false));
        assert!(v.record_activation("list", TriggerKind::InputChange, false));
        assert!(!v.record_activation("ghost", TriggerKind::Unknown, false));
        v.end_cycle();

        assert_eq!(v.query().find_by_id("list").unwrap().activation_count, 2);
        let monitor = v.monitor();
        assert_eq!(monitor.event_count(), 2);
        let cycle = monitor.cycles().next().unwrap();
        assert_eq!(cycle.affected_node_ids, vec!["list"]);
    }

    #[tokio::test(start_paused = true)]
    async fn simulate_records_manual_event() {
        let v = visualizer(MonitorConfig::default());
        v.refresh();

        assert!(v.simulate("app", TriggerKind::SignalUpdate, "counter"));
        assert!(!v.simulate("ghost", TriggerKind::SignalUpdate, "counter"));
        time::sleep(Duration::from_secs(1)).await;

        let events = v.monitor().recent_events();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_manual);
        assert_eq!(v.statistics().total_activations, 3);

        let view = v.graph_view();
        assert_eq!(view.nodes.len(), 3);
        assert!(view.edges.iter().all(|e| e.is_propagation_path));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_cascades() {
        let v = visualizer(MonitorConfig::default());
        v.start_monitoring();
        v.simulate("app", TriggerKind::ManualTrigger, "test");

        v.stop_monitoring();
        time::sleep(Duration::from_secs(1)).await;

        assert_eq!(v.statistics().total_activations, 1);
    }

    #[test]
    fn clear_history_resets_everything() {
        let v = visualizer(MonitorConfig::default());
        v.refresh();
        v.record_activation("footer", TriggerKind::OutputEvent, false);

        v.clear_history();

        let stats = v.statistics();
        assert_eq!(stats.event_count, 0);
        assert_eq!(stats.total_activations, 0);
        assert_eq!(stats.node_count, 3);
    }

    #[test]
    fn filtered_tree_uses_config() {
        let config = MonitorConfig::builder()
            .filter_mode(FilterMode::ModifiedOnly)
            .build();
        let v = visualizer(config);
        v.refresh();
        v.record_activation("footer", TriggerKind::Unknown, false);

        let ids: Vec<String> = v.filtered_tree().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["footer"]);
    }

    #[test]
    fn focus_returns_path() {
        let v = visualizer(MonitorConfig::builder().debug_mode(true).build());
        v.refresh();

        let path = v.focus("list").unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].id, "app");
        assert!(v.focus("ghost").is_none());
    }

    #[test]
    fn export_json_round_trips_statistics() {
        let v = visualizer(MonitorConfig::default());
        v.refresh();
        v.record_activation("app", TriggerKind::UserInteraction, true);

        let doc = ExportDocument::from_json(&v.export_json().unwrap()).unwrap();
        assert_eq!(doc.statistics, v.statistics());
        assert_eq!(doc.events.len(), 1);
        assert_eq!(doc.tree.len(), 3);
    }
}
