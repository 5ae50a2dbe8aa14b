//! Activation event recording and cycle grouping.

use std::collections::VecDeque;

use tracing::debug;
use treewatch_types::{current_timestamp_ms, ActivationEvent, ObservationCycle, TriggerKind};

/// Default cap on stored events and cycles.
pub const DEFAULT_MAX_HISTORY_SIZE: usize = 1000;

/// Number of events returned by [`EventMonitor::recent_events`].
pub const RECENT_EVENTS: usize = 50;

/// Records activation events and groups them into cycles.
///
/// Events and closed cycles live in capped ring buffers; once the cap is
/// exceeded the oldest entries are dropped.
#[derive(Debug, Clone)]
pub struct EventMonitor {
    events: VecDeque<ActivationEvent>,
    cycles: VecDeque<ObservationCycle>,
    current_cycle: Option<ObservationCycle>,
    max_history_size: usize,
    next_event: u64,
    next_cycle: u64,
}

impl Default for EventMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl EventMonitor {
    /// Create a monitor with the default history cap.
    pub fn new() -> Self {
        Self::with_max_history_size(DEFAULT_MAX_HISTORY_SIZE)
    }

    pub fn with_max_history_size(max_history_size: usize) -> Self {
        Self {
            events: VecDeque::new(),
            cycles: VecDeque::new(),
            current_cycle: None,
            max_history_size,
            next_event: 0,
            next_cycle: 0,
        }
    }

    /// Open a new cycle and return its id.
    ///
    /// An already open cycle is discarded without being merged or stored.
    pub fn start_cycle(&mut self) -> String {
        self.next_cycle += 1;
        let id = format!("cycle_{}", self.next_cycle);

        if let Some(previous) = self.current_cycle.take() {
            debug!(
                replaced = %previous.id,
                events = previous.events.len(),
                "discarding unfinished cycle"
            );
        }

        self.current_cycle = Some(ObservationCycle::open(id.clone(), current_timestamp_ms()));
        id
    }

    /// Close the open cycle and move it into history. No-op when none is open.
    pub fn end_cycle(&mut self) -> Option<&ObservationCycle> {
        let mut cycle = self.current_cycle.take()?;
        cycle.end_ms = Some(current_timestamp_ms());

        self.cycles.push_back(cycle);
        truncate_front(&mut self.cycles, self.max_history_size);
        self.cycles.back()
    }

    /// Record an activation and attach it to the open cycle, if any.
    pub fn record_event(
        &mut self,
        node_id: impl Into<String>,
        trigger: TriggerKind,
        is_manual: bool,
    ) -> ActivationEvent {
        self.next_event += 1;
        let event = ActivationEvent {
            id: format!("event_{}", self.next_event),
            timestamp_ms: current_timestamp_ms(),
            node_id: node_id.into(),
            trigger,
            is_manual,
        };

        if let Some(cycle) = self.current_cycle.as_mut() {
            cycle.attach(event.clone());
        }

        self.events.push_back(event.clone());
        truncate_front(&mut self.events, self.max_history_size);
        event
    }

    /// Change the history cap, dropping the oldest entries that no longer fit.
    pub fn set_max_history_size(&mut self, max_history_size: usize) {
        self.max_history_size = max_history_size;
        truncate_front(&mut self.events, max_history_size);
        truncate_front(&mut self.cycles, max_history_size);
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    /// The last [`RECENT_EVENTS`] events, oldest first.
    pub fn recent_events(&self) -> Vec<ActivationEvent> {
        let skip = self.events.len().saturating_sub(RECENT_EVENTS);
        self.events.iter().skip(skip).cloned().collect()
    }

    /// All stored events, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &ActivationEvent> {
        self.events.iter()
    }

    /// All closed cycles, oldest first.
    pub fn cycles(&self) -> impl Iterator<Item = &ObservationCycle> {
        self.cycles.iter()
    }

    pub fn current_cycle(&self) -> Option<&ObservationCycle> {
        self.current_cycle.as_ref()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn cycle_count(&self) -> usize {
        self.cycles.len()
    }

    /// Drop all events and cycles, including an open one. Id counters keep running.
    pub fn clear_history(&mut self) {
        self.events.clear();
        self.cycles.clear();
        self.current_cycle = None;
    }
}

fn truncate_front<T>(buf: &mut VecDeque<T>, max: usize) {
    if buf.len() > max {
        let excess = buf.len() - max;
        buf.drain(..excess);
    }
}
