//! Node types - one entry in the observed UI tree.

use alloc::string::String;
use alloc::vec::Vec;

/// How a node decides to re-evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum UpdateStrategy {
    /// Re-evaluates on every host cycle.
    #[default]
    Eager,
    /// Re-evaluates only when explicitly marked.
    Lazy,
}

impl UpdateStrategy {
    /// Returns a short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            UpdateStrategy::Eager => "eager",
            UpdateStrategy::Lazy => "lazy",
        }
    }
}

/// What caused an activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum TriggerKind {
    UserInteraction,
    AsyncOperation,
    InputChange,
    OutputEvent,
    SignalUpdate,
    ManualTrigger,
    #[default]
    Unknown,
}

impl TriggerKind {
    /// Guess a trigger kind from a host task-source label such as
    /// `"HTMLButtonElement.addEventListener:click"` or `"setTimeout"`.
    ///
    /// This is a substring heuristic; anything unrecognised is [`TriggerKind::Unknown`].
    pub fn classify(source: &str) -> Self {
        const USER: &[&str] = &["click", "input", "change"];
        const ASYNC: &[&str] = &["XMLHttpRequest", "fetch", "Promise", "setTimeout", "setInterval"];

        if USER.iter().any(|needle| source.contains(needle)) {
            TriggerKind::UserInteraction
        } else if ASYNC.iter().any(|needle| source.contains(needle)) {
            TriggerKind::AsyncOperation
        } else {
            TriggerKind::Unknown
        }
    }

    /// Returns the display label for this trigger kind.
    pub fn label(&self) -> &'static str {
        match self {
            TriggerKind::UserInteraction => "user-interaction",
            TriggerKind::AsyncOperation => "async-operation",
            TriggerKind::InputChange => "input-change",
            TriggerKind::OutputEvent => "output-event",
            TriggerKind::SignalUpdate => "signal-update",
            TriggerKind::ManualTrigger => "manual-trigger",
            TriggerKind::Unknown => "unknown",
        }
    }
}

/// How sure the reporter is about a trigger attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Describes the origin of a propagation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriggerSource {
    pub kind: TriggerKind,
    pub confidence: Confidence,
    pub details: String,
}

impl TriggerSource {
    /// Create a trigger source.
    pub fn new(kind: TriggerKind, confidence: Confidence, details: impl Into<String>) -> Self {
        Self {
            kind,
            confidence,
            details: details.into(),
        }
    }

    /// A trigger the caller caused directly, e.g. a simulated or manual activation.
    pub fn certain(kind: TriggerKind, details: impl Into<String>) -> Self {
        Self::new(kind, Confidence::High, details)
    }
}

/// One node of the observed tree.
///
/// The tree is stored flat: `parent` and `children` hold ids, never owned nodes,
/// so a node can be copied out of the registry without dragging its subtree along.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonitorableNode {
    /// Stable identity, preserved across re-scans for the same logical node.
    pub id: String,
    pub name: String,
    pub selector: String,
    pub update_strategy: UpdateStrategy,

    /// Parent id; `None` for roots.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub parent: Option<String>,

    /// Child ids in discovery order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub children: Vec<String>,

    /// Number of activations observed. Only an explicit history clear resets it.
    pub activation_count: u64,

    /// True while a recent activation is still fresh.
    pub is_active: bool,

    /// Unix timestamp (ms) of the last transition to active.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub last_activation_ms: Option<u64>,

    /// Distance from this node's root.
    pub depth: usize,

    /// Set only on the node that originated a propagation.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub trigger_source: Option<TriggerSource>,

    /// Id of the node whose activation caused this one.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub propagated_from: Option<String>,
}

impl MonitorableNode {
    /// Create a root-level node with no activity.
    pub fn new(id: impl Into<String>, name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            selector: selector.into(),
            update_strategy: UpdateStrategy::Eager,
            parent: None,
            children: Vec::new(),
            activation_count: 0,
            is_active: false,
            last_activation_ms: None,
            depth: 0,
            trigger_source: None,
            propagated_from: None,
        }
    }

    /// Returns true if the node has no parent.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_lazy(&self) -> bool {
        self.update_strategy == UpdateStrategy::Lazy
    }

    /// A true origin: carries a trigger source and was not itself propagated to.
    pub fn is_propagation_origin(&self) -> bool {
        self.trigger_source.is_some() && self.propagated_from.is_none()
    }

    /// Returns true if the node has ever been activated or is active now.
    pub fn has_activity(&self) -> bool {
        self.is_active || self.activation_count > 0
    }
}
