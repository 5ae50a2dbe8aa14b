//! Derived graph view types, rebuilt on every render pass.

use alloc::string::String;

/// A 2D position produced by the layout engine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A node as seen by a renderer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphViewNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub is_trigger_source: bool,
    /// Zero when the node is not part of a propagation.
    pub propagation_depth: usize,
}

impl GraphViewNode {
    /// An unpositioned view node.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            x: 0.0,
            y: 0.0,
            is_trigger_source: false,
            propagation_depth: 0,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// A parent-to-child edge as seen by a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphViewEdge {
    pub source_id: String,
    pub target_id: String,
    /// True when the target's activation was propagated from the source.
    pub is_propagation_path: bool,
}

impl GraphViewEdge {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            is_propagation_path: false,
        }
    }
}
