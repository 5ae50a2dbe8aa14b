//! # treewatch-types
//!
//! Core data model for observing a tree of reactive UI nodes. This crate defines
//! the plain values shared between the treewatch engine, host adapters and any
//! renderer that wants to draw the tree or replay its activity.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature to export or import values
//! - **Framework agnostic**: Nothing here knows which UI framework produced the tree
//! - **Value semantics**: Every type is an owned copy, safe to hand to another thread
//!
//! ## Features
//!
//! - `std` (default): Standard library support (wall-clock timestamps)
//! - `serde`: JSON/MessagePack/etc. serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use treewatch_types::{MonitorableNode, TriggerKind, TriggerSource, UpdateStrategy};
//!
//! let mut node = MonitorableNode::new("app-root", "AppRoot", "<app-root>");
//! node.update_strategy = UpdateStrategy::Lazy;
//! node.trigger_source = Some(TriggerSource::certain(TriggerKind::UserInteraction, "click"));
//!
//! assert!(node.is_root());
//! assert!(node.is_propagation_origin());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod event;
mod graph;
mod node;
mod snapshot;
mod version;

pub use event::*;
pub use graph::*;
pub use node::*;
pub use snapshot::*;
pub use version::*;

/// Current schema version.
///
/// Increment this when making breaking changes to the exported format.
pub const SCHEMA_VERSION: u32 = 1;

/// Get current timestamp in milliseconds since Unix epoch.
#[cfg(feature = "std")]
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
