//! Host adapter abstraction for reading the live node tree.
//!
//! The registry never reaches into a UI framework itself. Instead a
//! [`HostAdapter`] supplies, on demand, the current ordered list of root
//! references with their metadata and nested children. How the host decides
//! that a re-scan is due is up to the caller.

mod channel;
mod file;
mod memory;
mod node_ref;

pub use channel::ChannelHost;
pub use file::JsonFileHost;
pub use memory::{FnHost, StaticHost};
pub use node_ref::{kebab_case, HostNodeRef, UNKNOWN_NAME, UNKNOWN_SELECTOR};

use std::fmt::Debug;

use crate::error::HostAdapterError;

/// Trait for reading the current root list from a host.
///
/// # Example
///
/// ```
/// use treewatch::{HostAdapter, HostNodeRef, StaticHost};
///
/// let host = StaticHost::new(vec![HostNodeRef::new("app").type_name("AppRoot")]);
/// let roots = host.roots().unwrap();
/// assert_eq!(roots.len(), 1);
/// ```
pub trait HostAdapter: Send + Sync + Debug {
    /// Produce the current ordered root list.
    ///
    /// Errors are never surfaced to scan callers; the registry treats them as an
    /// empty tree.
    fn roots(&self) -> Result<Vec<HostNodeRef>, HostAdapterError>;

    /// Returns a human-readable description of the host.
    fn description(&self) -> &str;
}
