//! In-memory host adapters.

use std::fmt;

use parking_lot::RwLock;

use super::{HostAdapter, HostNodeRef};
use crate::error::HostAdapterError;

/// A host backed by an in-memory root list that can be replaced at any time.
#[derive(Debug, Default)]
pub struct StaticHost {
    roots: RwLock<Vec<HostNodeRef>>,
}

impl StaticHost {
    pub fn new(roots: Vec<HostNodeRef>) -> Self {
        Self {
            roots: RwLock::new(roots),
        }
    }

    /// Replace the root list seen by subsequent scans.
    pub fn set_roots(&self, roots: Vec<HostNodeRef>) {
        *self.roots.write() = roots;
    }
}

impl HostAdapter for StaticHost {
    fn roots(&self) -> Result<Vec<HostNodeRef>, HostAdapterError> {
        Ok(self.roots.read().clone())
    }

    fn description(&self) -> &str {
        "memory"
    }
}

/// A host backed by a closure, for adapters that compute the tree on demand.
///
/// # Example
///
/// ```
/// use treewatch::{FnHost, HostAdapter, HostNodeRef};
///
/// let host = FnHost::new("computed", || Ok(vec![HostNodeRef::new("root")]));
/// assert_eq!(host.roots().unwrap()[0].id, "root");
/// ```
pub struct FnHost<F> {
    description: String,
    f: F,
}

impl<F> FnHost<F>
where
    F: Fn() -> Result<Vec<HostNodeRef>, HostAdapterError> + Send + Sync,
{
    pub fn new(description: impl Into<String>, f: F) -> Self {
        Self {
            description: description.into(),
            f,
        }
    }
}

impl<F> HostAdapter for FnHost<F>
where
    F: Fn() -> Result<Vec<HostNodeRef>, HostAdapterError> + Send + Sync,
{
    fn roots(&self) -> Result<Vec<HostNodeRef>, HostAdapterError> {
        (self.f)()
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl<F> fmt::Debug for FnHost<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHost")
            .field("description", &self.description)
            .finish()
    }
}
