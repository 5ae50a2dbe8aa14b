//! Channel-backed host adapter.
//!
//! Receives the latest root list via a tokio watch channel. This suits hosts
//! that push tree changes (e.g. from a framework hook) instead of being polled.

use tokio::sync::watch;

use super::{HostAdapter, HostNodeRef};
use crate::error::HostAdapterError;

/// A host whose root list is pushed through a channel.
///
/// Each scan reads the most recent value. Once the sending side is dropped the
/// host reports [`HostAdapterError::Disconnected`], which the registry turns into
/// an empty tree.
///
/// # Example
///
/// ```
/// use treewatch::{ChannelHost, HostAdapter, HostNodeRef};
///
/// let (tx, host) = ChannelHost::create("framework-hook");
/// tx.send(vec![HostNodeRef::new("app")]).unwrap();
/// assert_eq!(host.roots().unwrap().len(), 1);
/// ```
#[derive(Debug)]
pub struct ChannelHost {
    receiver: watch::Receiver<Vec<HostNodeRef>>,
    description: String,
}

impl ChannelHost {
    /// Create a new channel host from an existing receiver.
    pub fn new(receiver: watch::Receiver<Vec<HostNodeRef>>, source_description: &str) -> Self {
        let description = format!("channel: {}", source_description);
        Self {
            receiver,
            description,
        }
    }

    /// Create a channel pair; the host starts with an empty root list.
    pub fn create(source_description: &str) -> (watch::Sender<Vec<HostNodeRef>>, Self) {
        let (tx, rx) = watch::channel(Vec::new());
        (tx, Self::new(rx, source_description))
    }
}

impl HostAdapter for ChannelHost {
    fn roots(&self) -> Result<Vec<HostNodeRef>, HostAdapterError> {
        // has_changed only errors once the sender is gone
        if self.receiver.has_changed().is_err() {
            return Err(HostAdapterError::Disconnected(self.description.clone()));
        }
        Ok(self.receiver.borrow().clone())
    }

    fn description(&self) -> &str {
        &self.description
    }
}
