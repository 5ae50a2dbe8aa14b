//! File-backed host adapter.
//!
//! Reads a JSON array of [`HostNodeRef`]s from disk on every scan.

use std::fs;
use std::path::{Path, PathBuf};

use super::{HostAdapter, HostNodeRef};
use crate::error::HostAdapterError;

/// A host that describes its tree in a JSON file.
///
/// Useful for replaying a captured tree or driving the engine from tests and
/// demos. The file is re-read on every call so edits show up on the next scan.
#[derive(Debug)]
pub struct JsonFileHost {
    path: PathBuf,
    description: String,
}

impl JsonFileHost {
    /// Create a new file host for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self { path, description }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HostAdapter for JsonFileHost {
    fn roots(&self) -> Result<Vec<HostNodeRef>, HostAdapterError> {
        let content = fs::read_to_string(&self.path)?;
        let roots = serde_json::from_str(&content)?;
        Ok(roots)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
