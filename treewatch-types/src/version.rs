//! Export format version.

use core::fmt;

use crate::SCHEMA_VERSION;

/// Minor revision of the export format. Bumped for additive fields only.
pub const SCHEMA_MINOR: u32 = 0;

/// `major.minor` version stamped on every export document.
///
/// Readers accept any document whose major matches [`SCHEMA_VERSION`]; a newer
/// minor only adds fields that older readers skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
}

impl SchemaVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// The version this build writes.
    pub const fn current() -> Self {
        Self::new(SCHEMA_VERSION, SCHEMA_MINOR)
    }

    /// Whether a document stamped with this version can be read by this build.
    pub fn is_compatible(&self) -> bool {
        self.major == SCHEMA_VERSION
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn newer_minor_is_still_readable() {
        assert!(SchemaVersion::current().is_compatible());
        assert!(SchemaVersion::new(SCHEMA_VERSION, SCHEMA_MINOR + 3).is_compatible());
        assert!(!SchemaVersion::new(SCHEMA_VERSION + 1, 0).is_compatible());
    }

    #[test]
    fn displays_as_major_dot_minor() {
        assert_eq!(SchemaVersion::new(2, 5).to_string(), "2.5");
        assert!(SchemaVersion::new(1, 9) < SchemaVersion::new(2, 0));
    }
}
