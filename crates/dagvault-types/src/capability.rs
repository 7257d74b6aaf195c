use std::fmt;

use serde::{Deserialize, Serialize};

/// Capability flags a directory group can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Members see every object: the group receives a grant on every upload.
    AccessAllObjects,
    /// Members read attributes regardless of attribute-level ACLs.
    ReadAllAttributes,
    /// Querying an otherwise hidden object grants it to the group.
    ShareQueriedObjects,
    /// Members may share objects with any group and see every grant.
    SharingObjects,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessAllObjects => write!(f, "access_all_objects"),
            Self::ReadAllAttributes => write!(f, "read_all_attributes"),
            Self::ShareQueriedObjects => write!(f, "share_queried_objects"),
            Self::SharingObjects => write!(f, "sharing_objects"),
        }
    }
}
