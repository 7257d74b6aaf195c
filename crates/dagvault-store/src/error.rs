use std::fmt;

use serde::{Deserialize, Serialize};

/// A unique index of the persisted shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constraint {
    /// `object.id` primary key.
    ObjectId,
    /// `object.dhash` unique index.
    ObjectHash,
    /// `relation (parent, child)` unique index.
    RelationEdge,
    /// `permission (object, group)` unique index.
    PermissionKey,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ObjectId => write!(f, "object_pkey"),
            Self::ObjectHash => write!(f, "object_dhash_key"),
            Self::RelationEdge => write!(f, "relation_parent_child_key"),
            Self::PermissionKey => write!(f, "permission_object_group_key"),
        }
    }
}

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An insert collided with an existing row on a unique index.
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: Constraint },

    /// A row referenced by an insert does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A savepoint does not belong to the current transaction state.
    #[error("invalid savepoint {0}")]
    InvalidSavepoint(usize),

    /// A lock guarding the backend was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    LockPoisoned(String),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns `true` if this is a unique-index collision.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
