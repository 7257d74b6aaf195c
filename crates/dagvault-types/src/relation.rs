use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::ObjectId;

/// A derivation edge: `child` was derived from `parent`.
///
/// Unique per `(parent, child)` pair. Edges are never removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRecord {
    pub parent: ObjectId,
    pub child: ObjectId,
    pub creation_time: DateTime<Utc>,
}

impl RelationRecord {
    /// A new edge stamped with the current time.
    pub fn new(parent: ObjectId, child: ObjectId) -> Self {
        Self {
            parent,
            child,
            creation_time: Utc::now(),
        }
    }
}
