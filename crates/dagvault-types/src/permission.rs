use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{GroupId, ObjectId, UserId};

/// Why a grant exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonType {
    /// The object (or an ancestor) was uploaded with this group.
    Added,
    /// A user explicitly shared the object.
    Shared,
    /// Imported from a previous access model.
    Migrated,
    /// A member of a query-sharing group looked the object up.
    Queried,
}

impl fmt::Display for ReasonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Shared => write!(f, "shared"),
            Self::Migrated => write!(f, "migrated"),
            Self::Queried => write!(f, "queried"),
        }
    }
}

/// Provenance of a grant: the action, object and user that caused it.
///
/// Used for audit trails only. Authorization never reads it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantReason {
    pub reason_type: ReasonType,
    pub related_object: ObjectId,
    pub related_user: UserId,
}

impl GrantReason {
    pub fn new(reason_type: ReasonType, related_object: ObjectId, related_user: UserId) -> Self {
        Self {
            reason_type,
            related_object,
            related_user,
        }
    }

    pub fn added(related_object: ObjectId, related_user: UserId) -> Self {
        Self::new(ReasonType::Added, related_object, related_user)
    }

    pub fn shared(related_object: ObjectId, related_user: UserId) -> Self {
        Self::new(ReasonType::Shared, related_object, related_user)
    }

    pub fn queried(related_object: ObjectId, related_user: UserId) -> Self {
        Self::new(ReasonType::Queried, related_object, related_user)
    }
}

/// A grant: `group` may access `object`. Unique per `(object, group)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub object: ObjectId,
    pub group: GroupId,
    pub access_time: DateTime<Utc>,
    pub reason: GrantReason,
}

impl PermissionRecord {
    /// A new grant stamped with the current time.
    pub fn new(object: ObjectId, group: GroupId, reason: GrantReason) -> Self {
        Self {
            object,
            group,
            access_time: Utc::now(),
            reason,
        }
    }

    /// The unique key of this grant.
    pub fn key(&self) -> (ObjectId, GroupId) {
        (self.object, self.group.clone())
    }
}
