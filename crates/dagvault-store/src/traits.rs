use dagvault_types::{ContentHash, GroupId, ObjectId, ObjectRecord, PermissionRecord, RelationRecord};

use crate::error::StoreResult;

/// Marker for a point inside a transaction that can be rolled back to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Savepoint(pub usize);

/// Source of transactions over the object graph tables.
pub trait GraphStore: Send + Sync {
    /// Open a new unit of work.
    fn begin(&self) -> StoreResult<Box<dyn StoreTx + '_>>;
}

/// A unit of work over the object, relation and permission tables.
///
/// All implementations must satisfy these invariants:
/// - Reads observe every write made earlier in the same transaction.
/// - Inserts that collide with a unique index fail with
///   `StoreError::UniqueViolation` and leave the transaction usable.
/// - `rollback_to` undoes exactly the writes made after the savepoint.
/// - Dropping the transaction without `commit` discards all of its writes.
pub trait StoreTx {
    // ---- Savepoints ----

    /// Mark the current position for a later partial rollback.
    fn savepoint(&mut self) -> Savepoint;

    /// Undo every write made after `savepoint`.
    fn rollback_to(&mut self, savepoint: Savepoint) -> StoreResult<()>;

    // ---- Objects ----

    fn object(&self, id: &ObjectId) -> StoreResult<Option<ObjectRecord>>;

    fn object_by_hash(&self, dhash: &ContentHash) -> StoreResult<Option<ObjectRecord>>;

    /// Insert a new object row (unique id, unique dhash).
    fn insert_object(&mut self, object: &ObjectRecord) -> StoreResult<()>;

    // ---- Relations ----

    fn relation_exists(&self, parent: &ObjectId, child: &ObjectId) -> StoreResult<bool>;

    /// Insert a new edge (unique `(parent, child)`). Both ends must exist.
    fn insert_relation(&mut self, relation: &RelationRecord) -> StoreResult<()>;

    /// Edges pointing at `child`, most recent first.
    fn parents_of(&self, child: &ObjectId) -> StoreResult<Vec<RelationRecord>>;

    /// Edges leaving `parent`, most recent first.
    fn children_of(&self, parent: &ObjectId) -> StoreResult<Vec<RelationRecord>>;

    // ---- Permissions ----

    fn permission(&self, object: &ObjectId, group: &GroupId) -> StoreResult<Option<PermissionRecord>>;

    /// Every grant on `object`, oldest first.
    fn permissions_of(&self, object: &ObjectId) -> StoreResult<Vec<PermissionRecord>>;

    /// Insert a new grant (unique `(object, group)`). The object must exist.
    fn insert_permission(&mut self, permission: &PermissionRecord) -> StoreResult<()>;

    // ---- Completion ----

    /// Make every write of this transaction durable and visible.
    fn commit(self: Box<Self>) -> StoreResult<()>;
}
