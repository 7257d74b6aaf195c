use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use dagvault_types::{ContentHash, GroupId, ObjectId, ObjectRecord, PermissionRecord, RelationRecord};

use crate::error::{Constraint, StoreError, StoreResult};
use crate::traits::{GraphStore, Savepoint, StoreTx};

#[derive(Default)]
struct Tables {
    objects: HashMap<ObjectId, ObjectRecord>,
    by_hash: HashMap<ContentHash, ObjectId>,
    /// child -> incoming edges, insertion order.
    parents: HashMap<ObjectId, Vec<RelationRecord>>,
    /// parent -> outgoing edges, insertion order.
    children: HashMap<ObjectId, Vec<RelationRecord>>,
    /// object -> grants, insertion order.
    permissions: HashMap<ObjectId, Vec<PermissionRecord>>,
}

impl Tables {
    fn relation_count(&self) -> usize {
        self.children.values().map(Vec::len).sum()
    }

    fn permission_count(&self) -> usize {
        self.permissions.values().map(Vec::len).sum()
    }

    fn revert(&mut self, undo: Undo) {
        match undo {
            Undo::Object { id, dhash } => {
                self.objects.remove(&id);
                self.by_hash.remove(&dhash);
            }
            Undo::Relation { parent, child } => {
                if let Some(edges) = self.parents.get_mut(&child) {
                    edges.retain(|e| e.parent != parent);
                }
                if let Some(edges) = self.children.get_mut(&parent) {
                    edges.retain(|e| e.child != child);
                }
            }
            Undo::Permission((object, group)) => {
                if let Some(grants) = self.permissions.get_mut(&object) {
                    grants.retain(|p| p.group != group);
                }
            }
        }
    }
}

/// A write recorded so it can be reverted.
enum Undo {
    Object { id: ObjectId, dhash: ContentHash },
    Relation { parent: ObjectId, child: ObjectId },
    /// Keyed by [`PermissionRecord::key`].
    Permission((ObjectId, GroupId)),
}

/// Newest edges first. Edges are stored in insertion order, so reversing
/// before the stable sort breaks timestamp ties by recency too.
fn most_recent_first(edges: Option<&Vec<RelationRecord>>) -> Vec<RelationRecord> {
    let mut edges: Vec<RelationRecord> = edges
        .map(|v| v.iter().rev().cloned().collect())
        .unwrap_or_default();
    edges.sort_by(|a, b| b.creation_time.cmp(&a.creation_time));
    edges
}

/// In-memory, `HashMap`-based graph store.
///
/// Intended for tests and embedding. A transaction holds the table lock for
/// its whole lifetime, so transactions are fully serialized. Writes are
/// applied in place and recorded in an undo log; savepoint rollback and
/// drop-without-commit replay the log backwards.
pub struct InMemoryGraphStore {
    tables: Mutex<Tables>,
}

impl InMemoryGraphStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    /// Number of committed objects.
    pub fn object_count(&self) -> StoreResult<usize> {
        Ok(self.lock()?.objects.len())
    }

    /// Number of committed relation edges.
    pub fn relation_count(&self) -> StoreResult<usize> {
        Ok(self.lock()?.relation_count())
    }

    /// Number of committed grants.
    pub fn permission_count(&self) -> StoreResult<usize> {
        Ok(self.lock()?.permission_count())
    }
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore for InMemoryGraphStore {
    fn begin(&self) -> StoreResult<Box<dyn StoreTx + '_>> {
        Ok(Box::new(InMemoryTx {
            tables: self.lock()?,
            undo: Vec::new(),
            committed: false,
        }))
    }
}

impl std::fmt::Debug for InMemoryGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.tables.try_lock() {
            Ok(tables) => f
                .debug_struct("InMemoryGraphStore")
                .field("object_count", &tables.objects.len())
                .field("relation_count", &tables.relation_count())
                .field("permission_count", &tables.permission_count())
                .finish(),
            Err(_) => f
                .debug_struct("InMemoryGraphStore")
                .field("state", &"<in transaction>")
                .finish(),
        }
    }
}

struct InMemoryTx<'a> {
    tables: MutexGuard<'a, Tables>,
    undo: Vec<Undo>,
    committed: bool,
}

impl StoreTx for InMemoryTx<'_> {
    fn savepoint(&mut self) -> Savepoint {
        Savepoint(self.undo.len())
    }

    fn rollback_to(&mut self, savepoint: Savepoint) -> StoreResult<()> {
        if savepoint.0 > self.undo.len() {
            return Err(StoreError::InvalidSavepoint(savepoint.0));
        }
        while self.undo.len() > savepoint.0 {
            if let Some(undo) = self.undo.pop() {
                self.tables.revert(undo);
            }
        }
        Ok(())
    }

    fn object(&self, id: &ObjectId) -> StoreResult<Option<ObjectRecord>> {
        Ok(self.tables.objects.get(id).cloned())
    }

    fn object_by_hash(&self, dhash: &ContentHash) -> StoreResult<Option<ObjectRecord>> {
        Ok(self
            .tables
            .by_hash
            .get(dhash)
            .and_then(|id| self.tables.objects.get(id))
            .cloned())
    }

    fn insert_object(&mut self, object: &ObjectRecord) -> StoreResult<()> {
        if self.tables.objects.contains_key(&object.id) {
            return Err(StoreError::UniqueViolation {
                constraint: Constraint::ObjectId,
            });
        }
        if self.tables.by_hash.contains_key(&object.dhash) {
            return Err(StoreError::UniqueViolation {
                constraint: Constraint::ObjectHash,
            });
        }
        self.tables.by_hash.insert(object.dhash, object.id);
        self.tables.objects.insert(object.id, object.clone());
        self.undo.push(Undo::Object {
            id: object.id,
            dhash: object.dhash,
        });
        Ok(())
    }

    fn relation_exists(&self, parent: &ObjectId, child: &ObjectId) -> StoreResult<bool> {
        Ok(self
            .tables
            .parents
            .get(child)
            .is_some_and(|edges| edges.iter().any(|e| e.parent == *parent)))
    }

    fn insert_relation(&mut self, relation: &RelationRecord) -> StoreResult<()> {
        for end in [&relation.parent, &relation.child] {
            if !self.tables.objects.contains_key(end) {
                return Err(StoreError::NotFound(format!("object {end}")));
            }
        }
        if self.relation_exists(&relation.parent, &relation.child)? {
            return Err(StoreError::UniqueViolation {
                constraint: Constraint::RelationEdge,
            });
        }
        self.tables
            .parents
            .entry(relation.child)
            .or_default()
            .push(relation.clone());
        self.tables
            .children
            .entry(relation.parent)
            .or_default()
            .push(relation.clone());
        self.undo.push(Undo::Relation {
            parent: relation.parent,
            child: relation.child,
        });
        Ok(())
    }

    fn parents_of(&self, child: &ObjectId) -> StoreResult<Vec<RelationRecord>> {
        Ok(most_recent_first(self.tables.parents.get(child)))
    }

    fn children_of(&self, parent: &ObjectId) -> StoreResult<Vec<RelationRecord>> {
        Ok(most_recent_first(self.tables.children.get(parent)))
    }

    fn permission(&self, object: &ObjectId, group: &GroupId) -> StoreResult<Option<PermissionRecord>> {
        Ok(self
            .tables
            .permissions
            .get(object)
            .and_then(|grants| grants.iter().find(|p| p.group == *group))
            .cloned())
    }

    fn permissions_of(&self, object: &ObjectId) -> StoreResult<Vec<PermissionRecord>> {
        Ok(self
            .tables
            .permissions
            .get(object)
            .cloned()
            .unwrap_or_default())
    }

    fn insert_permission(&mut self, permission: &PermissionRecord) -> StoreResult<()> {
        if !self.tables.objects.contains_key(&permission.object) {
            return Err(StoreError::NotFound(format!("object {}", permission.object)));
        }
        if self.permission(&permission.object, &permission.group)?.is_some() {
            return Err(StoreError::UniqueViolation {
                constraint: Constraint::PermissionKey,
            });
        }
        self.tables
            .permissions
            .entry(permission.object)
            .or_default()
            .push(permission.clone());
        self.undo.push(Undo::Permission(permission.key()));
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> StoreResult<()> {
        debug!(writes = self.undo.len(), "transaction committed");
        self.undo.clear();
        self.committed = true;
        Ok(())
    }
}

impl Drop for InMemoryTx<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if !self.undo.is_empty() {
            debug!(writes = self.undo.len(), "transaction rolled back");
        }
        while let Some(undo) = self.undo.pop() {
            self.tables.revert(undo);
        }
    }
}
