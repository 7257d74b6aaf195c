//! Shared fixtures for unit tests.

use std::cell::Cell;

use dagvault_store::{Constraint, Savepoint, StoreError, StoreResult, StoreTx};
use dagvault_types::{
    Capability, ContentHash, GroupId, ObjectCandidate, ObjectId, ObjectRecord, PermissionRecord,
    RelationRecord, UserId,
};

use crate::attributes::InMemoryAttributeStore;
use crate::config::PropagationPolicy;
use crate::directory::InMemoryDirectory;
use crate::permission::PermissionGraph;

/// Directory layout used across tests:
///
/// - `admins` (AccessAllObjects, SharingObjects): root
/// - `feed` (ShareQueriedObjects): alice
/// - `analysts`: alice
/// - `partners`: bob
pub(crate) struct Fixture {
    pub directory: InMemoryDirectory,
    pub attributes: InMemoryAttributeStore,
    pub root: UserId,
    pub alice: UserId,
    pub bob: UserId,
}

impl Fixture {
    pub fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();

        let directory = InMemoryDirectory::new();
        let admins = directory
            .add_group("admins", [Capability::AccessAllObjects, Capability::SharingObjects])
            .unwrap();
        let feed = directory
            .add_group("feed", [Capability::ShareQueriedObjects])
            .unwrap();
        let analysts = directory.add_group("analysts", std::iter::empty()).unwrap();
        let partners = directory.add_group("partners", std::iter::empty()).unwrap();
        let root = directory.add_member(&admins, "root").unwrap();
        let alice = directory.add_member(&feed, "alice").unwrap();
        directory.add_member(&analysts, "alice").unwrap();
        let bob = directory.add_member(&partners, "bob").unwrap();

        let attributes = InMemoryAttributeStore::new();
        attributes.define("family").unwrap();

        Self {
            directory,
            attributes,
            root,
            alice,
            bob,
        }
    }

    pub fn permissions(&self, policy: PropagationPolicy) -> PermissionGraph<'_> {
        PermissionGraph::new(&self.directory, policy)
    }
}

pub(crate) fn group(name: &str) -> GroupId {
    GroupId::new(name)
}

/// Insert a text blob directly, bypassing the content store.
pub(crate) fn store_object(tx: &mut dyn StoreTx, content: &str) -> ObjectId {
    let record = ObjectCandidate::text_blob(content, "raw", content).into_record();
    tx.insert_object(&record).unwrap();
    record.id
}

/// Insert an edge directly, bypassing the relation graph.
pub(crate) fn link(tx: &mut dyn StoreTx, parent: ObjectId, child: ObjectId) {
    tx.insert_relation(&RelationRecord::new(parent, child)).unwrap();
}

/// A transaction wrapper that simulates a concurrent writer.
///
/// The wrapped transaction already holds the rival's row; the first lookup
/// that would see it reports it absent, as if the rival committed between
/// this caller's check and its insert.
pub(crate) struct RacingTx<'a> {
    inner: Box<dyn StoreTx + 'a>,
    hide_hash_lookups: Cell<usize>,
    hide_relation_lookups: Cell<usize>,
    /// Every insert collides and nothing can be read back.
    phantom_conflicts: bool,
}

impl<'a> RacingTx<'a> {
    pub fn new(inner: Box<dyn StoreTx + 'a>) -> Self {
        Self {
            inner,
            hide_hash_lookups: Cell::new(0),
            hide_relation_lookups: Cell::new(0),
            phantom_conflicts: false,
        }
    }

    /// Insert `rival` and hide it from the next hash lookup.
    pub fn with_rival_object(mut self, rival: &ObjectRecord) -> Self {
        self.inner.insert_object(rival).unwrap();
        self.hide_hash_lookups.set(1);
        self
    }

    /// Insert `rival` and hide it from the next edge lookup.
    pub fn with_rival_relation(mut self, rival: &RelationRecord) -> Self {
        self.inner.insert_relation(rival).unwrap();
        self.hide_relation_lookups.set(1);
        self
    }

    pub fn with_phantom_conflicts(mut self) -> Self {
        self.phantom_conflicts = true;
        self
    }

    fn hide(counter: &Cell<usize>) -> bool {
        let remaining = counter.get();
        if remaining > 0 {
            counter.set(remaining - 1);
            true
        } else {
            false
        }
    }
}

impl StoreTx for RacingTx<'_> {
    fn savepoint(&mut self) -> Savepoint {
        self.inner.savepoint()
    }

    fn rollback_to(&mut self, savepoint: Savepoint) -> StoreResult<()> {
        self.inner.rollback_to(savepoint)
    }

    fn object(&self, id: &ObjectId) -> StoreResult<Option<ObjectRecord>> {
        self.inner.object(id)
    }

    fn object_by_hash(&self, dhash: &ContentHash) -> StoreResult<Option<ObjectRecord>> {
        if self.phantom_conflicts || Self::hide(&self.hide_hash_lookups) {
            return Ok(None);
        }
        self.inner.object_by_hash(dhash)
    }

    fn insert_object(&mut self, object: &ObjectRecord) -> StoreResult<()> {
        if self.phantom_conflicts {
            return Err(StoreError::UniqueViolation {
                constraint: Constraint::ObjectHash,
            });
        }
        self.inner.insert_object(object)
    }

    fn relation_exists(&self, parent: &ObjectId, child: &ObjectId) -> StoreResult<bool> {
        if self.phantom_conflicts || Self::hide(&self.hide_relation_lookups) {
            return Ok(false);
        }
        self.inner.relation_exists(parent, child)
    }

    fn insert_relation(&mut self, relation: &RelationRecord) -> StoreResult<()> {
        if self.phantom_conflicts {
            return Err(StoreError::UniqueViolation {
                constraint: Constraint::RelationEdge,
            });
        }
        self.inner.insert_relation(relation)
    }

    fn parents_of(&self, child: &ObjectId) -> StoreResult<Vec<RelationRecord>> {
        self.inner.parents_of(child)
    }

    fn children_of(&self, parent: &ObjectId) -> StoreResult<Vec<RelationRecord>> {
        self.inner.children_of(parent)
    }

    fn permission(&self, object: &ObjectId, group: &GroupId) -> StoreResult<Option<PermissionRecord>> {
        if self.phantom_conflicts {
            return Ok(None);
        }
        self.inner.permission(object, group)
    }

    fn permissions_of(&self, object: &ObjectId) -> StoreResult<Vec<PermissionRecord>> {
        self.inner.permissions_of(object)
    }

    fn insert_permission(&mut self, permission: &PermissionRecord) -> StoreResult<()> {
        if self.phantom_conflicts {
            return Err(StoreError::UniqueViolation {
                constraint: Constraint::PermissionKey,
            });
        }
        self.inner.insert_permission(permission)
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        self.inner.commit()
    }
}
