//! Parent/child derivation links between objects.
//!
//! Linking copies the parent's grants onto the child in the same
//! transaction as the edge insert, so no reader sees a linked child holding
//! fewer grants than its parent had at link time. The copy is a snapshot:
//! grants added to the parent later reach the child only through
//! [`PermissionGraph::give_access`].

use tracing::debug;

use dagvault_store::StoreTx;
use dagvault_types::{GrantReason, ObjectId, ObjectRecord, RelationRecord, UserId};

use crate::conflict::{insert_or_fetch, Claim};
use crate::error::{CoreError, CoreResult};
use crate::permission::PermissionGraph;

pub struct RelationGraph<'a> {
    permissions: &'a PermissionGraph<'a>,
}

impl<'a> RelationGraph<'a> {
    pub fn new(permissions: &'a PermissionGraph<'a>) -> Self {
        Self { permissions }
    }

    /// Link `child` below `parent`.
    ///
    /// Returns `true` if this call created the edge (and copied the parent's
    /// grants), `false` if the edge already existed.
    pub fn add_parent(
        &self,
        tx: &mut dyn StoreTx,
        child: &ObjectId,
        parent: &ObjectId,
        actor: &UserId,
    ) -> CoreResult<bool> {
        for id in [child, parent] {
            if tx.object(id)?.is_none() {
                return Err(CoreError::ObjectNotFound(*id));
            }
        }
        if tx.relation_exists(parent, child)? {
            return Ok(false);
        }

        let edge = RelationRecord::new(*parent, *child);
        let claim = insert_or_fetch(
            tx,
            |tx| tx.insert_relation(&edge),
            |tx| Ok(tx.relation_exists(parent, child)?.then_some(())),
        )?;
        if let Claim::Existing(()) = claim {
            return Ok(false);
        }

        // Propagating (rather than granting the child alone) keeps the
        // child's existing descendants covered as well.
        let inherited = tx.permissions_of(parent)?;
        for grant in &inherited {
            let reason = GrantReason::new(grant.reason.reason_type, *child, actor.clone());
            self.permissions
                .give_access(tx, child, &grant.group, &reason)?;
        }

        debug!(
            parent = %parent.short_id(),
            child = %child.short_id(),
            inherited = inherited.len(),
            "relation added"
        );
        Ok(true)
    }

    /// Parents of `object` the requestor can access, most recent first.
    pub fn visible_parents(
        &self,
        tx: &dyn StoreTx,
        object: &ObjectId,
        requestor: &UserId,
    ) -> CoreResult<Vec<ObjectRecord>> {
        let ids = tx.parents_of(object)?.into_iter().map(|edge| edge.parent);
        self.visible(tx, ids, requestor)
    }

    /// Children of `object` the requestor can access, most recent first.
    pub fn visible_children(
        &self,
        tx: &dyn StoreTx,
        object: &ObjectId,
        requestor: &UserId,
    ) -> CoreResult<Vec<ObjectRecord>> {
        let ids = tx.children_of(object)?.into_iter().map(|edge| edge.child);
        self.visible(tx, ids, requestor)
    }

    fn visible(
        &self,
        tx: &dyn StoreTx,
        ids: impl Iterator<Item = ObjectId>,
        requestor: &UserId,
    ) -> CoreResult<Vec<ObjectRecord>> {
        let mut objects = Vec::new();
        for id in ids {
            if !self.permissions.has_explicit_access(tx, &id, requestor)? {
                continue;
            }
            if let Some(object) = tx.object(&id)? {
                objects.push(object);
            }
        }
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PropagationPolicy;
    use crate::testing::{group, store_object, Fixture, RacingTx};
    use dagvault_store::{GraphStore, InMemoryGraphStore, StoreError};
    use dagvault_types::ReasonType;

    #[test]
    fn add_parent_is_idempotent() {
        let fx = Fixture::new();
        let store = InMemoryGraphStore::new();
        let permissions = fx.permissions(PropagationPolicy::Exhaustive);
        let relations = RelationGraph::new(&permissions);
        let mut tx = store.begin().unwrap();
        let parent = store_object(tx.as_mut(), "parent");
        let child = store_object(tx.as_mut(), "child");

        assert!(relations.add_parent(tx.as_mut(), &child, &parent, &fx.alice).unwrap());
        assert!(!relations.add_parent(tx.as_mut(), &child, &parent, &fx.alice).unwrap());
        tx.commit().unwrap();
        assert_eq!(store.relation_count().unwrap(), 1);
    }

    #[test]
    fn linking_copies_parent_grants() {
        let fx = Fixture::new();
        let store = InMemoryGraphStore::new();
        let permissions = fx.permissions(PropagationPolicy::Exhaustive);
        let relations = RelationGraph::new(&permissions);
        let mut tx = store.begin().unwrap();
        let parent = store_object(tx.as_mut(), "parent");
        let child = store_object(tx.as_mut(), "child");
        permissions
            .grant(tx.as_mut(), &parent, &group("analysts"), &GrantReason::added(parent, fx.root.clone()))
            .unwrap();

        relations.add_parent(tx.as_mut(), &child, &parent, &fx.bob).unwrap();

        let inherited = tx.permission(&child, &group("analysts")).unwrap().unwrap();
        assert_eq!(inherited.reason.reason_type, ReasonType::Added);
        assert_eq!(inherited.reason.related_object, child);
        assert_eq!(inherited.reason.related_user, fx.bob);
    }

    #[test]
    fn inheritance_is_a_snapshot() {
        let fx = Fixture::new();
        let store = InMemoryGraphStore::new();
        let permissions = fx.permissions(PropagationPolicy::Exhaustive);
        let relations = RelationGraph::new(&permissions);
        let mut tx = store.begin().unwrap();
        let p = store_object(tx.as_mut(), "p");
        let c = store_object(tx.as_mut(), "c");
        let reason = GrantReason::shared(p, fx.root.clone());
        permissions.grant(tx.as_mut(), &p, &group("g1"), &reason).unwrap();
        relations.add_parent(tx.as_mut(), &c, &p, &fx.root).unwrap();
        assert!(tx.permission(&c, &group("g1")).unwrap().is_some());

        permissions.grant(tx.as_mut(), &p, &group("g2"), &reason).unwrap();
        assert!(tx.permission(&c, &group("g2")).unwrap().is_none());

        permissions.give_access(tx.as_mut(), &p, &group("g2"), &reason).unwrap();
        assert!(tx.permission(&c, &group("g2")).unwrap().is_some());
    }

    #[test]
    fn inherited_grants_reach_existing_grandchildren() {
        let fx = Fixture::new();
        let store = InMemoryGraphStore::new();
        let permissions = fx.permissions(PropagationPolicy::Exhaustive);
        let relations = RelationGraph::new(&permissions);
        let mut tx = store.begin().unwrap();
        let p = store_object(tx.as_mut(), "p");
        let c = store_object(tx.as_mut(), "c");
        let gc = store_object(tx.as_mut(), "gc");
        relations.add_parent(tx.as_mut(), &gc, &c, &fx.root).unwrap();
        permissions
            .grant(tx.as_mut(), &p, &group("partners"), &GrantReason::shared(p, fx.root.clone()))
            .unwrap();

        relations.add_parent(tx.as_mut(), &c, &p, &fx.root).unwrap();
        assert!(tx.permission(&gc, &group("partners")).unwrap().is_some());
    }

    #[test]
    fn add_parent_requires_both_objects() {
        let fx = Fixture::new();
        let store = InMemoryGraphStore::new();
        let permissions = fx.permissions(PropagationPolicy::Exhaustive);
        let relations = RelationGraph::new(&permissions);
        let mut tx = store.begin().unwrap();
        let child = store_object(tx.as_mut(), "child");
        let ghost = ObjectId::new();
        let err = relations
            .add_parent(tx.as_mut(), &child, &ghost, &fx.root)
            .unwrap_err();
        assert!(matches!(err, CoreError::ObjectNotFound(id) if id == ghost));
    }

    #[test]
    fn concurrent_edge_insert_reports_unchanged() {
        let fx = Fixture::new();
        let store = InMemoryGraphStore::new();
        let permissions = fx.permissions(PropagationPolicy::Exhaustive);
        let relations = RelationGraph::new(&permissions);
        let mut setup = store.begin().unwrap();
        let parent = store_object(setup.as_mut(), "parent");
        let child = store_object(setup.as_mut(), "child");
        permissions
            .grant(setup.as_mut(), &parent, &group("analysts"), &GrantReason::shared(parent, fx.root.clone()))
            .unwrap();
        setup.commit().unwrap();

        let mut tx = RacingTx::new(store.begin().unwrap())
            .with_rival_relation(&RelationRecord::new(parent, child));
        assert!(!relations.add_parent(&mut tx, &child, &parent, &fx.alice).unwrap());
        // The loser copies nothing; grants are the rival's responsibility.
        assert!(tx.permission(&child, &group("analysts")).unwrap().is_none());
        assert!(tx.relation_exists(&parent, &child).unwrap());
    }

    #[test]
    fn unresolvable_edge_conflict_is_surfaced() {
        let fx = Fixture::new();
        let store = InMemoryGraphStore::new();
        let permissions = fx.permissions(PropagationPolicy::Exhaustive);
        let relations = RelationGraph::new(&permissions);
        let mut setup = store.begin().unwrap();
        let parent = store_object(setup.as_mut(), "parent");
        let child = store_object(setup.as_mut(), "child");
        setup.commit().unwrap();

        let mut tx = RacingTx::new(store.begin().unwrap()).with_phantom_conflicts();
        let err = relations
            .add_parent(&mut tx, &child, &parent, &fx.alice)
            .unwrap_err();
        assert!(matches!(err, CoreError::Store(StoreError::UniqueViolation { .. })));
    }

    #[test]
    fn hidden_parents_are_elided() {
        let fx = Fixture::new();
        let store = InMemoryGraphStore::new();
        let permissions = fx.permissions(PropagationPolicy::Exhaustive);
        let relations = RelationGraph::new(&permissions);
        let mut tx = store.begin().unwrap();
        let secret = store_object(tx.as_mut(), "secret");
        let open = store_object(tx.as_mut(), "open");
        let child = store_object(tx.as_mut(), "child");
        relations.add_parent(tx.as_mut(), &child, &secret, &fx.root).unwrap();
        relations.add_parent(tx.as_mut(), &child, &open, &fx.root).unwrap();
        permissions
            .grant(tx.as_mut(), &open, &group("analysts"), &GrantReason::shared(open, fx.root.clone()))
            .unwrap();

        let parents: Vec<ObjectId> = relations
            .visible_parents(tx.as_ref(), &child, &fx.alice)
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(parents, vec![open]);
        assert!(relations
            .visible_parents(tx.as_ref(), &child, &fx.bob)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn visible_children_are_most_recent_first() {
        let fx = Fixture::new();
        let store = InMemoryGraphStore::new();
        let permissions = fx.permissions(PropagationPolicy::Exhaustive);
        let relations = RelationGraph::new(&permissions);
        let mut tx = store.begin().unwrap();
        let parent = store_object(tx.as_mut(), "parent");
        permissions
            .grant(tx.as_mut(), &parent, &group("partners"), &GrantReason::shared(parent, fx.root.clone()))
            .unwrap();
        let first = store_object(tx.as_mut(), "first");
        let second = store_object(tx.as_mut(), "second");
        relations.add_parent(tx.as_mut(), &first, &parent, &fx.root).unwrap();
        relations.add_parent(tx.as_mut(), &second, &parent, &fx.root).unwrap();

        let children: Vec<ObjectId> = relations
            .visible_children(tx.as_ref(), &parent, &fx.bob)
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(children, vec![second, first]);
    }
}
