//! Content-addressed get-or-create.
//!
//! Objects are deduplicated by content hash. Concurrent uploads of the same
//! content race on the hash index; exactly one insert wins and every other
//! caller receives the winner's row.

use tracing::debug;

use dagvault_store::StoreTx;
use dagvault_types::{GrantReason, GroupId, ObjectCandidate, ObjectId, ObjectRecord, UserId};

use crate::attributes::{AttributeStore, Metakey};
use crate::conflict::{insert_or_fetch, Claim};
use crate::error::{CoreError, CoreResult};
use crate::permission::PermissionGraph;
use crate::relation::RelationGraph;

/// Everything an upload carries besides the object itself.
#[derive(Clone, Debug, Default)]
pub struct UploadOptions {
    /// Object this one was derived from.
    pub parent: Option<ObjectId>,
    /// Attributes to attach. Undefined keys are skipped.
    pub metakeys: Vec<Metakey>,
    /// Groups to grant on top of the all-access groups.
    pub share_with: Vec<GroupId>,
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parent(mut self, parent: ObjectId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn metakey(mut self, metakey: Metakey) -> Self {
        self.metakeys.push(metakey);
        self
    }

    pub fn share_with(mut self, group: GroupId) -> Self {
        self.share_with.push(group);
        self
    }
}

pub struct ContentStore<'a> {
    permissions: &'a PermissionGraph<'a>,
    relations: &'a RelationGraph<'a>,
    attributes: &'a dyn AttributeStore,
}

impl<'a> ContentStore<'a> {
    pub fn new(
        permissions: &'a PermissionGraph<'a>,
        relations: &'a RelationGraph<'a>,
        attributes: &'a dyn AttributeStore,
    ) -> Self {
        Self {
            permissions,
            relations,
            attributes,
        }
    }

    /// Store `candidate` unless an object with its hash exists, then apply
    /// attributes, grants and the parent link to whichever object is stored.
    ///
    /// Returns the stored object and whether this call created it. Grants
    /// and links are applied even when the object already existed. A missing
    /// parent fails the call before anything is written.
    pub fn get_or_create(
        &self,
        tx: &mut dyn StoreTx,
        candidate: ObjectCandidate,
        options: &UploadOptions,
        actor: &UserId,
    ) -> CoreResult<(ObjectRecord, bool)> {
        let requested = candidate.kind();
        let dhash = candidate.dhash;
        if let Some(parent) = &options.parent {
            if tx.object(parent)?.is_none() {
                return Err(CoreError::ObjectNotFound(*parent));
            }
        }

        let (object, is_new) = match tx.object_by_hash(&dhash)? {
            Some(existing) => (existing, false),
            None => {
                let record = candidate.into_record();
                let claim = insert_or_fetch(
                    tx,
                    |tx| tx.insert_object(&record),
                    |tx| tx.object_by_hash(&dhash),
                )?;
                match claim {
                    Claim::Inserted => (record, true),
                    Claim::Existing(existing) => (existing, false),
                }
            }
        };

        if object.kind() != requested {
            return Err(CoreError::ObjectTypeConflict {
                dhash,
                existing: object.kind(),
                requested,
            });
        }
        if is_new {
            debug!(object = %object.summary(), "object created");
        }

        let mut groups = options.share_with.clone();
        for group in self.permissions.directory().all_access_groups()? {
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
        let reason = GrantReason::added(object.id, actor.clone());
        for group in &groups {
            self.permissions.give_access(tx, &object.id, group, &reason)?;
        }

        // Inherited grants come after the object's own so they never shadow
        // the upload's provenance.
        if let Some(parent) = &options.parent {
            self.relations.add_parent(tx, &object.id, parent, actor)?;
        }

        // The attribute store does not roll back with `tx`, so it is written
        // only once every store write has succeeded.
        for metakey in &options.metakeys {
            match self.attributes.attach(&object.id, &metakey.key, &metakey.value) {
                Ok(_) => {}
                Err(CoreError::UndefinedAttribute(key)) => {
                    debug!(key = %key, "skipping undefined attribute");
                }
                Err(err) => return Err(err),
            }
        }

        Ok((object, is_new))
    }
}
