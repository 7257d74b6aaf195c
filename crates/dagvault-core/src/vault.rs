//! High-level repository API.
//!
//! [`Vault`] owns the store and its collaborators. Every operation runs in
//! its own transaction, committed on success and rolled back on error.

use std::sync::Arc;

use dagvault_store::{GraphStore, StoreTx};
use dagvault_types::{
    GrantReason, GroupId, ObjectCandidate, ObjectId, ObjectRecord, PermissionRecord, UserId,
};

use crate::access::{AccessOutcome, AccessResolver, ShareDecision};
use crate::attributes::AttributeStore;
use crate::config::VaultConfig;
use crate::content::{ContentStore, UploadOptions};
use crate::directory::GroupDirectory;
use crate::error::CoreResult;
use crate::permission::{PermissionGraph, PropagationReport};
use crate::relation::RelationGraph;

pub struct Vault {
    store: Arc<dyn GraphStore>,
    directory: Arc<dyn GroupDirectory>,
    attributes: Arc<dyn AttributeStore>,
    config: VaultConfig,
}

impl Vault {
    pub fn new(
        store: Arc<dyn GraphStore>,
        directory: Arc<dyn GroupDirectory>,
        attributes: Arc<dyn AttributeStore>,
        config: VaultConfig,
    ) -> Self {
        Self {
            store,
            directory,
            attributes,
            config,
        }
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    // ---- Content operations ----

    /// Store an object, or return the existing one with the same hash.
    ///
    /// The flag is `true` only for the caller whose insert created the row.
    pub fn upload(
        &self,
        candidate: ObjectCandidate,
        options: &UploadOptions,
        actor: &UserId,
    ) -> CoreResult<(ObjectRecord, bool)> {
        let permissions = self.permissions();
        let relations = RelationGraph::new(&permissions);
        let content = ContentStore::new(&permissions, &relations, self.attributes.as_ref());
        self.transact(|tx| content.get_or_create(tx, candidate, options, actor))
    }

    pub fn add_parent(&self, child: &ObjectId, parent: &ObjectId, actor: &UserId) -> CoreResult<bool> {
        let permissions = self.permissions();
        let relations = RelationGraph::new(&permissions);
        self.transact(|tx| relations.add_parent(tx, child, parent, actor))
    }

    // ---- Permission operations ----

    /// Create a single grant without propagating it.
    pub fn grant(&self, object: &ObjectId, group: &GroupId, reason: &GrantReason) -> CoreResult<bool> {
        let permissions = self.permissions();
        self.transact(|tx| permissions.grant(tx, object, group, reason))
    }

    pub fn give_access(
        &self,
        root: &ObjectId,
        group: &GroupId,
        reason: &GrantReason,
    ) -> CoreResult<PropagationReport> {
        let permissions = self.permissions();
        self.transact(|tx| permissions.give_access(tx, root, group, reason))
    }

    pub fn permission(&self, object: &ObjectId, group: &GroupId) -> CoreResult<Option<PermissionRecord>> {
        self.transact(|tx| Ok(tx.permission(object, group)?))
    }

    /// Grants on `object` the requestor may enumerate, oldest first.
    pub fn grants(&self, object: &ObjectId, requestor: &UserId) -> CoreResult<Vec<PermissionRecord>> {
        let permissions = self.permissions();
        self.transact(|tx| permissions.grants_visible_to(tx, object, requestor))
    }

    pub fn has_access(&self, object: &ObjectId, user: &UserId) -> CoreResult<bool> {
        let permissions = self.permissions();
        self.transact(|tx| permissions.has_explicit_access(tx, object, user))
    }

    pub fn uploaders(&self, object: &ObjectId) -> CoreResult<Vec<UserId>> {
        let permissions = self.permissions();
        self.transact(|tx| permissions.uploaders(tx, object))
    }

    // ---- Access operations ----

    pub fn access(&self, identifier: &str, requestor: &UserId) -> CoreResult<AccessOutcome> {
        let permissions = self.permissions();
        let relations = RelationGraph::new(&permissions);
        let resolver = AccessResolver::new(&permissions, &relations, self.config.implicit_query_grants);
        self.transact(|tx| resolver.access(tx, identifier, requestor))
    }

    pub fn share(
        &self,
        object: &ObjectId,
        group: &GroupId,
        requestor: &UserId,
    ) -> CoreResult<ShareDecision> {
        let permissions = self.permissions();
        let relations = RelationGraph::new(&permissions);
        let resolver = AccessResolver::new(&permissions, &relations, self.config.implicit_query_grants);
        self.transact(|tx| resolver.share(tx, object, group, requestor))
    }

    // ---- Internal ----

    fn permissions(&self) -> PermissionGraph<'_> {
        PermissionGraph::new(self.directory.as_ref(), self.config.propagation)
    }

    fn transact<T>(&self, f: impl FnOnce(&mut dyn StoreTx) -> CoreResult<T>) -> CoreResult<T> {
        let mut tx = self.store.begin()?;
        let value = f(tx.as_mut())?;
        tx.commit()?;
        Ok(value)
    }
}
