//! Authorization decisions for lookups and explicit shares.
//!
//! A lookup that finds nothing and a lookup the requestor may not see both
//! yield [`AccessOutcome::Denied`]; callers cannot tell them apart.

use tracing::{debug, info};

use dagvault_store::StoreTx;
use dagvault_types::{Capability, ContentHash, GrantReason, GroupId, ObjectId, ObjectRecord, UserId};

use crate::error::CoreResult;
use crate::permission::{PermissionGraph, PropagationReport};
use crate::relation::RelationGraph;

/// An object together with the neighbours the requestor may see.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectView {
    pub object: ObjectRecord,
    /// Accessible parents, most recent first.
    pub parents: Vec<ObjectRecord>,
    /// Accessible children, most recent first.
    pub children: Vec<ObjectRecord>,
}

/// Result of [`AccessResolver::access`].
#[derive(Clone, Debug, PartialEq)]
pub enum AccessOutcome {
    /// The requestor already held a grant through one of their groups.
    Explicit(ObjectView),
    /// The lookup itself granted access to the requestor's query-sharing
    /// groups.
    Queried(ObjectView),
    Denied,
}

impl AccessOutcome {
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied)
    }

    pub fn view(&self) -> Option<&ObjectView> {
        match self {
            Self::Explicit(view) | Self::Queried(view) => Some(view),
            Self::Denied => None,
        }
    }

    pub fn into_view(self) -> Option<ObjectView> {
        match self {
            Self::Explicit(view) | Self::Queried(view) => Some(view),
            Self::Denied => None,
        }
    }
}

/// Result of [`AccessResolver::share`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShareDecision {
    Shared(PropagationReport),
    Denied { reason: String },
}

impl ShareDecision {
    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }
}

pub struct AccessResolver<'a> {
    permissions: &'a PermissionGraph<'a>,
    relations: &'a RelationGraph<'a>,
    implicit_query_grants: bool,
}

impl<'a> AccessResolver<'a> {
    pub fn new(
        permissions: &'a PermissionGraph<'a>,
        relations: &'a RelationGraph<'a>,
        implicit_query_grants: bool,
    ) -> Self {
        Self {
            permissions,
            relations,
            implicit_query_grants,
        }
    }

    /// Resolve `identifier` (a content hash, any case) for `requestor`.
    ///
    /// If the requestor has no grant but belongs to groups holding
    /// [`Capability::ShareQueriedObjects`], each such group is granted the
    /// object and its descendants before the view is returned.
    pub fn access(
        &self,
        tx: &mut dyn StoreTx,
        identifier: &str,
        requestor: &UserId,
    ) -> CoreResult<AccessOutcome> {
        let dhash = match ContentHash::from_hex(identifier) {
            Ok(dhash) => dhash,
            Err(err) => {
                debug!(identifier, error = %err, "unparseable identifier");
                return Ok(AccessOutcome::Denied);
            }
        };
        let Some(object) = tx.object_by_hash(&dhash)? else {
            return Ok(AccessOutcome::Denied);
        };

        if self.permissions.has_explicit_access(&*tx, &object.id, requestor)? {
            let view = self.view(&*tx, object, requestor)?;
            return Ok(AccessOutcome::Explicit(view));
        }
        if !self.implicit_query_grants {
            return Ok(AccessOutcome::Denied);
        }

        let groups = self
            .permissions
            .directory()
            .member_groups_with_capability(requestor, Capability::ShareQueriedObjects)?;
        if groups.is_empty() {
            return Ok(AccessOutcome::Denied);
        }

        let reason = GrantReason::queried(object.id, requestor.clone());
        for group in &groups {
            let report = self
                .permissions
                .give_access(tx, &object.id, group, &reason)?;
            info!(
                object = %object.summary(),
                group = %group,
                requestor = %requestor,
                granted = report.granted.len(),
                "access granted on query"
            );
        }
        let view = self.view(&*tx, object, requestor)?;
        Ok(AccessOutcome::Queried(view))
    }

    /// Share `object` (and its descendants) with `group` on behalf of
    /// `requestor`.
    ///
    /// The requestor must hold access to the object and must either belong
    /// to `group` or to a [`Capability::SharingObjects`] group.
    pub fn share(
        &self,
        tx: &mut dyn StoreTx,
        object: &ObjectId,
        group: &GroupId,
        requestor: &UserId,
    ) -> CoreResult<ShareDecision> {
        if !self.permissions.has_explicit_access(&*tx, object, requestor)? {
            return Ok(ShareDecision::Denied {
                reason: format!("object not accessible: {object}"),
            });
        }
        let directory = self.permissions.directory();
        if !directory.group_exists(group)? {
            return Ok(ShareDecision::Denied {
                reason: format!("unknown group: {group}"),
            });
        }
        if !directory.is_member(requestor, group)?
            && !directory.has_capability(requestor, Capability::SharingObjects)?
        {
            return Ok(ShareDecision::Denied {
                reason: format!("{requestor} may not share with {group}"),
            });
        }

        let reason = GrantReason::shared(*object, requestor.clone());
        let report = self.permissions.give_access(tx, object, group, &reason)?;
        Ok(ShareDecision::Shared(report))
    }

    fn view(
        &self,
        tx: &dyn StoreTx,
        object: ObjectRecord,
        requestor: &UserId,
    ) -> CoreResult<ObjectView> {
        let parents = self.relations.visible_parents(tx, &object.id, requestor)?;
        let children = self.relations.visible_children(tx, &object.id, requestor)?;
        Ok(ObjectView {
            object,
            parents,
            children,
        })
    }
}
