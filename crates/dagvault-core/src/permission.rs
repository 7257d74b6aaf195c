//! Grant records and downward grant propagation.
//!
//! A grant `(object, group)` authorizes every member of `group` to see
//! `object`. [`PermissionGraph::grant`] creates a single grant race-safely;
//! [`PermissionGraph::give_access`] extends a grant from a root to every
//! reachable descendant.
//!
//! # Invariants
//!
//! - At most one grant exists per `(object, group)`.
//! - Grants are never mutated; their reason is provenance only.
//! - Each node's grant is its own savepoint-scoped insert, so an interrupted
//!   propagation leaves a granted prefix of the subgraph that a later call
//!   for the same `(root, group)` completes.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use dagvault_store::StoreTx;
use dagvault_types::{
    Capability, GrantReason, GroupId, ObjectId, PermissionRecord, ReasonType, UserId,
};

use crate::config::PropagationPolicy;
use crate::conflict::{insert_or_fetch, Claim};
use crate::directory::GroupDirectory;
use crate::error::{CoreError, CoreResult};

/// Summary of one [`PermissionGraph::give_access`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationReport {
    /// Objects that received a new grant, in visit order.
    pub granted: Vec<ObjectId>,
    /// Number of distinct objects visited.
    pub visited: usize,
}

impl PropagationReport {
    /// Returns `true` if at least one grant was created.
    pub fn changed(&self) -> bool {
        !self.granted.is_empty()
    }
}

/// Grant storage and propagation over a store transaction.
pub struct PermissionGraph<'a> {
    directory: &'a dyn GroupDirectory,
    policy: PropagationPolicy,
}

impl<'a> PermissionGraph<'a> {
    pub fn new(directory: &'a dyn GroupDirectory, policy: PropagationPolicy) -> Self {
        Self { directory, policy }
    }

    pub fn directory(&self) -> &'a dyn GroupDirectory {
        self.directory
    }

    pub fn policy(&self) -> PropagationPolicy {
        self.policy
    }

    /// Create the grant `(object, group)`.
    ///
    /// Returns `true` if this call created it, `false` if it already existed.
    pub fn grant(
        &self,
        tx: &mut dyn StoreTx,
        object: &ObjectId,
        group: &GroupId,
        reason: &GrantReason,
    ) -> CoreResult<bool> {
        let record = PermissionRecord::new(*object, group.clone(), reason.clone());
        let claim = insert_or_fetch(
            tx,
            |tx| tx.insert_permission(&record),
            |tx| tx.permission(object, group),
        )?;
        match claim {
            Claim::Inserted => {
                debug!(
                    object = %object.short_id(),
                    group = %group,
                    reason = %reason.reason_type,
                    "grant created"
                );
                Ok(true)
            }
            Claim::Existing(_) => Ok(false),
        }
    }

    /// Grant `group` access to `root` and its descendants.
    ///
    /// Traversal is breadth-first with a visited set, so diamonds are
    /// granted once and cycles terminate. Under
    /// [`PropagationPolicy::NoveltyBounded`] the descent stops below any node
    /// that already held the grant.
    pub fn give_access(
        &self,
        tx: &mut dyn StoreTx,
        root: &ObjectId,
        group: &GroupId,
        reason: &GrantReason,
    ) -> CoreResult<PropagationReport> {
        if tx.object(root)?.is_none() {
            return Err(CoreError::ObjectNotFound(*root));
        }

        let mut report = PropagationReport::default();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([*root]);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            report.visited += 1;

            let created = self.grant(tx, &current, group, reason)?;
            if created {
                report.granted.push(current);
            }

            let descend = match self.policy {
                PropagationPolicy::Exhaustive => true,
                PropagationPolicy::NoveltyBounded => created,
            };
            if descend {
                for edge in tx.children_of(&current)? {
                    if !visited.contains(&edge.child) {
                        queue.push_back(edge.child);
                    }
                }
            }
        }

        debug!(
            root = %root.short_id(),
            group = %group,
            granted = report.granted.len(),
            visited = report.visited,
            "propagation complete"
        );
        Ok(report)
    }

    /// Returns `true` if any of the user's groups holds a grant on `object`.
    pub fn has_explicit_access(
        &self,
        tx: &dyn StoreTx,
        object: &ObjectId,
        user: &UserId,
    ) -> CoreResult<bool> {
        for group in self.directory.groups_of(user)? {
            if tx.permission(object, &group)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Grants on `object` the requestor is allowed to enumerate.
    ///
    /// Members of a [`Capability::SharingObjects`] group see every grant;
    /// everyone else sees only the grants of their own groups.
    pub fn grants_visible_to(
        &self,
        tx: &dyn StoreTx,
        object: &ObjectId,
        requestor: &UserId,
    ) -> CoreResult<Vec<PermissionRecord>> {
        let grants = tx.permissions_of(object)?;
        if self
            .directory
            .has_capability(requestor, Capability::SharingObjects)?
        {
            return Ok(grants);
        }
        let groups: HashSet<GroupId> = self.directory.groups_of(requestor)?.into_iter().collect();
        Ok(grants
            .into_iter()
            .filter(|grant| groups.contains(&grant.group))
            .collect())
    }

    /// Users recorded on `ADDED` grants that name `object` itself, in grant
    /// order.
    ///
    /// Grants copied from a parent name the child too, so linking a child
    /// counts its linker among the child's uploaders. Grants propagated from
    /// an ancestor name the ancestor and are excluded.
    pub fn uploaders(&self, tx: &dyn StoreTx, object: &ObjectId) -> CoreResult<Vec<UserId>> {
        let mut uploaders: Vec<UserId> = Vec::new();
        for grant in tx.permissions_of(object)? {
            let reason = &grant.reason;
            if reason.reason_type == ReasonType::Added
                && reason.related_object == *object
                && !uploaders.contains(&reason.related_user)
            {
                uploaders.push(reason.related_user.clone());
            }
        }
        Ok(uploaders)
    }
}
