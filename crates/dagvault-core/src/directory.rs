//! The group/user directory consumed by the access-control core.
//!
//! The directory owns groups, memberships and capability flags. This crate
//! only asks it questions; creating groups or authenticating users happens
//! elsewhere. [`InMemoryDirectory`] is provided for tests and embedding.

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard};

use dagvault_types::{Capability, GroupId, UserId};

use crate::error::{CoreError, CoreResult};

/// Membership and capability queries against the group directory.
pub trait GroupDirectory: Send + Sync {
    /// Returns `true` if the group is known to the directory.
    fn group_exists(&self, group: &GroupId) -> CoreResult<bool>;

    fn is_member(&self, user: &UserId, group: &GroupId) -> CoreResult<bool>;

    /// Every group the user belongs to, sorted by name.
    fn groups_of(&self, user: &UserId) -> CoreResult<Vec<GroupId>>;

    /// Every group holding `capability`, sorted by name.
    fn groups_with_capability(&self, capability: Capability) -> CoreResult<Vec<GroupId>>;

    /// Groups that receive a grant on every stored object.
    fn all_access_groups(&self) -> CoreResult<Vec<GroupId>> {
        self.groups_with_capability(Capability::AccessAllObjects)
    }

    /// Groups the user belongs to that hold `capability`.
    fn member_groups_with_capability(
        &self,
        user: &UserId,
        capability: Capability,
    ) -> CoreResult<Vec<GroupId>> {
        let mut groups = Vec::new();
        for group in self.groups_with_capability(capability)? {
            if self.is_member(user, &group)? {
                groups.push(group);
            }
        }
        Ok(groups)
    }

    /// Returns `true` if any of the user's groups holds `capability`.
    fn has_capability(&self, user: &UserId, capability: Capability) -> CoreResult<bool> {
        Ok(!self.member_groups_with_capability(user, capability)?.is_empty())
    }
}

#[derive(Debug, Default)]
struct GroupEntry {
    capabilities: BTreeSet<Capability>,
    members: BTreeSet<UserId>,
}

/// An in-memory implementation of [`GroupDirectory`].
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    groups: RwLock<HashMap<GroupId, GroupEntry>>,
}

impl InMemoryDirectory {
    /// Create a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> CoreResult<RwLockReadGuard<'_, HashMap<GroupId, GroupEntry>>> {
        self.groups
            .read()
            .map_err(|e| CoreError::Directory(format!("lock poisoned: {e}")))
    }

    /// Register a group (or extend an existing one) with capabilities.
    pub fn add_group(
        &self,
        group: impl Into<String>,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> CoreResult<GroupId> {
        let group = GroupId::new(group);
        let mut groups = self
            .groups
            .write()
            .map_err(|e| CoreError::Directory(format!("lock poisoned: {e}")))?;
        groups
            .entry(group.clone())
            .or_default()
            .capabilities
            .extend(capabilities);
        Ok(group)
    }

    /// Add a user to a registered group.
    pub fn add_member(&self, group: &GroupId, user: impl Into<String>) -> CoreResult<UserId> {
        let user = UserId::new(user);
        let mut groups = self
            .groups
            .write()
            .map_err(|e| CoreError::Directory(format!("lock poisoned: {e}")))?;
        let entry = groups
            .get_mut(group)
            .ok_or_else(|| CoreError::Directory(format!("unknown group: {group}")))?;
        entry.members.insert(user.clone());
        Ok(user)
    }
}

impl GroupDirectory for InMemoryDirectory {
    fn group_exists(&self, group: &GroupId) -> CoreResult<bool> {
        Ok(self.read()?.contains_key(group))
    }

    fn is_member(&self, user: &UserId, group: &GroupId) -> CoreResult<bool> {
        Ok(self
            .read()?
            .get(group)
            .is_some_and(|entry| entry.members.contains(user)))
    }

    fn groups_of(&self, user: &UserId) -> CoreResult<Vec<GroupId>> {
        let mut groups: Vec<GroupId> = self
            .read()?
            .iter()
            .filter(|(_, entry)| entry.members.contains(user))
            .map(|(group, _)| group.clone())
            .collect();
        groups.sort();
        Ok(groups)
    }

    fn groups_with_capability(&self, capability: Capability) -> CoreResult<Vec<GroupId>> {
        let mut groups: Vec<GroupId> = self
            .read()?
            .iter()
            .filter(|(_, entry)| entry.capabilities.contains(&capability))
            .map(|(group, _)| group.clone())
            .collect();
        groups.sort();
        Ok(groups)
    }
}
