//! In-process role store.

use crate::error::PadlockError;
use crate::model::{ResourceRef, Role, RoleId, SubjectRef};
use crate::store::{BoxFuture, RoleStore};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RoleKey {
    name: String,
    resource: ResourceRef,
}

impl RoleKey {
    fn new(name: &str, resource: &ResourceRef) -> Self {
        Self {
            name: name.to_string(),
            resource: resource.clone(),
        }
    }
}

struct RoleEntry {
    role: Role,
    members: BTreeSet<String>,
}

/// In-memory [`RoleStore`] backed by `DashMap`.
///
/// Roles are keyed by their (name, resource) triple, so the uniqueness
/// invariant holds by construction: `create_role` on an occupied key reports
/// a conflict. Per-key operations (membership changes, compare-and-delete)
/// run under the key's shard lock and are atomic with respect to each other.
///
/// Clones share the same underlying state.
///
/// # Example
///
/// ```ignore
/// use padlock_core::{MemoryRoleStore, RoleRegistry};
///
/// let store = MemoryRoleStore::new();
/// let registry = RoleRegistry::new(store.clone());
/// registry.grant_role(&alice, "owner", &project).await?;
/// assert_eq!(store.role_count(), 1);
/// ```
#[derive(Clone)]
pub struct MemoryRoleStore {
    roles: Arc<DashMap<RoleKey, RoleEntry>>,
    ids: Arc<DashMap<RoleId, RoleKey>>,
    next_id: Arc<AtomicI64>,
}

impl MemoryRoleStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            roles: Arc::new(DashMap::new()),
            ids: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Number of role rows currently stored.
    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    /// Number of members of a role (0 if the role does not exist).
    pub fn member_count(&self, role_id: RoleId) -> usize {
        self.with_entry(role_id, |entry| entry.members.len())
            .unwrap_or(0)
    }

    fn key_for(&self, role_id: RoleId) -> Option<RoleKey> {
        self.ids.get(&role_id).map(|k| k.value().clone())
    }

    fn with_entry<T>(&self, role_id: RoleId, f: impl FnOnce(&RoleEntry) -> T) -> Option<T> {
        let key = self.key_for(role_id)?;
        let entry = self.roles.get(&key)?;
        if entry.role.id != role_id {
            return None;
        }
        Some(f(entry.value()))
    }

    fn with_entry_mut<T>(
        &self,
        role_id: RoleId,
        f: impl FnOnce(&mut RoleEntry) -> T,
    ) -> Option<T> {
        let key = self.key_for(role_id)?;
        let mut entry = self.roles.get_mut(&key)?;
        if entry.role.id != role_id {
            return None;
        }
        Some(f(entry.value_mut()))
    }

    fn collect_roles(&self, mut pred: impl FnMut(&RoleEntry) -> bool) -> Vec<Role> {
        let mut roles: Vec<Role> = self
            .roles
            .iter()
            .filter(|e| pred(e.value()))
            .map(|e| e.role.clone())
            .collect();
        roles.sort_by_key(|r| r.id);
        roles
    }

    fn create(&self, name: &str, resource: &ResourceRef) -> Result<Role, PadlockError> {
        let key = RoleKey::new(name, resource);
        match self.roles.entry(key.clone()) {
            Entry::Occupied(_) => Err(PadlockError::Conflict(format!(
                "role '{name}' already exists on {resource}"
            ))),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let role = Role {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed),
                    name: name.to_string(),
                    resource: resource.clone(),
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(RoleEntry {
                    role: role.clone(),
                    members: BTreeSet::new(),
                });
                self.ids.insert(role.id, key);
                Ok(role)
            }
        }
    }

    fn delete(&self, role_id: RoleId, only_if_unheld: bool) -> bool {
        let Some(key) = self.key_for(role_id) else {
            return false;
        };
        let removed = self
            .roles
            .remove_if(&key, |_, entry| {
                entry.role.id == role_id && (!only_if_unheld || entry.members.is_empty())
            })
            .is_some();
        if removed {
            self.ids.remove(&role_id);
        }
        removed
    }

    fn delete_for_resource(&self, resource: &ResourceRef) -> u64 {
        let doomed: Vec<(RoleKey, RoleId)> = self
            .roles
            .iter()
            .filter(|e| e.role.is_on(resource))
            .map(|e| (e.key().clone(), e.role.id))
            .collect();
        let mut deleted = 0;
        for (key, id) in doomed {
            if self.roles.remove(&key).is_some() {
                self.ids.remove(&id);
                deleted += 1;
            }
        }
        deleted
    }
}

impl Default for MemoryRoleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleStore for MemoryRoleStore {
    fn find_role<'a>(
        &'a self,
        name: &'a str,
        resource: &'a ResourceRef,
    ) -> BoxFuture<'a, Result<Option<Role>, PadlockError>> {
        let role = self
            .roles
            .get(&RoleKey::new(name, resource))
            .map(|e| e.role.clone());
        Box::pin(std::future::ready(Ok(role)))
    }

    fn create_role<'a>(
        &'a self,
        name: &'a str,
        resource: &'a ResourceRef,
    ) -> BoxFuture<'a, Result<Role, PadlockError>> {
        Box::pin(std::future::ready(self.create(name, resource)))
    }

    fn delete_role(&self, role_id: RoleId) -> BoxFuture<'_, Result<bool, PadlockError>> {
        Box::pin(std::future::ready(Ok(self.delete(role_id, false))))
    }

    fn delete_role_if_unheld(
        &self,
        role_id: RoleId,
    ) -> BoxFuture<'_, Result<bool, PadlockError>> {
        Box::pin(std::future::ready(Ok(self.delete(role_id, true))))
    }

    fn add_member<'a>(
        &'a self,
        role_id: RoleId,
        subject_id: &'a str,
    ) -> BoxFuture<'a, Result<bool, PadlockError>> {
        let result = self
            .with_entry_mut(role_id, |entry| entry.members.insert(subject_id.to_string()))
            .ok_or_else(|| PadlockError::NotFound(format!("role {role_id}")));
        Box::pin(std::future::ready(result))
    }

    fn remove_member<'a>(
        &'a self,
        role_id: RoleId,
        subject_id: &'a str,
    ) -> BoxFuture<'a, Result<bool, PadlockError>> {
        let removed = self
            .with_entry_mut(role_id, |entry| entry.members.remove(subject_id))
            .unwrap_or(false);
        Box::pin(std::future::ready(Ok(removed)))
    }

    fn is_member<'a>(
        &'a self,
        role_id: RoleId,
        subject_id: &'a str,
    ) -> BoxFuture<'a, Result<bool, PadlockError>> {
        let member = self
            .with_entry(role_id, |entry| entry.members.contains(subject_id))
            .unwrap_or(false);
        Box::pin(std::future::ready(Ok(member)))
    }

    fn roles_for_subject<'a>(
        &'a self,
        subject_id: &'a str,
        resource: Option<&'a ResourceRef>,
    ) -> BoxFuture<'a, Result<Vec<Role>, PadlockError>> {
        let roles = self.collect_roles(|entry| {
            entry.members.contains(subject_id) && resource.map_or(true, |r| entry.role.is_on(r))
        });
        Box::pin(std::future::ready(Ok(roles)))
    }

    fn roles_for_resource<'a>(
        &'a self,
        resource: &'a ResourceRef,
    ) -> BoxFuture<'a, Result<Vec<Role>, PadlockError>> {
        let roles = self.collect_roles(|entry| entry.role.is_on(resource));
        Box::pin(std::future::ready(Ok(roles)))
    }

    fn subjects_for_resource<'a>(
        &'a self,
        resource: &'a ResourceRef,
    ) -> BoxFuture<'a, Result<Vec<SubjectRef>, PadlockError>> {
        let subjects: BTreeSet<String> = self
            .roles
            .iter()
            .filter(|e| e.role.is_on(resource))
            .flat_map(|e| e.members.clone())
            .collect();
        let subjects = subjects.into_iter().map(SubjectRef).collect();
        Box::pin(std::future::ready(Ok(subjects)))
    }

    fn delete_roles_for_resource<'a>(
        &'a self,
        resource: &'a ResourceRef,
    ) -> BoxFuture<'a, Result<u64, PadlockError>> {
        Box::pin(std::future::ready(Ok(self.delete_for_resource(resource))))
    }
}
