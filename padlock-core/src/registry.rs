//! Role registry - clonable handle to a role store.
//!
//! [`RoleRegistry`] owns the role lifecycle: roles are created the first time
//! a subject is granted them and garbage-collected when their last holder is
//! revoked. This module holds the subject-side operations; the resource-side
//! ones live in [`crate::resource`].

use crate::config::PadlockConfig;
use crate::error::PadlockError;
use crate::model::{Authorizable, ResourceRef, ResourceScope, Role, Subject};
use crate::names::IntoRoleNames;
use crate::store::{BoxFuture, RoleStore};
use std::collections::HashSet;
use std::sync::Arc;

const DEFAULT_GRANT_RETRY_LIMIT: u32 = 3;

/// Resolves resource ids of one type into resource instances.
///
/// This is the lookup half of the (type tag, id) reference: the role store
/// only knows ids, a loader turns them back into `R` values. Any
/// `Fn(&[String]) -> Result<Vec<R>, PadlockError>` closure is a loader.
pub trait ResourceLoader<R>: Send + Sync {
    fn load<'a>(&'a self, ids: &'a [String]) -> BoxFuture<'a, Result<Vec<R>, PadlockError>>;
}

impl<R, F> ResourceLoader<R> for F
where
    R: Send + 'static,
    F: Fn(&[String]) -> Result<Vec<R>, PadlockError> + Send + Sync,
{
    fn load<'a>(&'a self, ids: &'a [String]) -> BoxFuture<'a, Result<Vec<R>, PadlockError>> {
        Box::pin(std::future::ready(self(ids)))
    }
}

/// Clonable handle to a [`RoleStore`].
///
/// # Usage pattern
///
/// ```ignore
/// use padlock_core::{MemoryRoleStore, RoleRegistry};
///
/// let registry = RoleRegistry::new(MemoryRoleStore::new());
///
/// registry.grant_role(&alice, "owner", &project).await?;
/// assert!(registry.has_role(&alice, ["owner", "admin"], &project).await?);
///
/// registry.revoke_role(&alice, "owner", &project).await?;
/// assert!(!registry.has_role(&alice, "owner", &project).await?);
/// ```
#[derive(Clone)]
pub struct RoleRegistry {
    store: Arc<dyn RoleStore>,
    grant_retry_limit: u32,
}

impl RoleRegistry {
    /// Create a registry wrapping any [`RoleStore`].
    pub fn new(store: impl RoleStore) -> Self {
        Self::from_arc(Arc::new(store))
    }

    /// Create a registry over an already shared store.
    pub fn from_arc(store: Arc<dyn RoleStore>) -> Self {
        Self {
            store,
            grant_retry_limit: DEFAULT_GRANT_RETRY_LIMIT,
        }
    }

    /// Create a registry using the settings of `config`.
    pub fn with_config(store: impl RoleStore, config: &PadlockConfig) -> Self {
        Self::new(store).with_grant_retry_limit(config.grant_retry_limit)
    }

    /// Set how many times `grant_role` retries after a lost race.
    pub fn with_grant_retry_limit(mut self, limit: u32) -> Self {
        self.grant_retry_limit = limit;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn RoleStore> {
        &self.store
    }

    // ── Queries ────────────────────────────────────────────────────────

    /// Does `subject` hold any of `names` on `resource`?
    ///
    /// A resource without any roles simply answers `false`.
    pub async fn has_role<S, R>(
        &self,
        subject: &S,
        names: impl IntoRoleNames,
        resource: &R,
    ) -> Result<bool, PadlockError>
    where
        S: Subject + ?Sized,
        R: ResourceScope + ?Sized,
    {
        let resource = resource.to_resource_ref();
        self.has_role_on(subject.subject_id(), names, &resource).await
    }

    /// [`has_role`](Self::has_role) for an optional subject.
    ///
    /// This is the helper for views and unlock predicates: an anonymous
    /// request never holds a role.
    pub async fn current_has_role<S, R>(
        &self,
        subject: Option<&S>,
        names: impl IntoRoleNames,
        resource: &R,
    ) -> Result<bool, PadlockError>
    where
        S: Subject + ?Sized,
        R: ResourceScope + ?Sized,
    {
        match subject {
            Some(subject) => self.has_role(subject, names, resource).await,
            None => Ok(false),
        }
    }

    pub(crate) async fn has_role_on(
        &self,
        subject_id: &str,
        names: impl IntoRoleNames,
        resource: &ResourceRef,
    ) -> Result<bool, PadlockError> {
        for name in names.into_role_names().iter() {
            if let Some(role) = self.store.find_role(name, resource).await? {
                if self.store.is_member(role.id, subject_id).await? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Names of every role `subject` holds on `resource`.
    ///
    /// Order follows the store and is not guaranteed.
    pub async fn roles_on<S, R>(&self, subject: &S, resource: &R) -> Result<Vec<String>, PadlockError>
    where
        S: Subject + ?Sized,
        R: ResourceScope + ?Sized,
    {
        let resource = resource.to_resource_ref();
        let roles = self
            .store
            .roles_for_subject(subject.subject_id(), Some(&resource))
            .await?;
        Ok(roles.into_iter().map(|r| r.name).collect())
    }

    /// Distinct ids of resources of `resource_type` on which `subject` holds
    /// any of `names`, in first-seen order.
    pub async fn resource_ids_with_role<S>(
        &self,
        subject: &S,
        names: impl IntoRoleNames,
        resource_type: &str,
    ) -> Result<Vec<String>, PadlockError>
    where
        S: Subject + ?Sized,
    {
        let names = names.into_role_names();
        let roles = self
            .store
            .roles_for_subject(subject.subject_id(), None)
            .await?;
        let mut seen = HashSet::new();
        Ok(roles
            .into_iter()
            .filter(|r| r.resource.resource_type == resource_type && names.contains(&r.name))
            .map(|r| r.resource.resource_id)
            .filter(|id| seen.insert(id.clone()))
            .collect())
    }

    /// Distinct resources of type `R` on which `subject` holds any of `names`.
    pub async fn resources_with_role<S, R, L>(
        &self,
        subject: &S,
        names: impl IntoRoleNames,
        loader: &L,
    ) -> Result<Vec<R>, PadlockError>
    where
        S: Subject + ?Sized,
        R: Authorizable,
        L: ResourceLoader<R> + ?Sized,
    {
        let ids = self
            .resource_ids_with_role(subject, names, R::RESOURCE_TYPE)
            .await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut seen = HashSet::new();
        Ok(loader
            .load(&ids)
            .await?
            .into_iter()
            .filter(|r| seen.insert(r.resource_id()))
            .collect())
    }

    // ── Mutations ──────────────────────────────────────────────────────

    /// Grant `name` on `resource` to `subject`.
    ///
    /// Finds the role or creates it, then adds the membership. Granting a role
    /// the subject already holds is a no-op.
    pub async fn grant_role<S, R>(
        &self,
        subject: &S,
        name: impl AsRef<str>,
        resource: &R,
    ) -> Result<(), PadlockError>
    where
        S: Subject + ?Sized,
        R: ResourceScope + ?Sized,
    {
        let resource = resource.to_resource_ref();
        self.grant_role_on(subject.subject_id(), name.as_ref(), &resource)
            .await
    }

    async fn grant_role_on(
        &self,
        subject_id: &str,
        name: &str,
        resource: &ResourceRef,
    ) -> Result<(), PadlockError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_grant(subject_id, name, resource).await {
                Ok(added) => {
                    if added {
                        tracing::debug!(subject = subject_id, role = name, resource = %resource, "role granted");
                    }
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt <= self.grant_retry_limit => {
                    tracing::debug!(
                        subject = subject_id,
                        role = name,
                        resource = %resource,
                        attempt,
                        error = %e,
                        "role grant raced with a concurrent writer, retrying"
                    );
                }
                Err(e) if e.is_retryable() => {
                    return Err(PadlockError::RetriesExhausted { attempts: attempt });
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_grant(
        &self,
        subject_id: &str,
        name: &str,
        resource: &ResourceRef,
    ) -> Result<bool, PadlockError> {
        let role = match self.store.find_role(name, resource).await? {
            Some(role) => role,
            None => {
                let role = self.store.create_role(name, resource).await?;
                tracing::debug!(role = name, resource = %resource, role_id = role.id, "role created");
                role
            }
        };
        self.store.add_member(role.id, subject_id).await
    }

    /// Revoke `name` on `resource` from `subject`.
    ///
    /// A role left without members is deleted. Revoking a role that does not
    /// exist, or that the subject does not hold, is a no-op.
    pub async fn revoke_role<S, R>(
        &self,
        subject: &S,
        name: impl AsRef<str>,
        resource: &R,
    ) -> Result<(), PadlockError>
    where
        S: Subject + ?Sized,
        R: ResourceScope + ?Sized,
    {
        let resource = resource.to_resource_ref();
        if let Some(role) = self.store.find_role(name.as_ref(), &resource).await? {
            self.release(subject.subject_id(), &role).await?;
        }
        Ok(())
    }

    /// Revoke every role `subject` holds on `resource`.
    pub async fn revoke_all_roles_on<S, R>(&self, subject: &S, resource: &R) -> Result<(), PadlockError>
    where
        S: Subject + ?Sized,
        R: ResourceScope + ?Sized,
    {
        let resource = resource.to_resource_ref();
        let roles = self
            .store
            .roles_for_subject(subject.subject_id(), Some(&resource))
            .await?;
        for role in &roles {
            self.release(subject.subject_id(), role).await?;
        }
        Ok(())
    }

    /// Revoke every role `subject` holds, on any resource.
    pub async fn revoke_all_roles<S>(&self, subject: &S) -> Result<(), PadlockError>
    where
        S: Subject + ?Sized,
    {
        let roles = self
            .store
            .roles_for_subject(subject.subject_id(), None)
            .await?;
        for role in &roles {
            self.release(subject.subject_id(), role).await?;
        }
        Ok(())
    }

    /// Drop the membership, then garbage-collect the role if nobody holds it.
    ///
    /// The delete is conditional on the role still being unheld, so a grant
    /// that lands in between keeps the role alive.
    async fn release(&self, subject_id: &str, role: &Role) -> Result<(), PadlockError> {
        if self.store.remove_member(role.id, subject_id).await? {
            tracing::debug!(subject = subject_id, role = %role.name, resource = %role.resource, "role revoked");
        }
        if self.store.delete_role_if_unheld(role.id).await? {
            tracing::debug!(role = %role.name, resource = %role.resource, role_id = role.id, "unheld role deleted");
        }
        Ok(())
    }
}
