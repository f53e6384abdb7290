//! Resource-side view of the role API.
//!
//! These mirror the subject-side operations on [`RoleRegistry`] with the
//! arguments flipped, plus the queries that only make sense from a resource:
//! who is accepted by it, and cascading cleanup when it is deleted.

use crate::error::PadlockError;
use crate::model::{ResourceScope, Role, Subject, SubjectRef};
use crate::names::IntoRoleNames;
use crate::registry::RoleRegistry;

impl RoleRegistry {
    /// Does `resource` accept `subject` under any of `names`?
    pub async fn accepts_role<R, S>(
        &self,
        resource: &R,
        names: impl IntoRoleNames,
        subject: &S,
    ) -> Result<bool, PadlockError>
    where
        R: ResourceScope + ?Sized,
        S: Subject + ?Sized,
    {
        self.has_role(subject, names, resource).await
    }

    /// Grant `name` on `resource` to `subject`.
    pub async fn grant_role_to<R, S>(
        &self,
        resource: &R,
        name: impl AsRef<str>,
        subject: &S,
    ) -> Result<(), PadlockError>
    where
        R: ResourceScope + ?Sized,
        S: Subject + ?Sized,
    {
        self.grant_role(subject, name, resource).await
    }

    /// Revoke `name` on `resource` from `subject`.
    pub async fn revoke_role_from<R, S>(
        &self,
        resource: &R,
        name: impl AsRef<str>,
        subject: &S,
    ) -> Result<(), PadlockError>
    where
        R: ResourceScope + ?Sized,
        S: Subject + ?Sized,
    {
        self.revoke_role(subject, name, resource).await
    }

    /// Names of the roles `resource` accepts from `subject`.
    pub async fn roles_accepted_from<R, S>(
        &self,
        resource: &R,
        subject: &S,
    ) -> Result<Vec<String>, PadlockError>
    where
        R: ResourceScope + ?Sized,
        S: Subject + ?Sized,
    {
        self.roles_on(subject, resource).await
    }

    /// Roles scoped to `resource`, whoever holds them.
    pub async fn accepted_roles<R>(&self, resource: &R) -> Result<Vec<Role>, PadlockError>
    where
        R: ResourceScope + ?Sized,
    {
        let resource = resource.to_resource_ref();
        self.store().roles_for_resource(&resource).await
    }

    /// Distinct subjects holding any role on `resource`.
    pub async fn subjects_accepted<R>(&self, resource: &R) -> Result<Vec<SubjectRef>, PadlockError>
    where
        R: ResourceScope + ?Sized,
    {
        let resource = resource.to_resource_ref();
        self.store().subjects_for_resource(&resource).await
    }

    /// Subjects holding any of `names` on `resource`.
    pub async fn subjects_accepted_with_role<R>(
        &self,
        resource: &R,
        names: impl IntoRoleNames,
    ) -> Result<Vec<SubjectRef>, PadlockError>
    where
        R: ResourceScope + ?Sized,
    {
        let resource = resource.to_resource_ref();
        let names = names.into_role_names();
        let candidates = self.store().subjects_for_resource(&resource).await?;

        let mut accepted = Vec::with_capacity(candidates.len());
        for subject in candidates {
            if self
                .has_role_on(subject.subject_id(), &names, &resource)
                .await?
            {
                accepted.push(subject);
            }
        }
        Ok(accepted)
    }

    /// Delete every role scoped to `resource`, memberships included.
    ///
    /// Call this when the resource itself is deleted. Returns the number of
    /// roles removed.
    pub async fn destroy_resource<R>(&self, resource: &R) -> Result<u64, PadlockError>
    where
        R: ResourceScope + ?Sized,
    {
        let resource = resource.to_resource_ref();
        let deleted = self.store().delete_roles_for_resource(&resource).await?;
        if deleted > 0 {
            tracing::debug!(resource = %resource, roles = deleted, "resource roles deleted");
        }
        Ok(deleted)
    }
}
