//! Role store abstraction.
//!
//! [`RoleStore`] is the persistence seam: implement it to keep roles in any
//! relational (or non-relational) store. The role API only relies on the
//! contract documented on each method, in particular:
//!
//! - [`create_role`](RoleStore::create_role) never inserts a second row for an
//!   existing (name, resource type, resource id) triple and reports
//!   [`PadlockError::Conflict`] instead.
//! - [`delete_role_if_unheld`](RoleStore::delete_role_if_unheld) is a
//!   compare-and-delete: it deletes only if the role has no members at the
//!   moment of deletion.
//!
//! Provided implementations:
//! - [`MemoryRoleStore`](crate::memory::MemoryRoleStore): in-process store
//! - `SqlxRoleStore` in `padlock-data-sqlx`: SQLite through SQLx

use crate::error::PadlockError;
use crate::model::{ResourceRef, Role, RoleId, SubjectRef};
use std::future::Future;
use std::pin::Pin;

/// Boxed, sendable future used by the object-safe store trait.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Persistence backend for roles and their subject memberships.
pub trait RoleStore: Send + Sync + 'static {
    /// Find the role with this exact (name, resource) triple.
    fn find_role<'a>(
        &'a self,
        name: &'a str,
        resource: &'a ResourceRef,
    ) -> BoxFuture<'a, Result<Option<Role>, PadlockError>>;

    /// Insert a new role row.
    ///
    /// Fails with [`PadlockError::Conflict`] if the triple already exists.
    fn create_role<'a>(
        &'a self,
        name: &'a str,
        resource: &'a ResourceRef,
    ) -> BoxFuture<'a, Result<Role, PadlockError>>;

    /// Delete a role and all of its memberships. Returns `false` if it did
    /// not exist.
    fn delete_role(&self, role_id: RoleId) -> BoxFuture<'_, Result<bool, PadlockError>>;

    /// Delete a role only if it currently has no members.
    ///
    /// Returns `true` if the role was deleted.
    fn delete_role_if_unheld(&self, role_id: RoleId)
        -> BoxFuture<'_, Result<bool, PadlockError>>;

    /// Add `subject_id` to the role's members.
    ///
    /// Returns `false` if the subject already was a member. Fails with
    /// [`PadlockError::NotFound`] if the role no longer exists.
    fn add_member<'a>(
        &'a self,
        role_id: RoleId,
        subject_id: &'a str,
    ) -> BoxFuture<'a, Result<bool, PadlockError>>;

    /// Remove `subject_id` from the role's members. Returns `false` if it was
    /// not a member.
    fn remove_member<'a>(
        &'a self,
        role_id: RoleId,
        subject_id: &'a str,
    ) -> BoxFuture<'a, Result<bool, PadlockError>>;

    fn is_member<'a>(
        &'a self,
        role_id: RoleId,
        subject_id: &'a str,
    ) -> BoxFuture<'a, Result<bool, PadlockError>>;

    /// Roles held by a subject, optionally restricted to one resource.
    ///
    /// Order is the store's natural order and is not part of the contract.
    fn roles_for_subject<'a>(
        &'a self,
        subject_id: &'a str,
        resource: Option<&'a ResourceRef>,
    ) -> BoxFuture<'a, Result<Vec<Role>, PadlockError>>;

    /// All roles scoped to a resource (its "accepted roles").
    fn roles_for_resource<'a>(
        &'a self,
        resource: &'a ResourceRef,
    ) -> BoxFuture<'a, Result<Vec<Role>, PadlockError>>;

    /// Distinct subjects holding any role on a resource.
    fn subjects_for_resource<'a>(
        &'a self,
        resource: &'a ResourceRef,
    ) -> BoxFuture<'a, Result<Vec<SubjectRef>, PadlockError>>;

    /// Delete every role scoped to a resource, with their memberships.
    /// Returns the number of roles deleted.
    fn delete_roles_for_resource<'a>(
        &'a self,
        resource: &'a ResourceRef,
    ) -> BoxFuture<'a, Result<u64, PadlockError>>;
}
