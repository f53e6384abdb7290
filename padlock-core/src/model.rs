//! Subjects, resources and roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Surrogate key of a role row.
pub type RoleId = i64;

/// Any entity capable of holding roles (a user, a service account, ...).
///
/// Subjects are owned outside of Padlock; only their identifier is stored in
/// role memberships.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Subject`",
    label = "this type cannot hold roles",
    note = "implement `Subject` for your user type, or use `SubjectRef` for a bare identifier"
)]
pub trait Subject: Send + Sync {
    /// Stable identifier of this subject (e.g. a user id or JWT "sub" claim).
    fn subject_id(&self) -> &str;
}

/// Owned subject identifier, returned when the store lists subjects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectRef(pub String);

impl SubjectRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl Subject for SubjectRef {
    fn subject_id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Any entity that roles can be scoped to.
///
/// `RESOURCE_TYPE` is the type tag stored next to the id in every role row.
/// Give every type a distinct tag; subtypes that should share roles with a
/// base type must use the base type's tag.
///
/// # Example
///
/// ```
/// use padlock_core::Authorizable;
///
/// struct Project { id: i64 }
///
/// impl Authorizable for Project {
///     const RESOURCE_TYPE: &'static str = "Project";
///     fn resource_id(&self) -> String { self.id.to_string() }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Authorizable`",
    label = "roles cannot be scoped to this type",
    note = "implement `Authorizable` with a `RESOURCE_TYPE` tag and a `resource_id` accessor"
)]
pub trait Authorizable: Send + Sync {
    const RESOURCE_TYPE: &'static str;

    fn resource_id(&self) -> String;

    fn resource_ref(&self) -> ResourceRef {
        ResourceRef::new(Self::RESOURCE_TYPE, self.resource_id())
    }
}

/// Anything that names one resource instance: every [`Authorizable`] type,
/// and a bare [`ResourceRef`].
pub trait ResourceScope: Send + Sync {
    fn to_resource_ref(&self) -> ResourceRef;
}

impl<R: Authorizable> ResourceScope for R {
    fn to_resource_ref(&self) -> ResourceRef {
        self.resource_ref()
    }
}

impl ResourceScope for ResourceRef {
    fn to_resource_ref(&self) -> ResourceRef {
        self.clone()
    }
}

/// Explicit (type tag, id) reference to one resource instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    pub resource_type: String,
    pub resource_id: String,
}

impl ResourceRef {
    pub fn new(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.resource_id)
    }
}

/// A named permission scope bound to exactly one resource instance.
///
/// Unique per (`name`, `resource.resource_type`, `resource.resource_id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub resource: ResourceRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Whether this role is scoped to `resource`.
    pub fn is_on(&self, resource: &ResourceRef) -> bool {
        &self.resource == resource
    }
}
