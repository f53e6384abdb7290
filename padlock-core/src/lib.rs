//! Role-based access control for axum applications.
//!
//! Subjects (users, service accounts) hold named roles scoped to individual
//! resources. Handlers are gated by declarative guard rules that decide, per
//! action, whether the current subject may proceed.
//!
//! # Overview
//!
//! - **Roles** are bound to exactly one resource instance: `owner` of
//!   `Project:1` and `owner` of `Project:2` are distinct roles. A role row is
//!   created the first time it is granted and removed when its last holder is
//!   revoked.
//! - **[`RoleRegistry`]** exposes the role API from the subject side
//!   (`has_role`, `grant_role`, `revoke_role`, ...) and from the resource side
//!   (`accepts_role`, `grant_role_to`, `subjects_accepted_with_role`, ...).
//! - **[`RoleStore`]** is the persistence seam. [`MemoryRoleStore`] ships here;
//!   `padlock-data-sqlx` provides an SQLite store.
//! - **[`RoleRequirements`]** holds the guard rules of one scope and
//!   **[`PadlockGuard`]** runs them before a handler.
//!
//! # Setup
//!
//! ```ignore
//! use padlock_core::prelude::*;
//!
//! struct Project { id: i64 }
//!
//! impl Authorizable for Project {
//!     const RESOURCE_TYPE: &'static str = "Project";
//!     fn resource_id(&self) -> String { self.id.to_string() }
//! }
//!
//! let registry = RoleRegistry::new(MemoryRoleStore::new());
//! registry.grant_role(&alice, "owner", &Project { id: 1 }).await?;
//! ```
//!
//! # Guard rules
//!
//! ```ignore
//! let rules = RoleRequirements::<AppState>::new()
//!     .lock_unless(
//!         PadlockOptions::new().only(["edit", "update"]),
//!         UnlockPredicate::new(|ctx: UnlockContext<'_, AppState>| Box::pin(async move {
//!             let id = ctx.param("id").unwrap_or_default();
//!             ctx.scope
//!                 .registry
//!                 .current_has_role(ctx.subject, "owner", &ResourceRef::new("Project", id))
//!                 .await
//!         })),
//!     );
//!
//! let guard = PadlockGuard::new(rules);
//! ```
//!
//! # Testing
//!
//! ```ignore
//! let store = MemoryRoleStore::new();
//! let registry = RoleRegistry::new(store.clone());
//!
//! registry.grant_role(&SubjectRef::new("alice"), "owner", &project).await?;
//! assert_eq!(store.role_count(), 1);
//! ```

pub mod config;
pub mod error;
pub mod guards;
pub mod layers;
pub mod memory;
pub mod model;
pub mod names;
pub mod registry;
pub mod resource;
pub mod rules;
pub mod store;

pub use config::PadlockConfig;
pub use error::{error_response, PadlockError};
pub use guards::{access_denied, Guard, GuardContext, PadlockGuard, PathParams};
pub use layers::init_tracing;
pub use memory::MemoryRoleStore;
pub use model::{Authorizable, ResourceRef, ResourceScope, Role, RoleId, Subject, SubjectRef};
pub use names::{IntoRoleNames, RoleNames};
pub use registry::{ResourceLoader, RoleRegistry};
pub use rules::{
    ActionFilter, GuardRule, PadlockOptions, RequestParams, RoleRequirements, UnlockContext,
    UnlockPredicate,
};
pub use store::{BoxFuture, RoleStore};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::PadlockConfig;
    pub use crate::error::PadlockError;
    pub use crate::guards::{Guard, GuardContext, PadlockGuard, PathParams};
    pub use crate::memory::MemoryRoleStore;
    pub use crate::model::{Authorizable, ResourceRef, Subject, SubjectRef};
    pub use crate::registry::RoleRegistry;
    pub use crate::rules::{
        PadlockOptions, RequestParams, RoleRequirements, UnlockContext, UnlockPredicate,
    };
    pub use crate::store::RoleStore;
}
