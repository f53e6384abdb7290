//! Padlock - role-based access control for axum.
//!
//! This facade crate re-exports the Padlock sub-crates through a single
//! dependency with feature flags:
//!
//! ```ignore
//! use padlock::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature  | Default | Crate               |
//! |----------|---------|---------------------|
//! | `sqlite` | **yes** | `padlock-data-sqlx` |

pub extern crate padlock_core;

// Re-export everything from padlock-core at the top level for convenience.
pub use padlock_core::*;

#[cfg(feature = "sqlite")]
pub use padlock_data_sqlx;

#[cfg(feature = "sqlite")]
pub use padlock_data_sqlx::SqlxRoleStore;

/// Prelude for convenient imports.
pub mod prelude {
    pub use padlock_core::prelude::*;

    #[cfg(feature = "sqlite")]
    pub use padlock_data_sqlx::SqlxRoleStore;
}
