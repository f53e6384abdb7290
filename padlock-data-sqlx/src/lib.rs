//! SQLx backend for Padlock.
//!
//! Provides [`SqlxRoleStore`], a [`RoleStore`](padlock_core::RoleStore) on
//! SQLite, plus pool helpers and the schema migrations.
//!
//! ```ignore
//! use padlock_core::{PadlockConfig, RoleRegistry};
//! use padlock_data_sqlx::SqlxRoleStore;
//!
//! let config = PadlockConfig::from_yaml_str(&std::fs::read_to_string("application.yaml")?)?;
//! let store = SqlxRoleStore::connect(&config).await?;
//! let registry = RoleRegistry::with_config(store, &config);
//! ```

pub mod error;
pub mod pool;
pub mod store;

pub use error::{SqlxErrorExt, SqlxResult};
pub use pool::{create_pool, memory_pool};
pub use store::SqlxRoleStore;
