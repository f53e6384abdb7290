//! Configuration for Padlock.

use crate::error::PadlockError;
use serde::Deserialize;

fn default_max_connections() -> u32 { 5 }
fn default_grant_retry_limit() -> u32 { 3 }
fn default_action() -> String { "index".to_string() }

/// Padlock settings.
///
/// Can be deserialized from the `padlock` section of `application.yaml`.
/// All fields have defaults.
///
/// ```yaml
/// padlock:
///   database_url: "sqlite://roles.db"   # optional, used by padlock-data-sqlx
///   max_connections: 5                  # default: 5
///   grant_retry_limit: 3                # default: 3
///   default_action: "index"             # default: "index"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PadlockConfig {
    /// Connection string of the role store, if it is a database.
    #[serde(default)]
    pub database_url: Option<String>,
    /// Pool size for database-backed stores. Default: 5.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How many times `grant_role` retries after losing a race with a
    /// concurrent create or delete. Default: 3.
    #[serde(default = "default_grant_retry_limit")]
    pub grant_retry_limit: u32,
    /// Action identifier assumed when a request carries none. Default: "index".
    #[serde(default = "default_action")]
    pub default_action: String,
}

impl Default for PadlockConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: default_max_connections(),
            grant_retry_limit: default_grant_retry_limit(),
            default_action: default_action(),
        }
    }
}

impl PadlockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document holding a top-level `padlock:` section.
    ///
    /// A document without the section yields the defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PadlockError> {
        #[derive(Deserialize)]
        struct Root {
            #[serde(default)]
            padlock: Option<PadlockConfig>,
        }
        let root: Root = serde_yaml::from_str(yaml)?;
        let config = root.padlock.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Set the database connection string.
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Set the pool size.
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the grant retry limit.
    pub fn with_grant_retry_limit(mut self, limit: u32) -> Self {
        self.grant_retry_limit = limit;
        self
    }

    /// Set the default action identifier.
    pub fn with_default_action(mut self, action: impl Into<String>) -> Self {
        self.default_action = action.into();
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), PadlockError> {
        if self.max_connections == 0 {
            return Err(PadlockError::InvalidConfig(
                "max_connections must be at least 1".into(),
            ));
        }
        if self.default_action.is_empty() {
            return Err(PadlockError::InvalidConfig(
                "default_action cannot be empty".into(),
            ));
        }
        if matches!(&self.database_url, Some(url) if url.is_empty()) {
            return Err(PadlockError::InvalidConfig(
                "database_url cannot be empty".into(),
            ));
        }
        Ok(())
    }
}
