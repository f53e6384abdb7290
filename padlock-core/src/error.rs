use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Helper to create a JSON error response with a standard `{ "error": message }` body.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, Json(body)).into_response()
}

/// Errors that can occur in the role store, the role API, or rule registration.
///
/// Absence (no such role, no membership) is never reported through this type:
/// queries answer `false` or an empty list instead.
#[derive(Debug)]
pub enum PadlockError {
    /// A row the operation depends on disappeared (e.g. a role deleted
    /// between lookup and membership insert).
    NotFound(String),
    /// A role with the same (name, resource type, resource id) already exists.
    Conflict(String),
    /// Driver-level failure from the backing store.
    Database(Box<dyn std::error::Error + Send + Sync>),
    /// Unrecognized guard-rule option key.
    InvalidOption(String),
    /// Invalid configuration.
    InvalidConfig(String),
    /// `grant_role` kept racing with concurrent writers.
    RetriesExhausted { attempts: u32 },
    Other(String),
}

impl PadlockError {
    /// Construct a `Database` variant from any error type.
    ///
    /// Used by backend crates (e.g. `padlock-data-sqlx`) to wrap
    /// driver-specific errors.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        PadlockError::Database(Box::new(err))
    }

    /// Whether a `grant_role` attempt failing with this error should retry the
    /// find step instead of surfacing it.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PadlockError::Conflict(_) | PadlockError::NotFound(_))
    }
}

impl std::fmt::Display for PadlockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PadlockError::NotFound(msg) => write!(f, "Not found: {msg}"),
            PadlockError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            PadlockError::Database(err) => write!(f, "Database error: {err}"),
            PadlockError::InvalidOption(key) => write!(f, "Unknown padlock option: {key}"),
            PadlockError::InvalidConfig(msg) => write!(f, "Invalid padlock config: {msg}"),
            PadlockError::RetriesExhausted { attempts } => {
                write!(f, "Role grant gave up after {attempts} attempts")
            }
            PadlockError::Other(msg) => write!(f, "Padlock error: {msg}"),
        }
    }
}

impl std::error::Error for PadlockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PadlockError::Database(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for PadlockError {
    fn from(err: serde_yaml::Error) -> Self {
        PadlockError::InvalidConfig(err.to_string())
    }
}

/// Every store or configuration failure surfaces to clients as a generic 500;
/// details stay in the logs.
impl IntoResponse for PadlockError {
    fn into_response(self) -> Response {
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Authorization check failed",
        )
    }
}

pub type Result<T> = std::result::Result<T, PadlockError>;
