use padlock_core::PadlockError;

/// Extension trait for converting `sqlx::Error` into `PadlockError`.
///
/// Due to Rust's orphan rules, we can't implement `From<sqlx::Error> for PadlockError`
/// in this crate. Instead, use `.into_padlock_error()` or `map_err`.
///
/// Unique violations become [`PadlockError::Conflict`] and foreign-key
/// violations [`PadlockError::NotFound`], which is what the role API retries on.
pub trait SqlxErrorExt {
    fn into_padlock_error(self) -> PadlockError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_padlock_error(self) -> PadlockError {
        match &self {
            sqlx::Error::RowNotFound => PadlockError::NotFound("Row not found".into()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PadlockError::Conflict(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                PadlockError::NotFound(db.message().to_string())
            }
            _ => PadlockError::database(self),
        }
    }
}

/// Convenience alias for store results using `PadlockError`.
pub type SqlxResult<T> = Result<T, PadlockError>;
