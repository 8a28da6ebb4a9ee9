//! Store error taxonomy.
//!
//! Validation failures surface as `InvalidArgument` before any I/O;
//! `NotFound` maps missing rows; `Cancelled` is produced when a deadline
//! or the planner's cancel scope fires; everything unexpected from the
//! driver is wrapped with its calling context.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal: {0}")]
    Internal(String),

    #[error("{context}: {source}")]
    Database {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Core(#[from] modfind_core::CoreError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("no matching row".into()),
            other => Self::Database {
                context: "query failed".into(),
                source: other,
            },
        }
    }
}

impl StoreError {
    /// Rewraps a database error with the operation it happened in.
    pub fn in_context(self, context: &str) -> Self {
        match self {
            Self::Database { source, .. } => Self::Database {
                context: context.to_string(),
                source,
            },
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Convenience alias used throughout modfind-store.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_context_rewrap() {
        let err: StoreError = sqlx::Error::PoolTimedOut.into();
        let err = err.in_context("insert module");
        assert!(err.to_string().starts_with("insert module:"));
    }

    #[test]
    fn test_core_error_passthrough() {
        let core = modfind_core::CoreError::InvalidVersion {
            version: "nope".into(),
            message: "missing 'v' prefix".into(),
        };
        let err: StoreError = core.into();
        assert!(err.to_string().contains("invalid version"));
    }
}
