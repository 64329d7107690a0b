// Central Error Type for the Persistence Layer

use thiserror::Error;

/// Store-level error type.
///
/// Callers must be able to tell not-found apart from integrity violations
/// and from connectivity failures, so those are distinct variants rather
/// than stringly-typed database errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("unique constraint violated on {entity} ({constraint}): {detail}")]
    UniqueViolation {
        entity: &'static str,
        constraint: String,
        detail: String,
    },

    #[error("foreign key constraint violated on {entity}: {detail}")]
    ForeignKeyViolation {
        entity: &'static str,
        detail: String,
    },

    #[error("storage connection failure: {0}")]
    Connection(String),

    #[error("connection pool exhausted after waiting {waited_ms} ms")]
    PoolExhausted { waited_ms: u64 },

    #[error("validation error: {0}")]
    Validation(#[from] crate::domain::DomainError),

    #[error("transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

// Note: sqlx::Error conversion is handled in the infra-sqlite crate
// (orphan rules forbid implementing From<sqlx::Error> here).
