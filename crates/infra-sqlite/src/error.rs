// sqlx error mapping into the store taxonomy.

use studyhub_core::StoreError;

/// Convert a driver error into the store taxonomy for one entity.
///
/// SQLite extended result codes: 2067/1555 are UNIQUE violations (plain and
/// primary-key), 787/3850/1811 are FOREIGN KEY violations (1811 is
/// SQLITE_CONSTRAINT_TRIGGER, raised for ON DELETE RESTRICT actions because
/// FK actions run through SQLite's internal trigger machinery). Anything
/// transport- or protocol-shaped becomes a connection failure.
pub fn map_sqlx_error(entity: &'static str, err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();
            match db_err.code().as_deref() {
                Some("2067") | Some("1555") => StoreError::UniqueViolation {
                    entity,
                    constraint: unique_constraint_from(&message),
                    detail: message,
                },
                Some("787") | Some("3850") | Some("1811") => StoreError::ForeignKeyViolation {
                    entity,
                    detail: message,
                },
                Some(code) => {
                    StoreError::Connection(format!("database error [{code}]: {message}"))
                }
                None => StoreError::Connection(format!("database error: {message}")),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound {
            entity,
            key: "<row>".into(),
        },
        sqlx::Error::PoolTimedOut => StoreError::PoolExhausted { waited_ms: 0 },
        _ => StoreError::Connection(err.to_string()),
    }
}

/// Best-effort extraction of `table.column` from messages like
/// "UNIQUE constraint failed: accounts.email".
fn unique_constraint_from(message: &str) -> String {
    message
        .rsplit(':')
        .next()
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}
