// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid {entity}.{field}: {message}")]
    Invalid {
        entity: &'static str,
        field: &'static str,
        message: String,
    },
}

impl DomainError {
    pub fn invalid(
        entity: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        DomainError::Invalid {
            entity,
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
