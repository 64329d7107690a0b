// Profile Entity (one-to-one with Account)

use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result};
use super::{EntityId, Millis};

/// Per-account profile. The unique `account_id` foreign key is what
/// enforces the one-to-one shape at the storage boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: EntityId,
    pub account_id: EntityId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub created_at: Millis,
    #[serde(default)]
    pub updated_at: Millis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Millis>,
}

impl Profile {
    pub fn new(
        account_id: EntityId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            account_id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Default::default()
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.account_id <= 0 {
            return Err(DomainError::invalid("profile", "account_id", "must reference an account"));
        }
        if self.first_name.trim().is_empty() {
            return Err(DomainError::invalid("profile", "first_name", "must not be empty"));
        }
        if self.last_name.trim().is_empty() {
            return Err(DomainError::invalid("profile", "last_name", "must not be empty"));
        }
        Ok(())
    }
}
