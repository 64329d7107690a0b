// Account Entity

use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result};
use super::{Course, EntityId, Millis, Post, Profile};

/// Age assigned when none is provided (mirrors the storage default).
pub const DEFAULT_AGE: i64 = 18;

/// A user account. Owns zero-or-one [`Profile`], many [`Post`]s and
/// participates in course enrollment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub id: EntityId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub password_hash: String,
    #[serde(default)]
    pub age: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Millis,
    #[serde(default)]
    pub updated_at: Millis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Millis>,

    // Relations, populated only by the association loader
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub posts: Vec<Post>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub courses: Vec<Course>,
}

fn default_true() -> bool {
    true
}

impl Account {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        age: i64,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            age,
            is_active: true,
            ..Default::default()
        }
    }

    /// Before-save defaulting: a zero age falls back to [`DEFAULT_AGE`].
    pub fn apply_defaults(&mut self) {
        if self.age == 0 {
            self.age = DEFAULT_AGE;
        }
    }

    /// Entity-level validation, run by the repository before issuing SQL.
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(DomainError::invalid("account", "username", "must not be empty"));
        }
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err(DomainError::invalid("account", "email", "malformed address"));
        }
        if self.age < 0 {
            return Err(DomainError::invalid(
                "account",
                "age",
                format!("must be >= 0, got {}", self.age),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_age_defaults() {
        let mut acc = Account::new("alice", "alice@example.com", "secret-hash", 0);
        acc.apply_defaults();
        assert_eq!(acc.age, DEFAULT_AGE);
        assert!(acc.validate().is_ok());
    }

    #[test]
    fn negative_age_rejected() {
        let acc = Account::new("bob", "bob@example.com", "secret-hash", -1);
        assert!(acc.validate().is_err());
    }

    #[test]
    fn malformed_email_rejected() {
        let acc = Account::new("bob", "not-an-address", "secret-hash", 30);
        assert!(acc.validate().is_err());
    }
}
