// Account Use Cases
//
// Service-level rules live here, above the entity-level hooks: the entity
// accepts any age >= 0 (imports of legacy data), while registration is
// stricter.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{Account, DomainError};
use crate::error::{Result, StoreError};
use crate::port::{AccountStore, DuplicatePolicy, ImportReport};

pub const MIN_REGISTRATION_AGE: i64 = 1;
pub const MAX_REGISTRATION_AGE: i64 = 150;
pub const MIN_CREDENTIAL_LEN: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub age: i64,
}

pub struct AccountService {
    store: Arc<dyn AccountStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Register a new account. Duplicate emails are rejected up front with
    /// the same error kind the storage boundary would raise, so callers see
    /// one failure mode regardless of which layer catches it first.
    pub async fn register(&self, reg: Registration) -> Result<Account> {
        validate_registration(&reg)?;

        if self.store.find_by_email(&reg.email).await?.is_some() {
            return Err(StoreError::UniqueViolation {
                entity: "account",
                constraint: "accounts.email".into(),
                detail: format!("email '{}' already registered", reg.email),
            });
        }

        let mut account = Account::new(reg.username, reg.email, reg.password_hash, reg.age);
        self.store.insert(&mut account).await?;
        info!(account_id = account.id, username = %account.username, "account registered");
        Ok(account)
    }

    /// Deactivate an account without deleting it.
    pub async fn deactivate(&self, id: i64) -> Result<Account> {
        let mut account = self.store.find_by_id(id).await?;
        account.is_active = false;
        self.store.update(&mut account).await?;
        Ok(account)
    }

    /// Bulk import from a JSON array of accounts. Skipping duplicates is an
    /// explicit opt-in; the report always separates attempted from inserted.
    pub async fn import(&self, data: &[u8], skip_duplicates: bool) -> Result<ImportReport> {
        let accounts: Vec<Account> = serde_json::from_slice(data)?;
        let policy = if skip_duplicates {
            DuplicatePolicy::Skip
        } else {
            DuplicatePolicy::Fail
        };
        let report = self.store.insert_many(accounts, policy).await?;
        info!(
            attempted = report.attempted,
            inserted = report.inserted,
            skipped = report.skipped,
            "account import finished"
        );
        Ok(report)
    }

    /// Export every live account as a JSON array.
    pub async fn export(&self) -> Result<Vec<u8>> {
        let accounts = self.store.list(0, i64::MAX).await?;
        Ok(serde_json::to_vec(&accounts)?)
    }

    pub async fn search(&self, pattern: &str, offset: i64, limit: i64) -> Result<Vec<Account>> {
        self.store.search(pattern, offset, limit).await
    }
}

fn validate_registration(reg: &Registration) -> Result<()> {
    if !(MIN_REGISTRATION_AGE..=MAX_REGISTRATION_AGE).contains(&reg.age) {
        return Err(DomainError::invalid(
            "account",
            "age",
            format!(
                "must be within [{MIN_REGISTRATION_AGE},{MAX_REGISTRATION_AGE}], got {}",
                reg.age
            ),
        )
        .into());
    }
    if reg.password_hash.len() < MIN_CREDENTIAL_LEN {
        return Err(DomainError::invalid(
            "account",
            "password_hash",
            format!("must be at least {MIN_CREDENTIAL_LEN} characters"),
        )
        .into());
    }
    Ok(())
}
