// Account Store Port (Interface)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::Account;
use crate::error::Result;

/// How bulk inserts treat unique-constraint violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Abort the whole batch on the first duplicate (default).
    #[default]
    Fail,
    /// Log and skip duplicate rows, keeping the rest of the batch.
    Skip,
}

/// Outcome of a bulk insert: `attempted` always counts the full input so
/// callers can tell silent skips from successes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub attempted: usize,
    pub inserted: usize,
    pub skipped: usize,
}

/// Storage interface for Account persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account, assigning its id and timestamps.
    async fn insert(&self, account: &mut Account) -> Result<()>;

    /// Insert a batch atomically (modulo the duplicate policy).
    async fn insert_many(
        &self,
        accounts: Vec<Account>,
        policy: DuplicatePolicy,
    ) -> Result<ImportReport>;

    /// Fetch by id, excluding soft-deleted rows.
    async fn find_by_id(&self, id: i64) -> Result<Account>;

    /// Fetch by unique email; `None` when absent.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Full-row save.
    async fn update(&self, account: &mut Account) -> Result<()>;

    /// Stable-ordered page (creation time descending).
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Account>>;

    /// Case-insensitive substring search over username and email.
    async fn search(&self, pattern: &str, offset: i64, limit: i64) -> Result<Vec<Account>>;

    /// Count live (non-deleted) accounts.
    async fn count(&self) -> Result<i64>;
}
