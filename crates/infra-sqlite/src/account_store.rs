// SQLite implementation of the AccountStore port, layered on the generic
// repository. Single-row operations run on a plain pooled connection; bulk
// inserts run inside one unit of work so a failing batch leaves nothing
// behind.

use std::sync::Arc;

use async_trait::async_trait;

use studyhub_core::domain::Account;
use studyhub_core::port::{AccountStore, Clock, DuplicatePolicy, ImportReport};
use studyhub_core::schema::SchemaRegistry;
use studyhub_core::Result;

use crate::pool::Pool;
use crate::repository::Repository;

pub struct SqliteAccountStore {
    pool: Pool,
    repo: Repository<Account>,
}

impl SqliteAccountStore {
    pub fn new(pool: Pool, registry: Arc<SchemaRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            repo: Repository::new(registry, clock),
        }
    }
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn insert(&self, account: &mut Account) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        self.repo.create(&mut conn, account).await
    }

    async fn insert_many(
        &self,
        accounts: Vec<Account>,
        policy: DuplicatePolicy,
    ) -> Result<ImportReport> {
        let mut accounts = accounts;
        let mut uow = self.pool.begin().await?;
        let report = self
            .repo
            .create_many(
                uow.conn().await?,
                &mut accounts,
                policy == DuplicatePolicy::Skip,
            )
            .await?;
        uow.commit().await?;
        Ok(ImportReport {
            attempted: report.attempted,
            inserted: report.inserted,
            skipped: report.skipped,
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Account> {
        let mut conn = self.pool.acquire().await?;
        self.repo.find_by_id(&mut conn, id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let mut conn = self.pool.acquire().await?;
        self.repo.find_by_unique(&mut conn, "email", email).await
    }

    async fn update(&self, account: &mut Account) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        self.repo.update(&mut conn, account).await
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Account>> {
        let mut conn = self.pool.acquire().await?;
        self.repo.find_page(&mut conn, offset, limit, None).await
    }

    async fn search(&self, pattern: &str, offset: i64, limit: i64) -> Result<Vec<Account>> {
        let mut conn = self.pool.acquire().await?;
        self.repo.search(&mut conn, pattern, offset, limit).await
    }

    async fn count(&self) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        self.repo.count(&mut conn).await
    }
}
