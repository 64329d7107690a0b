// Unit of Work - one transaction bound to one pooled connection.
//
// Nested scopes are savepoints on the same connection, named from a
// monotonic counter. Rolling back a scope only returns to its savepoint;
// the parent stays committable. A scope dropped without an explicit
// commit/rollback is rolled back lazily, before the next statement runs on
// the unit of work.

use sqlx::SqliteConnection;
use tracing::{debug, trace};

use studyhub_core::{Result, StoreError};

use crate::pool::{Pool, PooledConn};

async fn tx_exec(conn: &mut SqliteConnection, sql: &str) -> Result<()> {
    sqlx::query(sql)
        .execute(conn)
        .await
        .map_err(|e| StoreError::TransactionAborted(format!("{sql}: {e}")))?;
    Ok(())
}

async fn rollback_savepoint(conn: &mut SqliteConnection, name: &str) -> Result<()> {
    // ROLLBACK TO keeps the savepoint on the stack; RELEASE pops it.
    tx_exec(conn, &format!("ROLLBACK TO SAVEPOINT {name}")).await?;
    tx_exec(conn, &format!("RELEASE SAVEPOINT {name}")).await
}

/// An open transaction. Dropping it without `commit` discards the
/// underlying connection, which rolls the transaction back - canceled work
/// can never commit partially.
pub struct UnitOfWork {
    conn: Option<PooledConn>,
    next_savepoint: u32,
    deferred: Vec<String>,
    done: bool,
}

impl UnitOfWork {
    pub(crate) async fn begin(pool: &Pool) -> Result<Self> {
        let mut conn = pool.acquire().await?;
        // IMMEDIATE takes the write lock up front instead of failing on a
        // later lock upgrade.
        tx_exec(&mut conn, "BEGIN IMMEDIATE").await?;
        trace!("transaction started");
        Ok(Self {
            conn: Some(conn),
            next_savepoint: 0,
            deferred: Vec::new(),
            done: false,
        })
    }

    fn conn_raw(&mut self) -> &mut SqliteConnection {
        // Invariant: Some until commit/rollback consume self or drop runs.
        self.conn.as_mut().expect("unit of work already finished")
    }

    async fn flush_deferred(&mut self) -> Result<()> {
        if self.deferred.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.deferred);
        for name in pending {
            debug!(savepoint = %name, "rolling back abandoned scope");
            rollback_savepoint(self.conn_raw(), &name).await?;
        }
        Ok(())
    }

    /// The transaction's connection, for repository calls. All operations
    /// of this unit of work, nested scopes included, run here.
    pub async fn conn(&mut self) -> Result<&mut SqliteConnection> {
        self.flush_deferred().await?;
        Ok(self.conn_raw())
    }

    /// Open a nested scope backed by a savepoint.
    pub async fn savepoint(&mut self) -> Result<Scope<'_>> {
        self.flush_deferred().await?;
        self.next_savepoint += 1;
        let name = format!("sp_{}", self.next_savepoint);
        tx_exec(self.conn_raw(), &format!("SAVEPOINT {name}")).await?;
        trace!(savepoint = %name, "scope opened");
        Ok(Scope {
            uow: self,
            name,
            resolved: false,
        })
    }

    /// Make all work of this unit durable and release the connection.
    pub async fn commit(mut self) -> Result<()> {
        self.flush_deferred().await?;
        tx_exec(self.conn_raw(), "COMMIT").await?;
        self.done = true;
        trace!("transaction committed");
        Ok(())
    }

    /// Discard all work of this unit and release the connection.
    pub async fn rollback(mut self) -> Result<()> {
        // Deferred savepoint rollbacks are subsumed by the full rollback.
        self.deferred.clear();
        tx_exec(self.conn_raw(), "ROLLBACK").await?;
        self.done = true;
        trace!("transaction rolled back");
        Ok(())
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if !self.done {
            if let Some(mut conn) = self.conn.take() {
                debug!("unit of work dropped while active; discarding its connection");
                conn.discard();
            }
        }
    }
}

/// A nested transaction scope. Rolling back (explicitly or by dropping the
/// scope unresolved) undoes only the work since this savepoint and never
/// marks the parent as failed.
pub struct Scope<'u> {
    uow: &'u mut UnitOfWork,
    name: String,
    resolved: bool,
}

impl Scope<'_> {
    /// The shared transaction connection (connection affinity holds across
    /// nesting levels).
    pub async fn conn(&mut self) -> Result<&mut SqliteConnection> {
        self.uow.conn().await
    }

    /// Nest one level deeper.
    pub async fn savepoint(&mut self) -> Result<Scope<'_>> {
        self.uow.savepoint().await
    }

    /// Fold this scope's work into the parent.
    pub async fn commit(mut self) -> Result<()> {
        self.uow.flush_deferred().await?;
        tx_exec(
            self.uow.conn_raw(),
            &format!("RELEASE SAVEPOINT {}", self.name),
        )
        .await?;
        self.resolved = true;
        Ok(())
    }

    /// Undo this scope's work only.
    pub async fn rollback(mut self) -> Result<()> {
        self.uow.flush_deferred().await?;
        rollback_savepoint(self.uow.conn_raw(), &self.name).await?;
        self.resolved = true;
        Ok(())
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            self.uow.deferred.push(std::mem::take(&mut self.name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbConfig;
    use crate::testutil::temp_db;

    async fn pool_with_table(tag: &str) -> Pool {
        let pool = Pool::connect(&DbConfig::for_path(temp_db(tag))).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        sqlx::query("CREATE TABLE t (x INTEGER)")
            .execute(&mut *conn)
            .await
            .unwrap();
        pool
    }

    async fn count(pool: &Pool) -> i64 {
        let mut conn = pool.acquire().await.unwrap();
        sqlx::query_scalar("SELECT COUNT(*) FROM t")
            .fetch_one(&mut *conn)
            .await
            .unwrap()
    }

    async fn insert(conn: &mut SqliteConnection, x: i64) {
        sqlx::query("INSERT INTO t (x) VALUES (?)")
            .bind(x)
            .execute(conn)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn nested_rollback_keeps_outer_writes() {
        let pool = pool_with_table("uow_nested").await;

        let mut uow = pool.begin().await.unwrap();
        insert(uow.conn().await.unwrap(), 1).await;

        let mut scope = uow.savepoint().await.unwrap();
        insert(scope.conn().await.unwrap(), 2).await;
        scope.rollback().await.unwrap();

        insert(uow.conn().await.unwrap(), 3).await;
        uow.commit().await.unwrap();

        assert_eq!(count(&pool).await, 2);
    }

    #[tokio::test]
    async fn dropped_scope_rolls_back_lazily() {
        let pool = pool_with_table("uow_dropped_scope").await;

        let mut uow = pool.begin().await.unwrap();
        {
            let mut scope = uow.savepoint().await.unwrap();
            insert(scope.conn().await.unwrap(), 1).await;
            // No commit: dropping must roll the scope back.
        }
        insert(uow.conn().await.unwrap(), 2).await;
        uow.commit().await.unwrap();

        assert_eq!(count(&pool).await, 1);
    }

    #[tokio::test]
    async fn dropped_unit_of_work_commits_nothing() {
        let pool = pool_with_table("uow_dropped").await;

        {
            let mut uow = pool.begin().await.unwrap();
            insert(uow.conn().await.unwrap(), 1).await;
        }

        assert_eq!(count(&pool).await, 0);
    }

    #[tokio::test]
    async fn reentrant_nesting_two_levels() {
        let pool = pool_with_table("uow_two_levels").await;

        let mut uow = pool.begin().await.unwrap();
        insert(uow.conn().await.unwrap(), 1).await;

        let mut outer = uow.savepoint().await.unwrap();
        insert(outer.conn().await.unwrap(), 2).await;

        let mut inner = outer.savepoint().await.unwrap();
        insert(inner.conn().await.unwrap(), 3).await;
        inner.rollback().await.unwrap();

        outer.commit().await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(count(&pool).await, 2);
    }
}
