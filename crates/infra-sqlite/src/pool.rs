// Bounded Connection Pool
//
// Pooling is part of this layer's contract, so the pool is built directly
// on single sqlx connections rather than on the driver's own pool: a
// semaphore bounds open connections, an idle queue recycles them, and
// stale or dead connections are replaced on the way in or out.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, trace};

use studyhub_core::{Result, StoreError};

use crate::config::DbConfig;
use crate::uow::UnitOfWork;

#[derive(Debug)]
struct IdleConn {
    conn: SqliteConnection,
    opened_at: Instant,
}

#[derive(Debug)]
struct PoolInner {
    connect_opts: SqliteConnectOptions,
    max_idle: usize,
    max_lifetime: Duration,
    acquire_timeout: Duration,
    semaphore: Arc<Semaphore>,
    idle: Mutex<VecDeque<IdleConn>>,
}

impl PoolInner {
    fn lock_idle(&self) -> std::sync::MutexGuard<'_, VecDeque<IdleConn>> {
        // A poisoned queue only means a panic elsewhere; the connections
        // themselves are still sound.
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn open(&self) -> Result<SqliteConnection> {
        self.connect_opts
            .clone()
            .connect()
            .await
            .map_err(|e| StoreError::Connection(format!("cannot open connection: {e}")))
    }

    /// Return a connection to the idle queue, or drop it when it aged out
    /// or the queue is full. Synchronous so the guard can call it on drop.
    fn release(&self, conn: SqliteConnection, opened_at: Instant) {
        if opened_at.elapsed() >= self.max_lifetime {
            trace!("closing connection past max lifetime");
            return;
        }
        let mut idle = self.lock_idle();
        if idle.len() >= self.max_idle {
            trace!("idle queue full, closing connection");
            return;
        }
        idle.push_back(IdleConn { conn, opened_at });
    }
}

/// Shared handle to the connection pool. Cloning is cheap.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl Pool {
    /// Open the pool and validate connectivity with one probe connection.
    /// WAL mode and a busy timeout keep concurrent writers from failing
    /// fast; foreign keys are enforced on every connection.
    pub async fn connect(cfg: &DbConfig) -> Result<Self> {
        cfg.validate()?;

        let connect_opts = SqliteConnectOptions::from_str(&cfg.path)
            .map_err(|e| StoreError::Config(format!("bad database path '{}': {e}", cfg.path)))?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true)
            .foreign_keys(true);

        let inner = Arc::new(PoolInner {
            connect_opts,
            max_idle: cfg.max_idle_conns,
            max_lifetime: cfg.conn_max_lifetime,
            acquire_timeout: cfg.acquire_timeout,
            semaphore: Arc::new(Semaphore::new(cfg.max_open_conns)),
            idle: Mutex::new(VecDeque::new()),
        });

        let probe = inner.open().await?;
        inner.lock_idle().push_back(IdleConn {
            conn: probe,
            opened_at: Instant::now(),
        });

        info!(
            path = %cfg.path,
            max_open = cfg.max_open_conns,
            max_idle = cfg.max_idle_conns,
            "database pool initialized"
        );
        Ok(Self { inner })
    }

    /// Acquire a live connection, waiting up to the configured timeout for
    /// a free slot. Idle connections are health-checked before reuse; dead
    /// or stale ones are discarded and replaced transparently.
    pub async fn acquire(&self) -> Result<PooledConn> {
        let started = Instant::now();
        let permit = match tokio::time::timeout(
            self.inner.acquire_timeout,
            self.inner.semaphore.clone().acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(StoreError::Connection("pool is closed".into())),
            Err(_) => {
                return Err(StoreError::PoolExhausted {
                    waited_ms: started.elapsed().as_millis() as u64,
                })
            }
        };

        loop {
            let candidate = self.inner.lock_idle().pop_front();
            match candidate {
                Some(IdleConn {
                    mut conn,
                    opened_at,
                }) => {
                    if opened_at.elapsed() >= self.inner.max_lifetime {
                        trace!("discarding idle connection past max lifetime");
                        continue;
                    }
                    if conn.ping().await.is_err() {
                        debug!("discarding idle connection that failed liveness probe");
                        continue;
                    }
                    return Ok(PooledConn::live(conn, opened_at, self.inner.clone(), permit));
                }
                None => {
                    let conn = self.inner.open().await?;
                    return Ok(PooledConn::live(
                        conn,
                        Instant::now(),
                        self.inner.clone(),
                        permit,
                    ));
                }
            }
        }
    }

    /// Start a unit of work on one acquired connection.
    pub async fn begin(&self) -> Result<UnitOfWork> {
        UnitOfWork::begin(self).await
    }

    /// Close all idle connections. Checked-out connections close when their
    /// guards drop.
    pub async fn close(&self) {
        loop {
            let candidate = self.inner.lock_idle().pop_front();
            match candidate {
                Some(idle) => {
                    let _ = idle.conn.close().await;
                }
                None => break,
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn idle_count(&self) -> usize {
        self.inner.lock_idle().len()
    }
}

/// Checked-out connection. Returns itself to the pool on drop unless marked
/// for discard, in which case the physical connection is closed - which also
/// rolls back any transaction left open on it.
#[derive(Debug)]
pub struct PooledConn {
    conn: Option<SqliteConnection>,
    opened_at: Instant,
    pool: Arc<PoolInner>,
    discard: bool,
    _permit: OwnedSemaphorePermit,
}

impl PooledConn {
    fn live(
        conn: SqliteConnection,
        opened_at: Instant,
        pool: Arc<PoolInner>,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            conn: Some(conn),
            opened_at,
            pool,
            discard: false,
            _permit: permit,
        }
    }

    /// Close the physical connection on release instead of recycling it.
    pub fn discard(&mut self) {
        self.discard = true;
    }
}

impl Deref for PooledConn {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        // Invariant: Some until drop.
        self.conn.as_ref().expect("connection already released")
    }
}

impl DerefMut for PooledConn {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("connection already released")
    }
}

impl Drop for PooledConn {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if self.discard {
                trace!("closing discarded connection");
                // Dropping the handle closes the connection in the driver.
            } else {
                self.pool.release(conn, self.opened_at);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::temp_db;

    #[tokio::test]
    async fn acquire_recycles_idle_connection() {
        let cfg = DbConfig::for_path(temp_db("pool_recycle"));
        let pool = Pool::connect(&cfg).await.unwrap();
        assert_eq!(pool.idle_count(), 1);

        let conn = pool.acquire().await.unwrap();
        assert_eq!(pool.idle_count(), 0);
        drop(conn);
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn exhausted_pool_times_out() {
        let cfg = DbConfig {
            max_open_conns: 1,
            max_idle_conns: 1,
            acquire_timeout: Duration::from_millis(50),
            ..DbConfig::for_path(temp_db("pool_exhausted"))
        };
        let pool = Pool::connect(&cfg).await.unwrap();

        let held = pool.acquire().await.unwrap();
        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, StoreError::PoolExhausted { .. }));

        drop(held);
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn discarded_connection_is_not_recycled() {
        let cfg = DbConfig::for_path(temp_db("pool_discard"));
        let pool = Pool::connect(&cfg).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        conn.discard();
        drop(conn);
        assert_eq!(pool.idle_count(), 0);

        // The pool opens a fresh connection transparently.
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn stale_connection_replaced_on_release() {
        let cfg = DbConfig {
            conn_max_lifetime: Duration::from_millis(0),
            ..DbConfig::for_path(temp_db("pool_stale"))
        };
        let pool = Pool::connect(&cfg).await.unwrap();

        let conn = pool.acquire().await.unwrap();
        drop(conn);
        // Lifetime of zero means nothing is ever recycled.
        assert_eq!(pool.idle_count(), 0);
    }
}
