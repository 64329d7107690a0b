//! Shared setup for the integration suites: a throwaway on-disk database
//! (`:memory:` is per-connection and useless behind a pool), the default
//! schema registry and a deterministic clock whose readings are strictly
//! increasing.

#![allow(dead_code)]

use std::sync::Arc;

use studyhub_core::domain::Account;
use studyhub_core::port::FixedClock;
use studyhub_core::schema::{default_registry, SchemaRegistry};
use studyhub_infra_sqlite::{run_migrations, DbConfig, Persist, Pool, Repository};

pub const EPOCH: i64 = 1_700_000_000_000;

pub fn db_path(tag: &str) -> String {
    let path = std::env::temp_dir().join(format!(
        "studyhub_it_{}_{}.db",
        tag,
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    path.to_string_lossy().into_owned()
}

pub struct TestDb {
    pub pool: Pool,
    pub registry: Arc<SchemaRegistry>,
    pub clock: Arc<FixedClock>,
}

impl TestDb {
    pub fn repo<T: Persist>(&self) -> Repository<T> {
        Repository::new(self.registry.clone(), self.clock.clone())
    }
}

pub async fn setup(tag: &str) -> TestDb {
    setup_with(DbConfig::for_path(db_path(tag))).await
}

pub async fn setup_with(cfg: DbConfig) -> TestDb {
    init_tracing();
    let pool = Pool::connect(&cfg).await.expect("pool");
    let registry = Arc::new(default_registry().expect("registry"));

    let mut conn = pool.acquire().await.expect("connection");
    run_migrations(&mut conn, &registry).await.expect("migrations");
    drop(conn);

    TestDb {
        pool,
        registry,
        clock: Arc::new(FixedClock::starting_at(EPOCH)),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn account(n: usize) -> Account {
    Account::new(
        format!("user{n}"),
        format!("user{n}@example.com"),
        "hash-0123456789",
        20 + n as i64,
    )
}
