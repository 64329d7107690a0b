// StudyHub Infrastructure - SQLite Adapter
// Implements the persistence layer on top of sqlx's SQLite driver:
// connection pool, unit of work with savepoints, generic repository,
// association loader and schema migration.

mod account_store;
mod config;
mod error;
mod loader;
mod migration;
mod model;
mod pool;
mod repository;
#[cfg(test)]
mod testutil;
mod uow;

pub use account_store::SqliteAccountStore;
pub use config::DbConfig;
pub use error::map_sqlx_error;
pub use loader::Load;
pub use migration::{check_status, drop_all, reset, run_migrations};
pub use model::Persist;
pub use pool::{Pool, PooledConn};
pub use repository::{Arg, BulkReport, Direction, Repository};
pub use uow::{Scope, UnitOfWork};

// Note: sqlx::Error -> StoreError conversion lives in error.rs helpers;
// orphan rules keep it out of studyhub-core.
