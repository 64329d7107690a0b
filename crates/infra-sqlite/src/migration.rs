// Schema migration driven by the registry: tables are created in
// dependency order from the generated DDL. Statements are idempotent
// (IF NOT EXISTS), so running against an already-migrated database is a
// no-op. Foreign key enforcement is suspended for the duration of the
// structural changes and restored afterwards.

use sqlx::SqliteConnection;
use tracing::{info, instrument};

use studyhub_core::schema::SchemaRegistry;
use studyhub_core::Result;

use crate::error::map_sqlx_error;

async fn exec(conn: &mut SqliteConnection, entity: &'static str, sql: &str) -> Result<()> {
    sqlx::query(sql)
        .execute(conn)
        .await
        .map_err(|e| map_sqlx_error(entity, e))?;
    Ok(())
}

/// Create every registered table and index, parents before children.
#[instrument(skip_all)]
pub async fn run_migrations(conn: &mut SqliteConnection, registry: &SchemaRegistry) -> Result<()> {
    exec(conn, "schema", "PRAGMA foreign_keys = OFF").await?;
    let mut created = 0usize;
    for def in registry.migration_order()? {
        exec(conn, def.entity, &registry.table_ddl(def.entity)?).await?;
        for index in registry.index_ddl(def.entity)? {
            exec(conn, def.entity, &index).await?;
        }
        created += 1;
    }
    exec(conn, "schema", "PRAGMA foreign_keys = ON").await?;
    info!(tables = created, "migrations applied");
    Ok(())
}

/// Drop every registered table, children before parents.
#[instrument(skip_all)]
pub async fn drop_all(conn: &mut SqliteConnection, registry: &SchemaRegistry) -> Result<()> {
    exec(conn, "schema", "PRAGMA foreign_keys = OFF").await?;
    for def in registry.migration_order()?.into_iter().rev() {
        exec(conn, def.entity, &format!("DROP TABLE IF EXISTS {}", def.table)).await?;
    }
    exec(conn, "schema", "PRAGMA foreign_keys = ON").await?;
    info!("all tables dropped");
    Ok(())
}

/// Drop and recreate the whole schema. Intended for tests and local
/// development, never for production data.
pub async fn reset(conn: &mut SqliteConnection, registry: &SchemaRegistry) -> Result<()> {
    drop_all(&mut *conn, registry).await?;
    run_migrations(conn, registry).await
}

/// Presence of each registered table, in migration order.
pub async fn check_status(
    conn: &mut SqliteConnection,
    registry: &SchemaRegistry,
) -> Result<Vec<(String, bool)>> {
    let mut out = Vec::new();
    for def in registry.migration_order()? {
        let found: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(def.table)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error(def.entity, e))?;
        out.push((def.table.to_owned(), found > 0));
    }
    Ok(out)
}
