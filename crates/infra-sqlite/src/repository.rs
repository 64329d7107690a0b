// Generic repository: CRUD, pagination, search and counting for any
// registered entity. SQL is assembled from the schema registry, parameter
// binding is delegated to the entity's Persist impl, and every operation
// runs on a caller-supplied connection so the same code path works on a
// plain pooled connection or inside a unit of work.

use std::marker::PhantomData;
use std::sync::Arc;

use sqlx::SqliteConnection;
use tracing::{debug, instrument, warn};

use studyhub_core::domain::EntityId;
use studyhub_core::port::Clock;
use studyhub_core::schema::{EntityDef, SchemaRegistry};
use studyhub_core::{Result, StoreError};

use crate::error::map_sqlx_error;
use crate::loader::Load;
use crate::model::Persist;

/// Outcome of a bulk insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub attempted: usize,
    pub inserted: usize,
    pub skipped: usize,
}

/// Sort direction for a caller-supplied page ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// A dynamically typed filter value for `count_by`.
#[derive(Debug, Clone)]
pub enum Arg {
    Int(i64),
    Real(f64),
    Text(String),
    Bool(bool),
}

impl From<i64> for Arg {
    fn from(v: i64) -> Self {
        Arg::Int(v)
    }
}

impl From<f64> for Arg {
    fn from(v: f64) -> Self {
        Arg::Real(v)
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Text(v.to_owned())
    }
}

impl From<String> for Arg {
    fn from(v: String) -> Self {
        Arg::Text(v)
    }
}

impl From<bool> for Arg {
    fn from(v: bool) -> Self {
        Arg::Bool(v)
    }
}

/// Escape `%`, `_` and the escape character itself for a LIKE pattern.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

pub struct Repository<T: Persist> {
    registry: Arc<SchemaRegistry>,
    clock: Arc<dyn Clock>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Persist> Repository<T> {
    pub fn new(registry: Arc<SchemaRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry,
            clock,
            _entity: PhantomData,
        }
    }

    fn def(&self) -> Result<&EntityDef> {
        self.registry.get(T::ENTITY)
    }

    fn alive(def: &EntityDef) -> &'static str {
        if def.soft_delete {
            " AND deleted_at IS NULL"
        } else {
            ""
        }
    }

    /// Run validation and defaulting hooks, insert the row and write the
    /// assigned key back into the entity.
    #[instrument(skip_all, fields(entity = T::ENTITY))]
    pub async fn create(&self, conn: &mut SqliteConnection, entity: &mut T) -> Result<()> {
        let def = self.def()?;
        entity.before_create(self.clock.now_millis())?;

        let sql = def.insert_sql();
        let result = entity
            .bind_insert(sqlx::query(&sql))
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error(T::ENTITY, e))?;

        entity.set_id(result.last_insert_rowid());
        debug!(id = entity.id(), "created");
        Ok(())
    }

    /// Insert a batch. `skip_duplicates` turns unique-constraint failures
    /// into skips instead of aborting; every other error still aborts.
    #[instrument(skip_all, fields(entity = T::ENTITY, count = entities.len()))]
    pub async fn create_many(
        &self,
        conn: &mut SqliteConnection,
        entities: &mut [T],
        skip_duplicates: bool,
    ) -> Result<BulkReport> {
        let mut report = BulkReport {
            attempted: entities.len(),
            ..BulkReport::default()
        };
        for entity in entities.iter_mut() {
            match self.create(&mut *conn, entity).await {
                Ok(()) => report.inserted += 1,
                Err(StoreError::UniqueViolation { constraint, .. }) if skip_duplicates => {
                    warn!(%constraint, "skipping duplicate row");
                    report.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Fetch one live row by primary key.
    pub async fn find_by_id(&self, conn: &mut SqliteConnection, id: EntityId) -> Result<T> {
        let def = self.def()?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?{}",
            def.select_list(),
            def.table,
            def.primary_key,
            Self::alive(def)
        );
        let row: Option<T::Row> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(|e| map_sqlx_error(T::ENTITY, e))?;
        row.map(T::from_row).ok_or_else(|| StoreError::NotFound {
            entity: T::ENTITY,
            key: id.to_string(),
        })
    }

    /// Fetch by primary key, soft-deleted rows included.
    pub async fn find_by_id_any(&self, conn: &mut SqliteConnection, id: EntityId) -> Result<T> {
        let def = self.def()?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?",
            def.select_list(),
            def.table,
            def.primary_key
        );
        let row: Option<T::Row> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(|e| map_sqlx_error(T::ENTITY, e))?;
        row.map(T::from_row).ok_or_else(|| StoreError::NotFound {
            entity: T::ENTITY,
            key: id.to_string(),
        })
    }

    /// Look up one live row by a unique text column. Naming a column the
    /// entity does not declare is a configuration error.
    pub async fn find_by_unique(
        &self,
        conn: &mut SqliteConnection,
        column: &str,
        value: &str,
    ) -> Result<Option<T>> {
        let def = self.def()?;
        if !def.has_column(column) {
            return Err(StoreError::Config(format!(
                "entity '{}' has no column '{column}'",
                T::ENTITY
            )));
        }
        let sql = format!(
            "SELECT {} FROM {} WHERE {column} = ?{}",
            def.select_list(),
            def.table,
            Self::alive(def)
        );
        let row: Option<T::Row> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(conn)
            .await
            .map_err(|e| map_sqlx_error(T::ENTITY, e))?;
        Ok(row.map(T::from_row))
    }

    /// Full-row save. Updating a missing or soft-deleted row is an error,
    /// never a silent no-op.
    #[instrument(skip_all, fields(entity = T::ENTITY, id = entity.id()))]
    pub async fn update(&self, conn: &mut SqliteConnection, entity: &mut T) -> Result<()> {
        let def = self.def()?;
        entity.before_update(self.clock.now_millis())?;

        let sql = def.update_sql();
        let result = entity
            .bind_update(sqlx::query(&sql))
            .execute(conn)
            .await
            .map_err(|e| map_sqlx_error(T::ENTITY, e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: T::ENTITY,
                key: entity.id().to_string(),
            });
        }
        Ok(())
    }

    /// Mark a live row deleted. The row stays queryable via `find_by_id_any`
    /// and can be brought back with `restore`.
    #[instrument(skip_all, fields(entity = T::ENTITY, id))]
    pub async fn soft_delete(&self, conn: &mut SqliteConnection, id: EntityId) -> Result<()> {
        let def = self.def()?;
        let now = self.clock.now_millis();
        let sql = format!(
            "UPDATE {} SET deleted_at = ?, updated_at = ? WHERE {} = ? AND deleted_at IS NULL",
            def.table, def.primary_key
        );
        let result = sqlx::query(&sql)
            .bind(now)
            .bind(now)
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| map_sqlx_error(T::ENTITY, e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: T::ENTITY,
                key: id.to_string(),
            });
        }
        Ok(())
    }

    /// Undo a soft delete.
    #[instrument(skip_all, fields(entity = T::ENTITY, id))]
    pub async fn restore(&self, conn: &mut SqliteConnection, id: EntityId) -> Result<()> {
        let def = self.def()?;
        let sql = format!(
            "UPDATE {} SET deleted_at = NULL, updated_at = ? WHERE {} = ? AND deleted_at IS NOT NULL",
            def.table, def.primary_key
        );
        let result = sqlx::query(&sql)
            .bind(self.clock.now_millis())
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| map_sqlx_error(T::ENTITY, e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: T::ENTITY,
                key: id.to_string(),
            });
        }
        Ok(())
    }

    /// Physically remove a row. Foreign keys fire here: restricted
    /// references surface as a foreign-key violation, cascades take the
    /// children with them.
    #[instrument(skip_all, fields(entity = T::ENTITY, id))]
    pub async fn hard_delete(&self, conn: &mut SqliteConnection, id: EntityId) -> Result<()> {
        let def = self.def()?;
        let sql = format!("DELETE FROM {} WHERE {} = ?", def.table, def.primary_key);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| map_sqlx_error(T::ENTITY, e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: T::ENTITY,
                key: id.to_string(),
            });
        }
        Ok(())
    }

    /// One page of live rows. `order_by` names a declared column and a
    /// direction; `None` falls back to the entity's stable order (newest
    /// first). Either way the primary key breaks ties, so consecutive
    /// pages never overlap or skip rows.
    pub async fn find_page(
        &self,
        conn: &mut SqliteConnection,
        offset: i64,
        limit: i64,
        order_by: Option<(&str, Direction)>,
    ) -> Result<Vec<T>> {
        let def = self.def()?;
        let order = match order_by {
            Some((column, direction)) => {
                if !def.has_column(column) {
                    return Err(StoreError::Config(format!(
                        "entity '{}' has no column '{column}'",
                        T::ENTITY
                    )));
                }
                format!("{column} {}, {} DESC", direction.sql(), def.primary_key)
            }
            None => def.stable_order(),
        };
        let sql = format!(
            "SELECT {} FROM {} WHERE 1 = 1{} ORDER BY {order} LIMIT ? OFFSET ?",
            def.select_list(),
            def.table,
            Self::alive(def)
        );
        let rows: Vec<T::Row> = sqlx::query_as(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(conn)
            .await
            .map_err(|e| map_sqlx_error(T::ENTITY, e))?;
        Ok(rows.into_iter().map(T::from_row).collect())
    }

    /// Case-insensitive substring search over the entity's registered
    /// search columns. LIKE metacharacters in the needle are escaped, so
    /// `50%` finds the literal text. An entity with no search columns
    /// matches nothing.
    pub async fn search(
        &self,
        conn: &mut SqliteConnection,
        needle: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<T>> {
        let def = self.def()?;
        if def.search_columns.is_empty() {
            debug!(entity = T::ENTITY, "search on entity without search columns");
            return Ok(Vec::new());
        }

        let clauses: Vec<String> = def
            .search_columns
            .iter()
            .map(|col| format!("{col} LIKE ? ESCAPE '\\'"))
            .collect();
        let sql = format!(
            "SELECT {} FROM {} WHERE ({}){} ORDER BY {} LIMIT ? OFFSET ?",
            def.select_list(),
            def.table,
            clauses.join(" OR "),
            Self::alive(def),
            def.stable_order()
        );

        let pattern = format!("%{}%", escape_like(needle));
        let mut query = sqlx::query_as(&sql);
        for _ in &def.search_columns {
            query = query.bind(pattern.clone());
        }
        let rows: Vec<T::Row> = query
            .bind(limit)
            .bind(offset)
            .fetch_all(conn)
            .await
            .map_err(|e| map_sqlx_error(T::ENTITY, e))?;
        Ok(rows.into_iter().map(T::from_row).collect())
    }

    /// Number of live rows.
    pub async fn count(&self, conn: &mut SqliteConnection) -> Result<i64> {
        let def = self.def()?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE 1 = 1{}",
            def.table,
            Self::alive(def)
        );
        sqlx::query_scalar(&sql)
            .fetch_one(conn)
            .await
            .map_err(|e| map_sqlx_error(T::ENTITY, e))
    }

    /// Number of live rows where `column = value`.
    pub async fn count_by(
        &self,
        conn: &mut SqliteConnection,
        column: &str,
        value: Arg,
    ) -> Result<i64> {
        let def = self.def()?;
        if !def.has_column(column) {
            return Err(StoreError::Config(format!(
                "entity '{}' has no column '{column}'",
                T::ENTITY
            )));
        }
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {column} = ?{}",
            def.table,
            Self::alive(def)
        );
        let query = sqlx::query_scalar(&sql);
        let query = match &value {
            Arg::Int(v) => query.bind(*v),
            Arg::Real(v) => query.bind(*v),
            Arg::Text(v) => query.bind(v.as_str()),
            Arg::Bool(v) => query.bind(*v),
        };
        query
            .fetch_one(conn)
            .await
            .map_err(|e| map_sqlx_error(T::ENTITY, e))
    }
}

impl<T: Load> Repository<T> {
    /// `find_by_id` plus eager loading of the named relation paths.
    pub async fn find_with(
        &self,
        conn: &mut SqliteConnection,
        id: EntityId,
        paths: &[&str],
    ) -> Result<T> {
        let mut items = vec![self.find_by_id(&mut *conn, id).await?];
        for path in paths {
            T::load_relation(&mut *conn, &self.registry, &mut items, path).await?;
        }
        Ok(items.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\now"), "50\\%\\_off\\\\now");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn arg_conversions() {
        assert!(matches!(Arg::from(3i64), Arg::Int(3)));
        assert!(matches!(Arg::from("x"), Arg::Text(_)));
        assert!(matches!(Arg::from(true), Arg::Bool(true)));
    }
}
