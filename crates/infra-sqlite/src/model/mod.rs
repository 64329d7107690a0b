// Row mapping between domain entities and their tables.
//
// Domain types live in studyhub-core and cannot implement sqlx traits, so
// each entity pairs with a `Row` struct here that derives `FromRow` and
// converts back into the domain type. Parameter binding order follows the
// column order declared in the schema catalog.

mod account;
mod comment;
mod course;
mod post;
mod profile;

use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::Sqlite;

use studyhub_core::domain::{EntityId, Millis};
use studyhub_core::Result;

pub type SqlQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Everything the generic repository and the association loader need to
/// move one entity type through SQLite.
pub trait Persist: Sized + Send + Sync + Unpin {
    /// Name under which the entity is registered in the schema registry.
    const ENTITY: &'static str;

    /// The `FromRow` representation of one table row.
    type Row: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin;

    fn from_row(row: Self::Row) -> Self;

    fn id(&self) -> EntityId;
    fn set_id(&mut self, id: EntityId);
    fn deleted_at(&self) -> Option<Millis>;
    fn set_deleted_at(&mut self, at: Option<Millis>);

    /// Defaulting, validation and timestamp stamping before INSERT.
    fn before_create(&mut self, now: Millis) -> Result<()>;

    /// Defaulting, validation and `updated_at` stamping before UPDATE.
    fn before_update(&mut self, now: Millis) -> Result<()>;

    /// Bind insert parameters in catalog column order (primary key skipped).
    fn bind_insert<'q>(&'q self, query: SqlQuery<'q>) -> SqlQuery<'q>;

    /// Bind update parameters in catalog column order (primary key and
    /// `created_at` skipped), followed by the key for the WHERE clause.
    fn bind_update<'q>(&'q self, query: SqlQuery<'q>) -> SqlQuery<'q>;
}
