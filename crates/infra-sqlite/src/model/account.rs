use studyhub_core::domain::{Account, EntityId, Millis};
use studyhub_core::Result;

use super::{Persist, SqlQuery};

#[derive(sqlx::FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub age: i64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Persist for Account {
    const ENTITY: &'static str = "account";
    type Row = AccountRow;

    fn from_row(row: AccountRow) -> Self {
        Account {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            age: row.age,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
            // Relations stay empty until the loader fills them.
            profile: None,
            posts: Vec::new(),
            courses: Vec::new(),
        }
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn deleted_at(&self) -> Option<Millis> {
        self.deleted_at
    }

    fn set_deleted_at(&mut self, at: Option<Millis>) {
        self.deleted_at = at;
    }

    fn before_create(&mut self, now: Millis) -> Result<()> {
        self.apply_defaults();
        self.validate()?;
        self.created_at = now;
        self.updated_at = now;
        Ok(())
    }

    fn before_update(&mut self, now: Millis) -> Result<()> {
        self.apply_defaults();
        self.validate()?;
        self.updated_at = now;
        Ok(())
    }

    fn bind_insert<'q>(&'q self, query: SqlQuery<'q>) -> SqlQuery<'q> {
        query
            .bind(self.username.as_str())
            .bind(self.email.as_str())
            .bind(self.password_hash.as_str())
            .bind(self.age)
            .bind(self.is_active)
            .bind(self.created_at)
            .bind(self.updated_at)
            .bind(self.deleted_at)
    }

    fn bind_update<'q>(&'q self, query: SqlQuery<'q>) -> SqlQuery<'q> {
        query
            .bind(self.username.as_str())
            .bind(self.email.as_str())
            .bind(self.password_hash.as_str())
            .bind(self.age)
            .bind(self.is_active)
            .bind(self.updated_at)
            .bind(self.deleted_at)
            .bind(self.id)
    }
}
