use studyhub_core::domain::{EntityId, Millis, Profile};
use studyhub_core::Result;

use super::{Persist, SqlQuery};

#[derive(sqlx::FromRow)]
pub struct ProfileRow {
    pub id: i64,
    pub account_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub avatar_url: String,
    pub location: String,
    pub website: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Persist for Profile {
    const ENTITY: &'static str = "profile";
    type Row = ProfileRow;

    fn from_row(row: ProfileRow) -> Self {
        Profile {
            id: row.id,
            account_id: row.account_id,
            first_name: row.first_name,
            last_name: row.last_name,
            bio: row.bio,
            avatar_url: row.avatar_url,
            location: row.location,
            website: row.website,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
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
        self.validate()?;
        self.created_at = now;
        self.updated_at = now;
        Ok(())
    }

    fn before_update(&mut self, now: Millis) -> Result<()> {
        self.validate()?;
        self.updated_at = now;
        Ok(())
    }

    fn bind_insert<'q>(&'q self, query: SqlQuery<'q>) -> SqlQuery<'q> {
        query
            .bind(self.account_id)
            .bind(self.first_name.as_str())
            .bind(self.last_name.as_str())
            .bind(self.bio.as_str())
            .bind(self.avatar_url.as_str())
            .bind(self.location.as_str())
            .bind(self.website.as_str())
            .bind(self.created_at)
            .bind(self.updated_at)
            .bind(self.deleted_at)
    }

    fn bind_update<'q>(&'q self, query: SqlQuery<'q>) -> SqlQuery<'q> {
        query
            .bind(self.account_id)
            .bind(self.first_name.as_str())
            .bind(self.last_name.as_str())
            .bind(self.bio.as_str())
            .bind(self.avatar_url.as_str())
            .bind(self.location.as_str())
            .bind(self.website.as_str())
            .bind(self.updated_at)
            .bind(self.deleted_at)
            .bind(self.id)
    }
}
