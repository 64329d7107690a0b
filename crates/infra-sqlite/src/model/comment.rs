use studyhub_core::domain::{Comment, EntityId, Millis};
use studyhub_core::Result;

use super::{Persist, SqlQuery};

#[derive(sqlx::FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub account_id: i64,
    pub parent_id: Option<i64>,
    pub content: String,
    pub rating: i64,
    pub likes: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Persist for Comment {
    const ENTITY: &'static str = "comment";
    type Row = CommentRow;

    fn from_row(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            post_id: row.post_id,
            account_id: row.account_id,
            parent_id: row.parent_id,
            content: row.content,
            rating: row.rating,
            likes: row.likes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
            replies: Vec::new(),
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
        self.clamp_rating();
        self.validate()?;
        self.created_at = now;
        self.updated_at = now;
        Ok(())
    }

    fn before_update(&mut self, now: Millis) -> Result<()> {
        self.clamp_rating();
        self.validate()?;
        self.updated_at = now;
        Ok(())
    }

    fn bind_insert<'q>(&'q self, query: SqlQuery<'q>) -> SqlQuery<'q> {
        query
            .bind(self.post_id)
            .bind(self.account_id)
            .bind(self.parent_id)
            .bind(self.content.as_str())
            .bind(self.rating)
            .bind(self.likes)
            .bind(self.created_at)
            .bind(self.updated_at)
            .bind(self.deleted_at)
    }

    fn bind_update<'q>(&'q self, query: SqlQuery<'q>) -> SqlQuery<'q> {
        query
            .bind(self.post_id)
            .bind(self.account_id)
            .bind(self.parent_id)
            .bind(self.content.as_str())
            .bind(self.rating)
            .bind(self.likes)
            .bind(self.updated_at)
            .bind(self.deleted_at)
            .bind(self.id)
    }
}
