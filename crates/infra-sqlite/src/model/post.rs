use studyhub_core::domain::{EntityId, Millis, Post, PostStatus};
use studyhub_core::Result;

use super::{Persist, SqlQuery};

#[derive(sqlx::FromRow)]
pub struct PostRow {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub body: String,
    pub slug: String,
    pub status: String,
    pub published_at: Option<i64>,
    pub views: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Persist for Post {
    const ENTITY: &'static str = "post";
    type Row = PostRow;

    fn from_row(row: PostRow) -> Self {
        Post {
            id: row.id,
            author_id: row.author_id,
            title: row.title,
            body: row.body,
            slug: row.slug,
            status: PostStatus::parse(&row.status),
            published_at: row.published_at,
            views: row.views,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
            comments: Vec::new(),
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
        self.apply_publish_timestamp(now);
        self.validate()?;
        self.created_at = now;
        self.updated_at = now;
        Ok(())
    }

    fn before_update(&mut self, now: Millis) -> Result<()> {
        self.apply_publish_timestamp(now);
        self.validate()?;
        self.updated_at = now;
        Ok(())
    }

    fn bind_insert<'q>(&'q self, query: SqlQuery<'q>) -> SqlQuery<'q> {
        query
            .bind(self.author_id)
            .bind(self.title.as_str())
            .bind(self.body.as_str())
            .bind(self.slug.as_str())
            .bind(self.status.to_string())
            .bind(self.published_at)
            .bind(self.views)
            .bind(self.created_at)
            .bind(self.updated_at)
            .bind(self.deleted_at)
    }

    fn bind_update<'q>(&'q self, query: SqlQuery<'q>) -> SqlQuery<'q> {
        query
            .bind(self.author_id)
            .bind(self.title.as_str())
            .bind(self.body.as_str())
            .bind(self.slug.as_str())
            .bind(self.status.to_string())
            .bind(self.published_at)
            .bind(self.views)
            .bind(self.updated_at)
            .bind(self.deleted_at)
            .bind(self.id)
    }
}
