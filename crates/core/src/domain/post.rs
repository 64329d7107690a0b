// Post Entity (one-to-many from Account)

use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result};
use super::{Comment, EntityId, Millis};

/// Post lifecycle status, stored as upper-snake text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostStatus::Draft => write!(f, "DRAFT"),
            PostStatus::Published => write!(f, "PUBLISHED"),
            PostStatus::Archived => write!(f, "ARCHIVED"),
        }
    }
}

impl PostStatus {
    /// Parse the stored text form. Unknown values fall back to `Draft`.
    pub fn parse(s: &str) -> Self {
        match s {
            "PUBLISHED" => PostStatus::Published,
            "ARCHIVED" => PostStatus::Archived,
            _ => PostStatus::Draft,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub id: EntityId,
    pub author_id: EntityId,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub slug: String,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<Millis>,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub created_at: Millis,
    #[serde(default)]
    pub updated_at: Millis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Millis>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
}

impl Post {
    pub fn new(
        author_id: EntityId,
        title: impl Into<String>,
        slug: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            author_id,
            title: title.into(),
            slug: slug.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    /// Before-save hook: transition to `Published` stamps `published_at`.
    pub fn apply_publish_timestamp(&mut self, now: Millis) {
        if self.status == PostStatus::Published && self.published_at.is_none() {
            self.published_at = Some(now);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.author_id <= 0 {
            return Err(DomainError::invalid("post", "author_id", "must reference an account"));
        }
        if self.title.trim().is_empty() {
            return Err(DomainError::invalid("post", "title", "must not be empty"));
        }
        if self.slug.trim().is_empty() || self.slug.contains(char::is_whitespace) {
            return Err(DomainError::invalid("post", "slug", "must be a non-empty token"));
        }
        if self.views < 0 {
            return Err(DomainError::invalid("post", "views", "must be >= 0"));
        }
        Ok(())
    }

    pub fn is_published(&self, now: Millis) -> bool {
        self.status == PostStatus::Published
            && self.published_at.map(|at| at <= now).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_stamps_timestamp_once() {
        let mut post = Post::new(1, "Hello", "hello", "body");
        post.status = PostStatus::Published;
        post.apply_publish_timestamp(500);
        assert_eq!(post.published_at, Some(500));

        // Re-saving must not move the original publish time
        post.apply_publish_timestamp(900);
        assert_eq!(post.published_at, Some(500));
    }

    #[test]
    fn draft_is_not_published() {
        let mut post = Post::new(1, "Hello", "hello", "body");
        post.apply_publish_timestamp(500);
        assert_eq!(post.published_at, None);
        assert!(!post.is_published(1000));
    }

    #[test]
    fn status_round_trips_as_text() {
        for status in [PostStatus::Draft, PostStatus::Published, PostStatus::Archived] {
            assert_eq!(PostStatus::parse(&status.to_string()), status);
        }
    }

    #[test]
    fn slug_with_spaces_rejected() {
        let post = Post::new(1, "Hello", "bad slug", "body");
        assert!(post.validate().is_err());
    }
}
