// Comment Entity (threaded via nullable parent reference)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result};
use super::{EntityId, Millis};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// A comment on a post. `parent_id` points at another comment of the same
/// post to form reply threads; the tree is rebuilt on demand by
/// [`comment_tree`], never held as owning back-pointers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: EntityId,
    pub post_id: EntityId,
    pub account_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntityId>,
    pub content: String,
    #[serde(default = "default_rating")]
    pub rating: i64,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub created_at: Millis,
    #[serde(default)]
    pub updated_at: Millis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Millis>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<Comment>,
}

fn default_rating() -> i64 {
    MAX_RATING
}

impl Comment {
    pub fn new(post_id: EntityId, account_id: EntityId, content: impl Into<String>) -> Self {
        Self {
            post_id,
            account_id,
            content: content.into(),
            rating: MAX_RATING,
            ..Default::default()
        }
    }

    pub fn reply_to(parent: &Comment, account_id: EntityId, content: impl Into<String>) -> Self {
        let mut c = Self::new(parent.post_id, account_id, content);
        c.parent_id = Some(parent.id);
        c
    }

    /// Before-save hook: rating is clamped into [1,5] rather than rejected.
    pub fn clamp_rating(&mut self) {
        self.rating = self.rating.clamp(MIN_RATING, MAX_RATING);
    }

    pub fn validate(&self) -> Result<()> {
        if self.post_id <= 0 {
            return Err(DomainError::invalid("comment", "post_id", "must reference a post"));
        }
        if self.account_id <= 0 {
            return Err(DomainError::invalid("comment", "account_id", "must reference an account"));
        }
        if self.content.trim().is_empty() {
            return Err(DomainError::invalid("comment", "content", "must not be empty"));
        }
        if self.parent_id == Some(self.id) && self.id != 0 {
            return Err(DomainError::invalid("comment", "parent_id", "cannot reply to itself"));
        }
        Ok(())
    }

    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// A node in a reconstructed reply tree.
#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

/// Rebuild reply trees from a flat comment set, arena style: children are
/// grouped by `parent_id` and attached top-down. A comment whose parent is
/// not in the input set becomes a root, so a damaged reference can never
/// produce a cycle or drop the subtree.
pub fn comment_tree(comments: Vec<Comment>) -> Vec<CommentNode> {
    let known: std::collections::HashSet<EntityId> = comments.iter().map(|c| c.id).collect();
    let mut by_parent: HashMap<EntityId, Vec<Comment>> = HashMap::new();
    let mut roots: Vec<Comment> = Vec::new();

    for c in comments {
        match c.parent_id {
            Some(pid) if known.contains(&pid) && pid != c.id => {
                by_parent.entry(pid).or_default().push(c)
            }
            _ => roots.push(c),
        }
    }

    fn attach(comment: Comment, by_parent: &mut HashMap<EntityId, Vec<Comment>>) -> CommentNode {
        let children = by_parent.remove(&comment.id).unwrap_or_default();
        CommentNode {
            comment,
            replies: children
                .into_iter()
                .map(|c| attach(c, by_parent))
                .collect(),
        }
    }

    roots.into_iter().map(|c| attach(c, &mut by_parent)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: EntityId, parent_id: Option<EntityId>) -> Comment {
        let mut c = Comment::new(1, 1, format!("comment {id}"));
        c.id = id;
        c.parent_id = parent_id;
        c
    }

    #[test]
    fn rating_clamps_into_range() {
        let mut c = Comment::new(1, 1, "hi");
        c.rating = 42;
        c.clamp_rating();
        assert_eq!(c.rating, MAX_RATING);

        c.rating = -3;
        c.clamp_rating();
        assert_eq!(c.rating, MIN_RATING);
    }

    #[test]
    fn tree_groups_replies_under_parents() {
        let tree = comment_tree(vec![
            comment(1, None),
            comment(2, Some(1)),
            comment(3, Some(1)),
            comment(4, Some(2)),
            comment(5, None),
        ]);

        assert_eq!(tree.len(), 2);
        let first = &tree[0];
        assert_eq!(first.comment.id, 1);
        assert_eq!(first.replies.len(), 2);
        assert_eq!(first.replies[0].replies[0].comment.id, 4);
    }

    #[test]
    fn orphaned_reply_becomes_root() {
        let tree = comment_tree(vec![comment(7, Some(99))]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].comment.id, 7);
    }
}
