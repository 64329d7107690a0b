// Domain Layer - Entities and validation rules

mod account;
mod comment;
mod course;
mod error;
mod post;
mod profile;

pub use account::Account;
pub use comment::{comment_tree, Comment, CommentNode};
pub use course::{Course, Enrollment, EnrollmentStatus};
pub use error::{DomainError, Result};
pub use post::{Post, PostStatus};
pub use profile::Profile;

/// Surrogate primary key. Zero means "not yet persisted".
pub type EntityId = i64;

/// Epoch milliseconds, the timestamp representation used across the layer.
pub type Millis = i64;
