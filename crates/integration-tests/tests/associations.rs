//! Association loading: one-to-one, one-to-many, many-to-many through the
//! enrollment join, dotted multi-level paths, batch loading cost shape and
//! reply-tree reconstruction.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use studyhub_core::domain::{
    comment_tree, Account, Comment, Course, Enrollment, Post, Profile,
};
use studyhub_core::StoreError;
use studyhub_infra_sqlite::Load;
use tracing::{span, Event, Metadata, Subscriber};

/// Counts the loader's one-log-line-per-batched-query events, so tests can
/// assert how many relation queries a load actually issued.
#[derive(Default)]
struct BatchCounter {
    batches: AtomicUsize,
}

impl Subscriber for BatchCounter {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.target().ends_with("::loader")
    }

    fn new_span(&self, _attrs: &span::Attributes<'_>) -> span::Id {
        span::Id::from_u64(1)
    }

    fn record(&self, _id: &span::Id, _values: &span::Record<'_>) {}

    fn record_follows_from(&self, _id: &span::Id, _follows: &span::Id) {}

    fn event(&self, _event: &Event<'_>) {
        self.batches.fetch_add(1, Ordering::SeqCst);
    }

    fn enter(&self, _id: &span::Id) {}

    fn exit(&self, _id: &span::Id) {}
}

#[tokio::test]
async fn account_graph_loads_profile_and_nested_comments() {
    let db = common::setup("assoc_graph").await;
    let accounts = db.repo::<Account>();
    let profiles = db.repo::<Profile>();
    let posts = db.repo::<Post>();
    let comments = db.repo::<Comment>();

    // Build the whole graph in one transaction.
    let mut uow = db.pool.begin().await.unwrap();
    let mut alice = common::account(1);
    accounts.create(uow.conn().await.unwrap(), &mut alice).await.unwrap();

    let mut profile = Profile::new(alice.id, "Alice", "Smith");
    profile.location = "Lisbon".into();
    profiles.create(uow.conn().await.unwrap(), &mut profile).await.unwrap();

    let mut first = Post::new(alice.id, "First", "first", "body");
    posts.create(uow.conn().await.unwrap(), &mut first).await.unwrap();
    let mut second = Post::new(alice.id, "Second", "second", "body");
    posts.create(uow.conn().await.unwrap(), &mut second).await.unwrap();

    let mut c1 = Comment::new(first.id, alice.id, "on first");
    comments.create(uow.conn().await.unwrap(), &mut c1).await.unwrap();
    let mut c2 = Comment::new(second.id, alice.id, "on second");
    comments.create(uow.conn().await.unwrap(), &mut c2).await.unwrap();
    uow.commit().await.unwrap();

    let mut conn = db.pool.acquire().await.unwrap();
    let loaded = accounts
        .find_with(&mut conn, alice.id, &["profile", "posts.comments"])
        .await
        .unwrap();

    let loaded_profile = loaded.profile.as_ref().unwrap();
    assert_eq!(loaded_profile.full_name(), "Alice Smith");
    assert_eq!(loaded_profile.location, "Lisbon");
    assert_eq!(loaded.posts.len(), 2);
    // Stable order: newest post first.
    assert_eq!(loaded.posts[0].title, "Second");
    assert_eq!(loaded.posts[0].comments.len(), 1);
    assert_eq!(loaded.posts[0].comments[0].content, "on second");
    assert_eq!(loaded.posts[1].comments[0].content, "on first");
}

#[tokio::test]
async fn batch_load_distributes_children_to_their_parents() {
    let db = common::setup("assoc_batch").await;
    let accounts = db.repo::<Account>();
    let posts = db.repo::<Post>();

    let mut uow = db.pool.begin().await.unwrap();
    for n in 1..=50 {
        let mut acc = common::account(n);
        accounts.create(uow.conn().await.unwrap(), &mut acc).await.unwrap();
        for p in 1..=3 {
            let mut post = Post::new(
                acc.id,
                format!("post {n}-{p}"),
                format!("post-{n}-{p}"),
                "body",
            );
            posts.create(uow.conn().await.unwrap(), &mut post).await.unwrap();
        }
    }
    uow.commit().await.unwrap();

    // One query for the page, one batched query for all 150 posts.
    let mut conn = db.pool.acquire().await.unwrap();
    let mut page = accounts.find_page(&mut conn, 0, 50, None).await.unwrap();
    assert_eq!(page.len(), 50);

    let counter = Arc::new(BatchCounter::default());
    {
        let _guard = tracing::subscriber::set_default(counter.clone());
        Account::load_relation(&mut conn, &db.registry, &mut page, "posts")
            .await
            .unwrap();
    }
    // 50 parents still cost a single relation query, not one per parent.
    assert_eq!(counter.batches.load(Ordering::SeqCst), 1);

    for account in &page {
        assert_eq!(account.posts.len(), 3, "account {}", account.username);
        assert!(account.posts.iter().all(|p| p.author_id == account.id));
    }
}

#[tokio::test]
async fn many_to_many_resolves_through_live_enrollments() {
    let db = common::setup("assoc_m2m").await;
    let accounts = db.repo::<Account>();
    let courses = db.repo::<Course>();
    let enrollments = db.repo::<Enrollment>();

    let mut uow = db.pool.begin().await.unwrap();
    let mut alice = common::account(1);
    accounts.create(uow.conn().await.unwrap(), &mut alice).await.unwrap();
    let mut bob = common::account(2);
    accounts.create(uow.conn().await.unwrap(), &mut bob).await.unwrap();

    let mut rust = Course::new("Rust", "RS-101");
    courses.create(uow.conn().await.unwrap(), &mut rust).await.unwrap();
    let mut databases = Course::new("Databases", "DB-201");
    courses.create(uow.conn().await.unwrap(), &mut databases).await.unwrap();

    let mut e1 = Enrollment::new(alice.id, rust.id);
    enrollments.create(uow.conn().await.unwrap(), &mut e1).await.unwrap();
    let mut e2 = Enrollment::new(alice.id, databases.id);
    enrollments.create(uow.conn().await.unwrap(), &mut e2).await.unwrap();
    let mut e3 = Enrollment::new(bob.id, rust.id);
    enrollments.create(uow.conn().await.unwrap(), &mut e3).await.unwrap();
    uow.commit().await.unwrap();

    let mut conn = db.pool.acquire().await.unwrap();
    let mut page = accounts.find_page(&mut conn, 0, 10, None).await.unwrap();
    Account::load_relation(&mut conn, &db.registry, &mut page, "courses")
        .await
        .unwrap();

    let by_name = |name: &str| page.iter().find(|a| a.username == name).unwrap();
    assert_eq!(by_name("user1").courses.len(), 2);
    assert_eq!(by_name("user2").courses.len(), 1);
    assert_eq!(by_name("user2").courses[0].code, "RS-101");

    // A withdrawn (soft-deleted) enrollment drops out of the link.
    enrollments.soft_delete(&mut conn, e2.id).await.unwrap();
    let mut page = accounts.find_page(&mut conn, 0, 10, None).await.unwrap();
    Account::load_relation(&mut conn, &db.registry, &mut page, "courses")
        .await
        .unwrap();
    let alice_reloaded = page.iter().find(|a| a.username == "user1").unwrap();
    assert_eq!(alice_reloaded.courses.len(), 1);
    assert_eq!(alice_reloaded.courses[0].code, "RS-101");
}

#[tokio::test]
async fn soft_deleted_children_are_not_loaded() {
    let db = common::setup("assoc_soft_deleted").await;
    let accounts = db.repo::<Account>();
    let posts = db.repo::<Post>();
    let mut conn = db.pool.acquire().await.unwrap();

    let mut alice = common::account(1);
    accounts.create(&mut conn, &mut alice).await.unwrap();
    let mut keep = Post::new(alice.id, "Keep", "keep", "body");
    posts.create(&mut conn, &mut keep).await.unwrap();
    let mut gone = Post::new(alice.id, "Gone", "gone", "body");
    posts.create(&mut conn, &mut gone).await.unwrap();
    posts.soft_delete(&mut conn, gone.id).await.unwrap();

    let loaded = accounts.find_with(&mut conn, alice.id, &["posts"]).await.unwrap();
    assert_eq!(loaded.posts.len(), 1);
    assert_eq!(loaded.posts[0].title, "Keep");
}

#[tokio::test]
async fn reply_threads_rebuild_from_flat_comments() {
    let db = common::setup("assoc_tree").await;
    let accounts = db.repo::<Account>();
    let posts = db.repo::<Post>();
    let comments = db.repo::<Comment>();
    let mut conn = db.pool.acquire().await.unwrap();

    let mut alice = common::account(1);
    accounts.create(&mut conn, &mut alice).await.unwrap();
    let mut post = Post::new(alice.id, "Threaded", "threaded", "body");
    posts.create(&mut conn, &mut post).await.unwrap();

    let mut root = Comment::new(post.id, alice.id, "root");
    comments.create(&mut conn, &mut root).await.unwrap();
    let mut reply = Comment::reply_to(&root, alice.id, "reply");
    comments.create(&mut conn, &mut reply).await.unwrap();
    let mut nested = Comment::reply_to(&reply, alice.id, "nested");
    comments.create(&mut conn, &mut nested).await.unwrap();
    let mut other_root = Comment::new(post.id, alice.id, "other root");
    comments.create(&mut conn, &mut other_root).await.unwrap();

    // All four share post_id, so one relation load brings the flat set.
    let loaded = posts.find_with(&mut conn, post.id, &["comments"]).await.unwrap();
    assert_eq!(loaded.comments.len(), 4);

    let tree = comment_tree(loaded.comments);
    assert_eq!(tree.len(), 2);
    let threaded = tree.iter().find(|n| n.comment.content == "root").unwrap();
    assert_eq!(threaded.replies.len(), 1);
    assert_eq!(threaded.replies[0].replies[0].comment.content, "nested");
}

#[tokio::test]
async fn unknown_relation_path_is_a_config_error() {
    let db = common::setup("assoc_unknown").await;
    let accounts = db.repo::<Account>();
    let mut conn = db.pool.acquire().await.unwrap();

    let mut alice = common::account(1);
    accounts.create(&mut conn, &mut alice).await.unwrap();

    let err = accounts
        .find_with(&mut conn, alice.id, &["followers"])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Config(_)));
}

#[tokio::test]
async fn restricted_author_reference_blocks_hard_delete() {
    let db = common::setup("assoc_restrict").await;
    let accounts = db.repo::<Account>();
    let posts = db.repo::<Post>();
    let mut conn = db.pool.acquire().await.unwrap();

    let mut alice = common::account(1);
    accounts.create(&mut conn, &mut alice).await.unwrap();
    let mut post = Post::new(alice.id, "Pinned", "pinned", "body");
    posts.create(&mut conn, &mut post).await.unwrap();

    // posts.author_id is ON DELETE RESTRICT.
    let err = accounts.hard_delete(&mut conn, alice.id).await.unwrap_err();
    assert!(matches!(err, StoreError::ForeignKeyViolation { .. }));

    posts.hard_delete(&mut conn, post.id).await.unwrap();
    accounts.hard_delete(&mut conn, alice.id).await.unwrap();
}
