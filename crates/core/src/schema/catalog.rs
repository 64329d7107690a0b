// Built-in entity catalog: the six domain entities and their relations.
//
// Column order here is a contract: the infra layer binds INSERT/UPDATE
// parameters in exactly this order.

use crate::error::Result;

use super::{
    ColumnDef, ColumnType, EntityDef, OnDelete, RelationDef, RelationKind, SchemaRegistry,
};

use ColumnType::{Boolean, Integer, Real, Text, Timestamp};

fn timestamps() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("created_at", Timestamp).indexed(),
        ColumnDef::new("updated_at", Timestamp),
        ColumnDef::new("deleted_at", Timestamp).nullable().indexed(),
    ]
}

fn account_def() -> EntityDef {
    let mut columns = vec![
        ColumnDef::new("id", Integer),
        ColumnDef::new("username", Text).unique(),
        ColumnDef::new("email", Text).unique(),
        ColumnDef::new("password_hash", Text),
        ColumnDef::new("age", Integer).default_sql("18"),
        ColumnDef::new("is_active", Boolean).default_sql("1"),
    ];
    columns.extend(timestamps());
    EntityDef {
        entity: "account",
        table: "accounts",
        columns,
        primary_key: "id",
        search_columns: vec!["username", "email"],
        relations: vec![
            RelationDef {
                name: "profile",
                target: "profile",
                kind: RelationKind::HasOne { fk: "account_id" },
                on_delete: OnDelete::Cascade,
            },
            RelationDef {
                name: "posts",
                target: "post",
                kind: RelationKind::HasMany { fk: "author_id" },
                on_delete: OnDelete::Restrict,
            },
            RelationDef {
                name: "enrollments",
                target: "enrollment",
                kind: RelationKind::HasMany { fk: "account_id" },
                on_delete: OnDelete::Cascade,
            },
            RelationDef {
                name: "courses",
                target: "course",
                kind: RelationKind::ManyToMany {
                    join_entity: "enrollment",
                    local_key: "account_id",
                    target_key: "course_id",
                },
                on_delete: OnDelete::Cascade,
            },
        ],
        soft_delete: true,
        composite_unique: vec![],
    }
}

fn profile_def() -> EntityDef {
    let mut columns = vec![
        ColumnDef::new("id", Integer),
        ColumnDef::new("account_id", Integer).unique(),
        ColumnDef::new("first_name", Text),
        ColumnDef::new("last_name", Text),
        ColumnDef::new("bio", Text).default_sql("''"),
        ColumnDef::new("avatar_url", Text).default_sql("''"),
        ColumnDef::new("location", Text).default_sql("''"),
        ColumnDef::new("website", Text).default_sql("''"),
    ];
    columns.extend(timestamps());
    EntityDef {
        entity: "profile",
        table: "profiles",
        columns,
        primary_key: "id",
        search_columns: vec!["first_name", "last_name", "location"],
        relations: vec![RelationDef {
            name: "account",
            target: "account",
            kind: RelationKind::BelongsTo { fk: "account_id" },
            on_delete: OnDelete::Cascade,
        }],
        soft_delete: true,
        composite_unique: vec![],
    }
}

fn post_def() -> EntityDef {
    let mut columns = vec![
        ColumnDef::new("id", Integer),
        ColumnDef::new("author_id", Integer).indexed(),
        ColumnDef::new("title", Text).indexed(),
        ColumnDef::new("body", Text),
        ColumnDef::new("slug", Text).unique(),
        ColumnDef::new("status", Text).default_sql("'DRAFT'"),
        ColumnDef::new("published_at", Timestamp).nullable().indexed(),
        ColumnDef::new("views", Integer).default_sql("0"),
    ];
    columns.extend(timestamps());
    EntityDef {
        entity: "post",
        table: "posts",
        columns,
        primary_key: "id",
        search_columns: vec!["title", "slug"],
        relations: vec![
            RelationDef {
                name: "author",
                target: "account",
                kind: RelationKind::BelongsTo { fk: "author_id" },
                on_delete: OnDelete::Restrict,
            },
            RelationDef {
                name: "comments",
                target: "comment",
                kind: RelationKind::HasMany { fk: "post_id" },
                on_delete: OnDelete::Cascade,
            },
        ],
        soft_delete: true,
        composite_unique: vec![],
    }
}

fn comment_def() -> EntityDef {
    let mut columns = vec![
        ColumnDef::new("id", Integer),
        ColumnDef::new("post_id", Integer).indexed(),
        ColumnDef::new("account_id", Integer).indexed(),
        ColumnDef::new("parent_id", Integer).nullable().indexed(),
        ColumnDef::new("content", Text),
        ColumnDef::new("rating", Integer).default_sql("5"),
        ColumnDef::new("likes", Integer).default_sql("0"),
    ];
    columns.extend(timestamps());
    EntityDef {
        entity: "comment",
        table: "comments",
        columns,
        primary_key: "id",
        search_columns: vec!["content"],
        relations: vec![
            RelationDef {
                name: "post",
                target: "post",
                kind: RelationKind::BelongsTo { fk: "post_id" },
                on_delete: OnDelete::Cascade,
            },
            RelationDef {
                name: "author",
                target: "account",
                kind: RelationKind::BelongsTo { fk: "account_id" },
                on_delete: OnDelete::Cascade,
            },
            RelationDef {
                name: "parent",
                target: "comment",
                kind: RelationKind::BelongsTo { fk: "parent_id" },
                on_delete: OnDelete::Cascade,
            },
            RelationDef {
                name: "replies",
                target: "comment",
                kind: RelationKind::HasMany { fk: "parent_id" },
                on_delete: OnDelete::Cascade,
            },
        ],
        soft_delete: true,
        composite_unique: vec![],
    }
}

fn course_def() -> EntityDef {
    let mut columns = vec![
        ColumnDef::new("id", Integer),
        ColumnDef::new("title", Text).unique(),
        ColumnDef::new("code", Text).unique(),
        ColumnDef::new("description", Text).default_sql("''"),
        ColumnDef::new("price", Real).default_sql("0.0"),
        ColumnDef::new("duration_hours", Integer).default_sql("40"),
        ColumnDef::new("is_active", Boolean).default_sql("1"),
        ColumnDef::new("starts_at", Timestamp).indexed(),
        ColumnDef::new("ends_at", Timestamp).indexed(),
    ];
    columns.extend(timestamps());
    EntityDef {
        entity: "course",
        table: "courses",
        columns,
        primary_key: "id",
        search_columns: vec!["title", "code", "description"],
        relations: vec![
            RelationDef {
                name: "enrollments",
                target: "enrollment",
                kind: RelationKind::HasMany { fk: "course_id" },
                on_delete: OnDelete::Cascade,
            },
            RelationDef {
                name: "students",
                target: "account",
                kind: RelationKind::ManyToMany {
                    join_entity: "enrollment",
                    local_key: "course_id",
                    target_key: "account_id",
                },
                on_delete: OnDelete::Cascade,
            },
        ],
        soft_delete: true,
        composite_unique: vec![],
    }
}

fn enrollment_def() -> EntityDef {
    let mut columns = vec![
        ColumnDef::new("id", Integer),
        ColumnDef::new("account_id", Integer).indexed(),
        ColumnDef::new("course_id", Integer).indexed(),
        ColumnDef::new("status", Text).default_sql("'ENROLLED'"),
        ColumnDef::new("grade", Real).nullable(),
    ];
    columns.extend(timestamps());
    EntityDef {
        entity: "enrollment",
        table: "enrollments",
        columns,
        primary_key: "id",
        search_columns: vec![],
        relations: vec![
            RelationDef {
                name: "account",
                target: "account",
                kind: RelationKind::BelongsTo { fk: "account_id" },
                on_delete: OnDelete::Cascade,
            },
            RelationDef {
                name: "course",
                target: "course",
                kind: RelationKind::BelongsTo { fk: "course_id" },
                on_delete: OnDelete::Cascade,
            },
        ],
        soft_delete: true,
        composite_unique: vec![vec!["account_id", "course_id"]],
    }
}

/// Build the registry for the StudyHub domain. Called once at startup; the
/// result is shared read-only (typically behind an `Arc`).
pub fn default_registry() -> Result<SchemaRegistry> {
    SchemaRegistry::builder()
        .register(account_def())?
        .register(profile_def())?
        .register(post_def())?
        .register(comment_def())?
        .register(course_def())?
        .register(enrollment_def())?
        .build()
}
