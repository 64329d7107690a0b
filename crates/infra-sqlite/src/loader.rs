// Association loader: batched relation loading without joins in the
// entity SQL. For N parent rows each relation level costs exactly one
// query (`WHERE fk IN (...)`); many-to-many goes through the join table
// with the parent key aliased onto the result. Dotted paths such as
// "posts.comments" recurse one level per segment.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, Row, SqliteConnection};
use tracing::debug;

use studyhub_core::domain::{Account, Comment, Course, Enrollment, EntityId, Post, Profile};
use studyhub_core::schema::{EntityDef, RelationKind, SchemaRegistry};
use studyhub_core::{Result, StoreError};

use crate::error::map_sqlx_error;
use crate::model::Persist;

/// Batched relation loading for one entity type. `path` names a relation
/// declared on the entity, optionally followed by `.`-separated child
/// relations ("posts", "posts.comments", "posts.comments.replies").
#[async_trait]
pub trait Load: Persist {
    async fn load_relation(
        conn: &mut SqliteConnection,
        registry: &SchemaRegistry,
        items: &mut [Self],
        path: &str,
    ) -> Result<()>;
}

fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

fn ids_of<T: Persist>(items: &[T]) -> Vec<EntityId> {
    items.iter().map(Persist::id).collect()
}

fn unknown_path(entity: &'static str, path: &str) -> StoreError {
    StoreError::Config(format!("entity '{entity}' has no loadable relation '{path}'"))
}

/// Relation lookup resolving the declared foreign key and target entity.
fn relation<'r>(
    registry: &'r SchemaRegistry,
    entity: &'static str,
    name: &str,
) -> Result<(&'r RelationKind, &'r EntityDef)> {
    let def = registry.get(entity)?;
    let rel = def
        .relation(name)
        .ok_or_else(|| unknown_path(entity, name))?;
    Ok((&rel.kind, registry.get(rel.target)?))
}

/// One batched query for all children carrying `fk` in `ids`. Returns
/// (parent key, child) pairs in the target's stable order.
async fn fetch_children<C: Persist>(
    conn: &mut SqliteConnection,
    target: &EntityDef,
    fk: &str,
    ids: &[EntityId],
) -> Result<Vec<(EntityId, C)>> {
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "SELECT {} FROM {} WHERE {fk} IN ({placeholders}) AND deleted_at IS NULL ORDER BY {}",
        target.select_list(),
        target.table,
        target.stable_order()
    );
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }
    let rows = query
        .fetch_all(conn)
        .await
        .map_err(|e| map_sqlx_error(C::ENTITY, e))?;

    debug!(entity = C::ENTITY, parents = ids.len(), children = rows.len(), "loaded relation batch");
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let key: EntityId = row.try_get(fk).map_err(|e| map_sqlx_error(C::ENTITY, e))?;
        let decoded = C::Row::from_row(&row).map_err(|e| map_sqlx_error(C::ENTITY, e))?;
        out.push((key, C::from_row(decoded)));
    }
    Ok(out)
}

/// One batched query through a join table. The parent key rides along as
/// `link_id` so rows can be distributed without a second lookup.
async fn fetch_linked<C: Persist>(
    conn: &mut SqliteConnection,
    target: &EntityDef,
    join: &EntityDef,
    local_key: &str,
    target_key: &str,
    ids: &[EntityId],
) -> Result<Vec<(EntityId, C)>> {
    let placeholders = vec!["?"; ids.len()].join(", ");
    let select: Vec<String> = target
        .column_names()
        .map(|c| format!("t.{c} AS {c}"))
        .collect();
    let sql = format!(
        "SELECT {}, j.{local_key} AS link_id FROM {} t \
         INNER JOIN {} j ON j.{target_key} = t.{} \
         WHERE j.{local_key} IN ({placeholders}) \
         AND t.deleted_at IS NULL AND j.deleted_at IS NULL \
         ORDER BY t.created_at DESC, t.{} DESC",
        select.join(", "),
        target.table,
        join.table,
        target.primary_key,
        target.primary_key
    );
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }
    let rows = query
        .fetch_all(conn)
        .await
        .map_err(|e| map_sqlx_error(C::ENTITY, e))?;

    debug!(entity = C::ENTITY, parents = ids.len(), linked = rows.len(), "loaded join batch");
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let key: EntityId = row
            .try_get("link_id")
            .map_err(|e| map_sqlx_error(C::ENTITY, e))?;
        let decoded = C::Row::from_row(&row).map_err(|e| map_sqlx_error(C::ENTITY, e))?;
        out.push((key, C::from_row(decoded)));
    }
    Ok(out)
}

/// Recurse into the rest of a dotted path, keeping the parent pairing.
async fn descend<C: Load>(
    conn: &mut SqliteConnection,
    registry: &SchemaRegistry,
    fetched: Vec<(EntityId, C)>,
    rest: Option<&str>,
) -> Result<Vec<(EntityId, C)>> {
    match rest {
        None => Ok(fetched),
        Some(rest) => {
            let (keys, mut children): (Vec<EntityId>, Vec<C>) = fetched.into_iter().unzip();
            C::load_relation(conn, registry, &mut children, rest).await?;
            Ok(keys.into_iter().zip(children).collect())
        }
    }
}

fn group<C>(pairs: Vec<(EntityId, C)>) -> HashMap<EntityId, Vec<C>> {
    let mut by_parent: HashMap<EntityId, Vec<C>> = HashMap::new();
    for (key, child) in pairs {
        by_parent.entry(key).or_default().push(child);
    }
    by_parent
}

fn many_to_many_keys(kind: &RelationKind) -> Result<(&'static str, &'static str, &'static str)> {
    match kind {
        RelationKind::ManyToMany {
            join_entity,
            local_key,
            target_key,
        } => Ok((*join_entity, *local_key, *target_key)),
        _ => Err(StoreError::Config("relation is not many-to-many".into())),
    }
}

fn fk_of(kind: &RelationKind) -> Result<&'static str> {
    match kind {
        RelationKind::HasOne { fk } | RelationKind::HasMany { fk } => Ok(*fk),
        _ => Err(StoreError::Config("relation does not carry a child key".into())),
    }
}

#[async_trait]
impl Load for Account {
    async fn load_relation(
        conn: &mut SqliteConnection,
        registry: &SchemaRegistry,
        items: &mut [Self],
        path: &str,
    ) -> Result<()> {
        let ids = ids_of(items);
        if ids.is_empty() {
            return Ok(());
        }
        let (head, rest) = split_path(path);
        match head {
            "profile" => {
                if rest.is_some() {
                    return Err(unknown_path(Self::ENTITY, path));
                }
                let (kind, target) = relation(registry, Self::ENTITY, head)?;
                let fetched: Vec<(EntityId, Profile)> =
                    fetch_children(conn, target, fk_of(kind)?, &ids).await?;
                let mut by_parent = group(fetched);
                for account in items.iter_mut() {
                    account.profile = by_parent.remove(&account.id).map(|mut v| v.remove(0));
                }
            }
            "posts" => {
                let (kind, target) = relation(registry, Self::ENTITY, head)?;
                let fetched: Vec<(EntityId, Post)> =
                    fetch_children(conn, target, fk_of(kind)?, &ids).await?;
                let fetched = descend(conn, registry, fetched, rest).await?;
                let mut by_parent = group(fetched);
                for account in items.iter_mut() {
                    account.posts = by_parent.remove(&account.id).unwrap_or_default();
                }
            }
            "courses" => {
                if rest.is_some() {
                    return Err(unknown_path(Self::ENTITY, path));
                }
                let (kind, target) = relation(registry, Self::ENTITY, head)?;
                let (join_entity, local_key, target_key) = many_to_many_keys(kind)?;
                let join = registry.get(join_entity)?;
                let fetched: Vec<(EntityId, Course)> =
                    fetch_linked(conn, target, join, local_key, target_key, &ids).await?;
                let mut by_parent = group(fetched);
                for account in items.iter_mut() {
                    account.courses = by_parent.remove(&account.id).unwrap_or_default();
                }
            }
            _ => return Err(unknown_path(Self::ENTITY, path)),
        }
        Ok(())
    }
}

#[async_trait]
impl Load for Post {
    async fn load_relation(
        conn: &mut SqliteConnection,
        registry: &SchemaRegistry,
        items: &mut [Self],
        path: &str,
    ) -> Result<()> {
        let ids = ids_of(items);
        if ids.is_empty() {
            return Ok(());
        }
        let (head, rest) = split_path(path);
        match head {
            "comments" => {
                let (kind, target) = relation(registry, Self::ENTITY, head)?;
                let fetched: Vec<(EntityId, Comment)> =
                    fetch_children(conn, target, fk_of(kind)?, &ids).await?;
                let fetched = descend(conn, registry, fetched, rest).await?;
                let mut by_parent = group(fetched);
                for post in items.iter_mut() {
                    post.comments = by_parent.remove(&post.id).unwrap_or_default();
                }
            }
            _ => return Err(unknown_path(Self::ENTITY, path)),
        }
        Ok(())
    }
}

#[async_trait]
impl Load for Comment {
    async fn load_relation(
        conn: &mut SqliteConnection,
        registry: &SchemaRegistry,
        items: &mut [Self],
        path: &str,
    ) -> Result<()> {
        let ids = ids_of(items);
        if ids.is_empty() {
            return Ok(());
        }
        let (head, rest) = split_path(path);
        match head {
            "replies" => {
                let (kind, target) = relation(registry, Self::ENTITY, head)?;
                let fetched: Vec<(EntityId, Comment)> =
                    fetch_children(conn, target, fk_of(kind)?, &ids).await?;
                let fetched = descend(conn, registry, fetched, rest).await?;
                let mut by_parent = group(fetched);
                for comment in items.iter_mut() {
                    comment.replies = by_parent.remove(&comment.id).unwrap_or_default();
                }
            }
            _ => return Err(unknown_path(Self::ENTITY, path)),
        }
        Ok(())
    }
}

// Leaf entities: nothing to eager-load, any path is a configuration error.

#[async_trait]
impl Load for Profile {
    async fn load_relation(
        _conn: &mut SqliteConnection,
        _registry: &SchemaRegistry,
        _items: &mut [Self],
        path: &str,
    ) -> Result<()> {
        Err(unknown_path(Self::ENTITY, path))
    }
}

#[async_trait]
impl Load for Course {
    async fn load_relation(
        _conn: &mut SqliteConnection,
        _registry: &SchemaRegistry,
        _items: &mut [Self],
        path: &str,
    ) -> Result<()> {
        Err(unknown_path(Self::ENTITY, path))
    }
}

#[async_trait]
impl Load for Enrollment {
    async fn load_relation(
        _conn: &mut SqliteConnection,
        _registry: &SchemaRegistry,
        _items: &mut [Self],
        path: &str,
    ) -> Result<()> {
        Err(unknown_path(Self::ENTITY, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_split_on_first_dot() {
        assert_eq!(split_path("posts"), ("posts", None));
        assert_eq!(
            split_path("posts.comments.replies"),
            ("posts", Some("comments.replies"))
        );
    }

    #[test]
    fn grouping_preserves_fetch_order() {
        let grouped = group(vec![(1, "a"), (2, "b"), (1, "c")]);
        assert_eq!(grouped[&1], vec!["a", "c"]);
        assert_eq!(grouped[&2], vec!["b"]);
    }
}
