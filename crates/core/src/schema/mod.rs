// Schema Registry - maps entity types to tables, columns and relations.
//
// Populated once at process start via the builder and immutable afterwards;
// bad registrations fail at build time, never at query time.

mod catalog;

pub use catalog::default_registry;

use std::collections::HashMap;

use crate::error::{Result, StoreError};

/// Storage type of a column (rendered to SQLite affinities by the DDL pass).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Boolean,
    /// Epoch milliseconds, stored as INTEGER.
    Timestamp,
}

impl ColumnType {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Integer | ColumnType::Boolean | ColumnType::Timestamp => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    pub indexed: bool,
    /// Literal DEFAULT clause value, already SQL-rendered (e.g. `"18"`, `"''"`).
    pub default: Option<&'static str>,
}

impl ColumnDef {
    pub fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            unique: false,
            indexed: false,
            default: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn default_sql(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }
}

/// Referential action applied by the storage engine on parent deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    SetNull,
    Restrict,
}

impl OnDelete {
    pub fn sql(self) -> &'static str {
        match self {
            OnDelete::Cascade => "CASCADE",
            OnDelete::SetNull => "SET NULL",
            OnDelete::Restrict => "RESTRICT",
        }
    }
}

#[derive(Debug, Clone)]
pub enum RelationKind {
    /// Zero-or-one child row holding `fk` (unique) on the target table.
    HasOne { fk: &'static str },
    /// Many child rows holding `fk` on the target table.
    HasMany { fk: &'static str },
    /// `fk` lives on this entity and references the target's primary key.
    BelongsTo { fk: &'static str },
    /// Resolved through a registered join entity carrying both keys.
    ManyToMany {
        join_entity: &'static str,
        local_key: &'static str,
        target_key: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct RelationDef {
    pub name: &'static str,
    pub target: &'static str,
    pub kind: RelationKind,
    pub on_delete: OnDelete,
}

#[derive(Debug, Clone)]
pub struct EntityDef {
    pub entity: &'static str,
    pub table: &'static str,
    /// Ordered column list; index 0 is always the surrogate primary key.
    pub columns: Vec<ColumnDef>,
    pub primary_key: &'static str,
    /// Text columns scanned by `search()`.
    pub search_columns: Vec<&'static str>,
    pub relations: Vec<RelationDef>,
    pub soft_delete: bool,
    /// Multi-column UNIQUE constraints beyond per-column ones.
    pub composite_unique: Vec<Vec<&'static str>>,
}

impl EntityDef {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// All column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    /// Columns bound on INSERT: everything except the auto-assigned key.
    pub fn insert_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns
            .iter()
            .map(|c| c.name)
            .filter(move |n| *n != self.primary_key)
    }

    /// Columns bound on UPDATE: a full-row save minus key and creation stamp.
    pub fn update_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns
            .iter()
            .map(|c| c.name)
            .filter(move |n| *n != self.primary_key && *n != "created_at")
    }

    pub fn select_list(&self) -> String {
        self.column_names().collect::<Vec<_>>().join(", ")
    }

    pub fn insert_sql(&self) -> String {
        let cols: Vec<&str> = self.insert_columns().collect();
        let placeholders = vec!["?"; cols.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            cols.join(", "),
            placeholders
        )
    }

    pub fn update_sql(&self) -> String {
        let assignments: Vec<String> = self
            .update_columns()
            .map(|c| format!("{c} = ?"))
            .collect();
        let mut sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            self.table,
            assignments.join(", "),
            self.primary_key
        );
        if self.soft_delete {
            sql.push_str(" AND deleted_at IS NULL");
        }
        sql
    }

    /// Deterministic ordering applied to every multi-row read so that
    /// pagination is reproducible.
    pub fn stable_order(&self) -> String {
        format!("created_at DESC, {} DESC", self.primary_key)
    }
}

/// Builder collecting entity definitions; all configuration errors surface
/// here, at startup.
#[derive(Default)]
pub struct SchemaRegistryBuilder {
    entities: Vec<EntityDef>,
}

impl SchemaRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, def: EntityDef) -> Result<Self> {
        if self.entities.iter().any(|e| e.entity == def.entity) {
            return Err(StoreError::Config(format!(
                "entity '{}' registered twice",
                def.entity
            )));
        }
        if def.columns.is_empty() || def.columns[0].name != def.primary_key {
            return Err(StoreError::Config(format!(
                "entity '{}': first column must be the primary key '{}'",
                def.entity, def.primary_key
            )));
        }
        if def.soft_delete && !def.has_column("deleted_at") {
            return Err(StoreError::Config(format!(
                "entity '{}' is soft-deletable but has no deleted_at column",
                def.entity
            )));
        }
        for col in &def.search_columns {
            if !def.has_column(col) {
                return Err(StoreError::Config(format!(
                    "entity '{}': search column '{}' not declared",
                    def.entity, col
                )));
            }
        }
        self.entities.push(def);
        Ok(self)
    }

    pub fn build(self) -> Result<SchemaRegistry> {
        let index: HashMap<&'static str, usize> = self
            .entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.entity, i))
            .collect();

        // Relation targets and key columns must resolve now, not at query time.
        for def in &self.entities {
            for rel in &def.relations {
                let target = self
                    .entities
                    .get(*index.get(rel.target).ok_or_else(|| {
                        StoreError::Config(format!(
                            "entity '{}': relation '{}' targets unregistered entity '{}'",
                            def.entity, rel.name, rel.target
                        ))
                    })?)
                    .ok_or_else(|| StoreError::Config("registry index out of sync".into()))?;

                match &rel.kind {
                    RelationKind::BelongsTo { fk } => {
                        if !def.has_column(fk) {
                            return Err(StoreError::Config(format!(
                                "entity '{}': belongs-to '{}' names missing column '{}'",
                                def.entity, rel.name, fk
                            )));
                        }
                    }
                    RelationKind::HasOne { fk } | RelationKind::HasMany { fk } => {
                        if !target.has_column(fk) {
                            return Err(StoreError::Config(format!(
                                "entity '{}': relation '{}' names column '{}' missing on '{}'",
                                def.entity, rel.name, fk, rel.target
                            )));
                        }
                    }
                    RelationKind::ManyToMany {
                        join_entity,
                        local_key,
                        target_key,
                    } => {
                        let join = self
                            .entities
                            .iter()
                            .find(|e| e.entity == *join_entity)
                            .ok_or_else(|| {
                                StoreError::Config(format!(
                                    "entity '{}': relation '{}' uses unregistered join entity '{}'",
                                    def.entity, rel.name, join_entity
                                ))
                            })?;
                        for key in [local_key, target_key] {
                            if !join.has_column(key) {
                                return Err(StoreError::Config(format!(
                                    "join entity '{}': missing key column '{}'",
                                    join_entity, key
                                )));
                            }
                        }
                    }
                }
            }
        }

        let registry = SchemaRegistry {
            entities: self.entities,
            index,
        };
        // Detect dependency cycles up front so migration order always exists.
        registry.migration_order()?;
        Ok(registry)
    }
}

/// Immutable entity-to-table mapping, shared read-only across the process.
#[derive(Debug)]
pub struct SchemaRegistry {
    entities: Vec<EntityDef>,
    index: HashMap<&'static str, usize>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::new()
    }

    pub fn get(&self, entity: &str) -> Result<&EntityDef> {
        self.index
            .get(entity)
            .map(|i| &self.entities[*i])
            .ok_or_else(|| StoreError::Config(format!("entity '{entity}' is not registered")))
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityDef> {
        self.entities.iter()
    }

    /// Entities in dependency order: every belongs-to target precedes the
    /// entity that references it. Self-references (threaded comments) are
    /// ignored; any other cycle is a configuration error.
    pub fn migration_order(&self) -> Result<Vec<&EntityDef>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        fn visit<'a>(
            registry: &'a SchemaRegistry,
            idx: usize,
            marks: &mut [Mark],
            out: &mut Vec<&'a EntityDef>,
        ) -> Result<()> {
            match marks[idx] {
                Mark::Done => return Ok(()),
                Mark::InProgress => {
                    return Err(StoreError::Config(format!(
                        "dependency cycle involving entity '{}'",
                        registry.entities[idx].entity
                    )))
                }
                Mark::Unvisited => {}
            }
            marks[idx] = Mark::InProgress;
            let def = &registry.entities[idx];
            for rel in &def.relations {
                if let RelationKind::BelongsTo { .. } = rel.kind {
                    if rel.target != def.entity {
                        let target_idx = registry.index[rel.target];
                        visit(registry, target_idx, marks, out)?;
                    }
                }
            }
            marks[idx] = Mark::Done;
            out.push(&registry.entities[idx]);
            Ok(())
        }

        let mut marks = vec![Mark::Unvisited; self.entities.len()];
        let mut out = Vec::with_capacity(self.entities.len());
        for idx in 0..self.entities.len() {
            visit(self, idx, &mut marks, &mut out)?;
        }
        Ok(out)
    }

    /// Idempotent CREATE TABLE statement for one entity.
    pub fn table_ddl(&self, entity: &str) -> Result<String> {
        let def = self.get(entity)?;
        let mut lines: Vec<String> =
            vec![format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", def.primary_key)];

        for col in def.columns.iter().filter(|c| c.name != def.primary_key) {
            let mut line = format!("{} {}", col.name, col.ty.sql_type());
            if !col.nullable {
                line.push_str(" NOT NULL");
            }
            if col.unique {
                line.push_str(" UNIQUE");
            }
            if let Some(default) = col.default {
                line.push_str(&format!(" DEFAULT {default}"));
            }
            lines.push(line);
        }

        for group in &def.composite_unique {
            lines.push(format!("UNIQUE ({})", group.join(", ")));
        }

        for rel in &def.relations {
            if let RelationKind::BelongsTo { fk } = &rel.kind {
                let target = self.get(rel.target)?;
                lines.push(format!(
                    "FOREIGN KEY ({fk}) REFERENCES {} ({}) ON DELETE {}",
                    target.table,
                    target.primary_key,
                    rel.on_delete.sql()
                ));
            }
        }

        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            def.table,
            lines.join(",\n    ")
        ))
    }

    /// Idempotent index statements for one entity.
    pub fn index_ddl(&self, entity: &str) -> Result<Vec<String>> {
        let def = self.get(entity)?;
        Ok(def
            .columns
            .iter()
            .filter(|c| c.indexed)
            .map(|c| {
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_{}_{} ON {} ({})",
                    def.table, c.name, def.table, c.name
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(entity: &'static str, table: &'static str) -> EntityDef {
        EntityDef {
            entity,
            table,
            columns: vec![
                ColumnDef::new("id", ColumnType::Integer),
                ColumnDef::new("created_at", ColumnType::Timestamp),
                ColumnDef::new("deleted_at", ColumnType::Timestamp).nullable(),
            ],
            primary_key: "id",
            search_columns: vec![],
            relations: vec![],
            soft_delete: true,
            composite_unique: vec![],
        }
    }

    #[test]
    fn duplicate_registration_fails() {
        let result = SchemaRegistry::builder()
            .register(minimal("thing", "things"))
            .unwrap()
            .register(minimal("thing", "things"));
        assert!(matches!(result, Err(StoreError::Config(_))));
    }

    #[test]
    fn relation_to_unregistered_entity_fails() {
        let mut def = minimal("thing", "things");
        def.relations.push(RelationDef {
            name: "ghosts",
            target: "ghost",
            kind: RelationKind::HasMany { fk: "thing_id" },
            on_delete: OnDelete::Cascade,
        });
        let result = SchemaRegistry::builder().register(def).unwrap().build();
        assert!(matches!(result, Err(StoreError::Config(_))));
    }

    #[test]
    fn default_registry_builds_and_orders_dependencies() {
        let registry = default_registry().unwrap();
        let order: Vec<&str> = registry
            .migration_order()
            .unwrap()
            .iter()
            .map(|d| d.entity)
            .collect();

        let pos = |e: &str| order.iter().position(|x| *x == e).unwrap();
        assert!(pos("account") < pos("profile"));
        assert!(pos("account") < pos("post"));
        assert!(pos("post") < pos("comment"));
        assert!(pos("account") < pos("enrollment"));
        assert!(pos("course") < pos("enrollment"));
    }

    #[test]
    fn account_ddl_mentions_unique_email() {
        let registry = default_registry().unwrap();
        let ddl = registry.table_ddl("account").unwrap();
        assert!(ddl.contains("CREATE TABLE IF NOT EXISTS accounts"));
        assert!(ddl.contains("email TEXT NOT NULL UNIQUE"));
    }

    #[test]
    fn enrollment_ddl_has_composite_unique_and_fks() {
        let registry = default_registry().unwrap();
        let ddl = registry.table_ddl("enrollment").unwrap();
        assert!(ddl.contains("UNIQUE (account_id, course_id)"));
        assert!(ddl.contains("FOREIGN KEY (account_id) REFERENCES accounts (id)"));
        assert!(ddl.contains("FOREIGN KEY (course_id) REFERENCES courses (id)"));
    }

    #[test]
    fn insert_sql_skips_primary_key() {
        let registry = default_registry().unwrap();
        let sql = registry.get("profile").unwrap().insert_sql();
        assert!(sql.starts_with("INSERT INTO profiles (account_id,"));
        assert!(!sql.contains("(id,"));
    }

    #[test]
    fn update_sql_guards_soft_deleted_rows() {
        let registry = default_registry().unwrap();
        let sql = registry.get("account").unwrap().update_sql();
        assert!(sql.ends_with("WHERE id = ? AND deleted_at IS NULL"));
        assert!(!sql.contains("created_at = ?"));
    }

    #[test]
    fn unknown_entity_lookup_is_config_error() {
        let registry = default_registry().unwrap();
        assert!(matches!(
            registry.get("widget"),
            Err(StoreError::Config(_))
        ));
    }
}
