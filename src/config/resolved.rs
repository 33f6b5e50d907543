//! Resolved collection model: config validated and flattened for runtime use.

use crate::config::{validate_collection, CollectionConfig, FieldKind, SYSTEM_COLUMNS};
use crate::error::{ConfigError, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
    /// Column has a DB default; inserts omit it when the body does not provide a value.
    pub has_default: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedIndex {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Clone, Debug)]
pub struct ResolvedCollection {
    pub slug: String,
    pub table_name: String,
    /// System columns first, then the soft-delete marker, then declared fields.
    pub columns: Vec<ColumnInfo>,
    pub versions: bool,
    pub drafts: bool,
    pub soft_delete_field: Option<String>,
    pub indexes: Vec<ResolvedIndex>,
}

impl ResolvedCollection {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// `{table}_versions` when versioning is enabled.
    pub fn versions_table(&self) -> Option<String> {
        self.versions.then(|| format!("{}_versions", self.table_name))
    }

    /// Declared field columns (excludes system columns and the marker).
    pub fn field_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        let marker = self.soft_delete_field.as_deref();
        self.columns
            .iter()
            .filter(move |c| !SYSTEM_COLUMNS.contains(&c.name.as_str()) && Some(c.name.as_str()) != marker)
    }
}

/// Validate and flatten one collection config.
pub fn resolve(config: &CollectionConfig) -> Result<ResolvedCollection, StoreError> {
    validate_collection(config)?;
    let table_name = config.table_name().to_string();

    let mut columns = vec![
        system_column("id"),
        system_column("createdAt"),
        system_column("updatedAt"),
    ];
    if config.versions.drafts() {
        columns.push(ColumnInfo {
            name: "_status".into(),
            kind: FieldKind::Text,
            nullable: false,
            has_default: true,
        });
    }
    let soft_delete_field = config.soft_delete.field().map(str::to_string);
    if let Some(marker) = &soft_delete_field {
        columns.push(ColumnInfo {
            name: marker.clone(),
            kind: FieldKind::Date,
            nullable: true,
            has_default: false,
        });
    }
    for f in &config.fields {
        columns.push(ColumnInfo {
            name: f.name.clone(),
            kind: f.kind,
            nullable: !f.required,
            has_default: false,
        });
    }

    for idx in &config.indexes {
        if let Some(missing) = idx.columns.iter().find(|col| !columns.iter().any(|c| &c.name == *col)) {
            return Err(ConfigError::Validation(format!(
                "{}: index column '{}' is not a column of the collection",
                config.slug, missing
            ))
            .into());
        }
    }

    let indexes = config
        .indexes
        .iter()
        .map(|idx| ResolvedIndex {
            name: idx
                .name
                .clone()
                .unwrap_or_else(|| format!("{}_{}_idx", table_name, idx.columns.join("_"))),
            columns: idx.columns.clone(),
            unique: idx.unique,
        })
        .collect();

    Ok(ResolvedCollection {
        slug: config.slug.clone(),
        table_name,
        columns,
        versions: config.versions.enabled(),
        drafts: config.versions.drafts(),
        soft_delete_field,
        indexes,
    })
}

fn system_column(name: &str) -> ColumnInfo {
    ColumnInfo {
        name: name.to_string(),
        kind: FieldKind::Text,
        nullable: false,
        has_default: false,
    }
}

/// Collections registered by `initialize`, keyed by slug. Cheap to clone; shared by the
/// top-level adapter, its write jobs and transaction-scoped adapters.
#[derive(Clone, Default)]
pub struct CollectionRegistry {
    by_slug: Arc<RwLock<HashMap<String, Arc<ResolvedCollection>>>>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slug: &str) -> Result<Arc<ResolvedCollection>, StoreError> {
        let map = self.by_slug.read().unwrap_or_else(|e| e.into_inner());
        map.get(slug)
            .cloned()
            .ok_or_else(|| StoreError::UnknownCollection(slug.to_string()))
    }

    pub fn register(&self, collection: ResolvedCollection) {
        let mut map = self.by_slug.write().unwrap_or_else(|e| e.into_inner());
        map.insert(collection.slug.clone(), Arc::new(collection));
    }

    pub fn slugs(&self) -> Vec<String> {
        let map = self.by_slug.read().unwrap_or_else(|e| e.into_inner());
        let mut slugs: Vec<String> = map.keys().cloned().collect();
        slugs.sort();
        slugs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldConfig, IndexConfig, SoftDeleteConfig};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_columns_in_order() {
        let c = CollectionConfig::new("posts")
            .versions(true)
            .soft_delete(SoftDeleteConfig::Enabled)
            .field(FieldConfig::new("title", FieldKind::Text).required())
            .field(FieldConfig::new("views", FieldKind::Number));
        let r = resolve(&c).unwrap();
        let names: Vec<&str> = r.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "createdAt", "updatedAt", "_status", "deletedAt", "title", "views"]);
        let fields: Vec<&str> = r.field_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(fields, vec!["title", "views"]);
        assert!(!r.column("title").unwrap().nullable);
        assert_eq!(r.versions_table().as_deref(), Some("posts_versions"));
    }

    #[test]
    fn test_resolve_db_name_and_default_index_name() {
        let c = CollectionConfig::new("blog-posts")
            .db_name("articles")
            .field(FieldConfig::new("slug", FieldKind::Text))
            .index(IndexConfig {
                columns: vec!["slug".into()],
                unique: true,
                name: None,
            });
        let r = resolve(&c).unwrap();
        assert_eq!(r.table_name, "articles");
        assert_eq!(r.indexes[0].name, "articles_slug_idx");
        assert!(r.versions_table().is_none());
        assert!(!r.has_column("_status"));
    }

    #[test]
    fn test_registry_unknown_collection() {
        let registry = CollectionRegistry::new();
        assert!(matches!(registry.get("nope"), Err(StoreError::UnknownCollection(_))));
        registry.register(resolve(&CollectionConfig::new("posts")).unwrap());
        assert!(registry.get("posts").is_ok());
        assert_eq!(registry.slugs(), vec!["posts".to_string()]);
    }
}
