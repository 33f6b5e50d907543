//! Raw config types for collections and globals, deserializable from JSON or built in code.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Default soft-delete marker column.
pub const DEFAULT_SOFT_DELETE_FIELD: &str = "deletedAt";

/// Logical kind of a declared field. Drives the physical column type and the value codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    #[serde(alias = "textarea", alias = "email", alias = "code", alias = "select", alias = "radio")]
    Text,
    Number,
    #[serde(alias = "checkbox")]
    Boolean,
    Date,
    #[serde(alias = "upload")]
    Relationship,
    /// Nested object.
    #[serde(alias = "object")]
    Group,
    Array,
    #[serde(alias = "richText", alias = "blocks", alias = "point")]
    Json,
}

impl FieldKind {
    /// SQLite column type for this kind.
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldKind::Number => "REAL",
            FieldKind::Boolean => "INTEGER",
            _ => "TEXT",
        }
    }

    /// Kinds whose values are stored as JSON text.
    pub fn is_structured(self) -> bool {
        matches!(self, FieldKind::Group | FieldKind::Array | FieldKind::Json)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

impl FieldConfig {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        FieldConfig {
            name: name.into(),
            kind,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// `versions`: `false`, `true` (versions without drafts) or `{ "drafts": bool }`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VersionsConfig {
    #[default]
    Disabled,
    Enabled { drafts: bool },
}

impl VersionsConfig {
    pub fn enabled(self) -> bool {
        matches!(self, VersionsConfig::Enabled { .. })
    }

    pub fn drafts(self) -> bool {
        matches!(self, VersionsConfig::Enabled { drafts: true })
    }
}

impl<'de> Deserialize<'de> for VersionsConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;
        match v {
            serde_json::Value::Null | serde_json::Value::Bool(false) => Ok(VersionsConfig::Disabled),
            serde_json::Value::Bool(true) => Ok(VersionsConfig::Enabled { drafts: false }),
            serde_json::Value::Object(obj) => {
                let drafts = match obj.get("drafts") {
                    None | Some(serde_json::Value::Null) => false,
                    Some(serde_json::Value::Bool(b)) => *b,
                    // { "drafts": { "autosave": ... } } still means drafts are on
                    Some(serde_json::Value::Object(_)) => true,
                    Some(other) => {
                        return Err(serde::de::Error::custom(format!(
                            "versions.drafts must be a boolean or object; got {}",
                            other
                        )))
                    }
                };
                Ok(VersionsConfig::Enabled { drafts })
            }
            other => Err(serde::de::Error::custom(format!(
                "versions must be a boolean or {{ \"drafts\": bool }}; got {}",
                other
            ))),
        }
    }
}

impl Serialize for VersionsConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            VersionsConfig::Disabled => serializer.serialize_bool(false),
            VersionsConfig::Enabled { drafts } => {
                serde_json::json!({ "drafts": drafts }).serialize(serializer)
            }
        }
    }
}

/// `softDelete`: `false`, `true` (marker `deletedAt`) or a custom marker column name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SoftDeleteConfig {
    #[default]
    Disabled,
    Enabled,
    Field(String),
}

impl SoftDeleteConfig {
    /// Marker column name, if soft-delete is on.
    pub fn field(&self) -> Option<&str> {
        match self {
            SoftDeleteConfig::Disabled => None,
            SoftDeleteConfig::Enabled => Some(DEFAULT_SOFT_DELETE_FIELD),
            SoftDeleteConfig::Field(f) => Some(f.as_str()),
        }
    }
}

impl<'de> Deserialize<'de> for SoftDeleteConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;
        match v {
            serde_json::Value::Null | serde_json::Value::Bool(false) => Ok(SoftDeleteConfig::Disabled),
            serde_json::Value::Bool(true) => Ok(SoftDeleteConfig::Enabled),
            serde_json::Value::String(s) => Ok(SoftDeleteConfig::Field(s)),
            other => Err(serde::de::Error::custom(format!(
                "softDelete must be a boolean or a column name; got {}",
                other
            ))),
        }
    }
}

impl Serialize for SoftDeleteConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SoftDeleteConfig::Disabled => serializer.serialize_bool(false),
            SoftDeleteConfig::Enabled => serializer.serialize_bool(true),
            SoftDeleteConfig::Field(f) => serializer.serialize_str(f),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexConfig {
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionConfig {
    pub slug: String,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub versions: VersionsConfig,
    #[serde(default)]
    pub soft_delete: SoftDeleteConfig,
    #[serde(default)]
    pub indexes: Vec<IndexConfig>,
    /// Physical table name; defaults to `slug`.
    #[serde(default)]
    pub db_name: Option<String>,
}

impl CollectionConfig {
    pub fn new(slug: impl Into<String>) -> Self {
        CollectionConfig {
            slug: slug.into(),
            fields: Vec::new(),
            versions: VersionsConfig::Disabled,
            soft_delete: SoftDeleteConfig::Disabled,
            indexes: Vec::new(),
            db_name: None,
        }
    }

    pub fn field(mut self, field: FieldConfig) -> Self {
        self.fields.push(field);
        self
    }

    pub fn versions(mut self, drafts: bool) -> Self {
        self.versions = VersionsConfig::Enabled { drafts };
        self
    }

    pub fn soft_delete(mut self, soft_delete: SoftDeleteConfig) -> Self {
        self.soft_delete = soft_delete;
        self
    }

    pub fn index(mut self, index: IndexConfig) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn db_name(mut self, name: impl Into<String>) -> Self {
        self.db_name = Some(name.into());
        self
    }

    /// Physical table name.
    pub fn table_name(&self) -> &str {
        self.db_name.as_deref().unwrap_or(&self.slug)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub slug: String,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

impl GlobalConfig {
    pub fn new(slug: impl Into<String>) -> Self {
        GlobalConfig {
            slug: slug.into(),
            fields: Vec::new(),
        }
    }
}

/// All collection and global definitions in one struct.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FullConfig {
    #[serde(default)]
    pub collections: Vec<CollectionConfig>,
    #[serde(default)]
    pub globals: Vec<GlobalConfig>,
}
