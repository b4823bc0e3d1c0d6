//! Raw declaration types: entities, relationships, conditions and scopes as written in config.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::ConfigError;

/// Table prefix used when a declaration file does not name one.
pub const DEFAULT_TABLE_PREFIX: &str = "wp_";

/// Primary key assumed when an entity does not declare one.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

fn default_table_prefix() -> String {
    DEFAULT_TABLE_PREFIX.to_string()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[default]
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=", alias = "<>")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl CompareOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

impl std::str::FromStr for CompareOp {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(CompareOp::Eq),
            "!=" | "<>" => Ok(CompareOp::Ne),
            "<" => Ok(CompareOp::Lt),
            "<=" => Ok(CompareOp::Le),
            ">" => Ok(CompareOp::Gt),
            ">=" => Ok(CompareOp::Ge),
            other => Err(ConfigError::Validation(format!("unsupported operator: {}", other))),
        }
    }
}

/// A column name, optionally with the PostgreSQL type used to cast bound parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnConfig {
    Name(String),
    Typed {
        name: String,
        #[serde(rename = "type", default)]
        pg_type: Option<String>,
    },
}

impl ColumnConfig {
    pub fn name(&self) -> &str {
        match self {
            ColumnConfig::Name(n) => n,
            ColumnConfig::Typed { name, .. } => name,
        }
    }

    pub fn pg_type(&self) -> Option<&str> {
        match self {
            ColumnConfig::Name(_) => None,
            ColumnConfig::Typed { pg_type, .. } => pg_type.as_deref(),
        }
    }

    pub fn typed(name: &str, pg_type: &str) -> Self {
        ColumnConfig::Typed {
            name: name.to_string(),
            pg_type: Some(pg_type.to_string()),
        }
    }
}

impl From<&str> for ColumnConfig {
    fn from(name: &str) -> Self {
        ColumnConfig::Name(name.to_string())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClauseConfig {
    pub column: String,
    #[serde(default)]
    pub op: CompareOp,
    pub value: Value,
}

/// Filter conditions. Either an SQL-like fragment with `?` placeholders and its bound
/// parameters (`["comment_parent = ?", [0]]`, a scalar counts as one parameter), or a
/// list of structured clauses. Clauses are ANDed.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionConfig {
    Fragment(String, Value),
    Clauses(Vec<ClauseConfig>),
}

impl ConditionConfig {
    pub fn fragment(predicate: &str, params: impl Into<Value>) -> Self {
        ConditionConfig::Fragment(predicate.to_string(), params.into())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderConfig {
    pub column: String,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationConfig {
    pub name: String,
    /// Target entity. Inferred from `name` when omitted (`user` -> `User`, `comments` -> `Comment`).
    #[serde(default, alias = "class", alias = "class_name")]
    pub target: Option<String>,
    pub foreign_key: String,
    /// Owner column matched against `foreign_key` for has_one/has_many. Defaults to the owner's primary key.
    #[serde(default, alias = "primary_key")]
    pub source_key: Option<String>,
    #[serde(default)]
    pub conditions: Option<ConditionConfig>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub order: Option<OrderConfig>,
}

impl RelationConfig {
    pub fn new(name: &str, foreign_key: &str) -> Self {
        RelationConfig {
            name: name.to_string(),
            target: None,
            foreign_key: foreign_key.to_string(),
            source_key: None,
            conditions: None,
            limit: None,
            order: None,
        }
    }

    pub fn target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    pub fn source_key(mut self, column: &str) -> Self {
        self.source_key = Some(column.to_string());
        self
    }

    pub fn conditions(mut self, conditions: ConditionConfig) -> Self {
        self.conditions = Some(conditions);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn order(mut self, column: &str, descending: bool) -> Self {
        self.order = Some(OrderConfig {
            column: column.to_string(),
            descending,
        });
        self
    }

    /// Declared target, or the one inferred from the relation name.
    pub fn target_name(&self) -> String {
        self.target.clone().unwrap_or_else(|| infer_target(&self.name))
    }
}

/// `comments` -> `Comment`, `categories` -> `Category`, `user` -> `User`.
/// Other irregular plurals need an explicit `target`.
pub fn infer_target(relation: &str) -> String {
    let singular = match (relation.strip_suffix("ies"), relation.strip_suffix('s')) {
        (Some(stem), _) if !stem.is_empty() => format!("{}y", stem),
        (_, Some(stem)) if !stem.is_empty() => stem.to_string(),
        _ => relation.to_string(),
    };
    let mut chars = singular.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// LEFT JOIN `table` ON owner.`local_column` = `table`.`foreign_column`. `table` is unprefixed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JoinConfig {
    pub table: String,
    pub local_column: String,
    pub foreign_column: String,
}

/// Joins and conditions applied to every query against an entity.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScopeConfig {
    #[serde(default)]
    pub joins: Vec<JoinConfig>,
    #[serde(default)]
    pub conditions: Option<ConditionConfig>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EntityConfig {
    pub name: String,
    /// Unprefixed table name. Required unless `extends` is set.
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub primary_key: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
    /// Column names never exposed when a record is serialized.
    #[serde(default)]
    pub sensitive_columns: Vec<String>,
    #[serde(default)]
    pub has_one: Vec<RelationConfig>,
    #[serde(default)]
    pub has_many: Vec<RelationConfig>,
    #[serde(default)]
    pub belongs_to: Vec<RelationConfig>,
    #[serde(default)]
    pub scope: Option<ScopeConfig>,
}

impl EntityConfig {
    pub fn primary_key_name(&self) -> &str {
        self.primary_key.as_deref().unwrap_or(DEFAULT_PRIMARY_KEY)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name() == name)
    }

    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.has_one
            .iter()
            .chain(&self.has_many)
            .chain(&self.belongs_to)
            .map(|r| r.name.as_str())
    }

    /// Merge with the parent: parent fills what the child leaves unset, parent relations come first.
    fn inherit(&self, parent: &EntityConfig) -> EntityConfig {
        let mut merged = parent.clone();
        merged.name = self.name.clone();
        merged.extends = self.extends.clone();
        if self.table.is_some() {
            merged.table = self.table.clone();
        }
        if self.primary_key.is_some() {
            merged.primary_key = self.primary_key.clone();
        }
        merged.columns.extend(self.columns.iter().filter(|c| !parent.has_column(c.name())).cloned());
        merged.sensitive_columns.extend(self.sensitive_columns.iter().cloned());
        merged.has_one.extend(self.has_one.iter().cloned());
        merged.has_many.extend(self.has_many.iter().cloned());
        merged.belongs_to.extend(self.belongs_to.iter().cloned());
        merged.scope = self.scope.clone();
        merged
    }
}

/// All declarations in one struct for in-memory loading.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FullConfig {
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
    pub entities: Vec<EntityConfig>,
}

impl Default for FullConfig {
    fn default() -> Self {
        FullConfig {
            table_prefix: default_table_prefix(),
            entities: Vec::new(),
        }
    }
}

impl FullConfig {
    pub fn entity(&self, name: &str) -> Option<&EntityConfig> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Entities with `extends` applied. Only one level of inheritance is allowed.
    pub fn flattened(&self) -> Result<Vec<EntityConfig>, ConfigError> {
        let by_name: HashMap<&str, &EntityConfig> =
            self.entities.iter().map(|e| (e.name.as_str(), e)).collect();
        self.entities
            .iter()
            .map(|e| match e.extends.as_deref() {
                None => Ok(e.clone()),
                Some(parent_name) => {
                    let parent = by_name.get(parent_name).ok_or_else(|| ConfigError::MissingReference {
                        kind: "parent entity",
                        id: parent_name.to_string(),
                    })?;
                    if parent.extends.is_some() {
                        return Err(ConfigError::Validation(format!(
                            "{} extends {}, which itself extends another entity",
                            e.name, parent_name
                        )));
                    }
                    Ok(e.inherit(parent))
                }
            })
            .collect()
    }
}
