//! Build the resolved model from declarations, or load declarations from a JSON file.

use crate::config::resolved::{
    Clause, ColumnInfo, ColumnRef, Join, OrderBy, Predicate, RelationDef, RelationKind, ResolvedEntity, ResolvedModel,
};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

fn clause_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:([A-Za-z_][A-Za-z0-9_]*)\.)?([A-Za-z_][A-Za-z0-9_]*)\s*(<>|!=|<=|>=|=|<|>)\s*\?\s*$")
            .expect("static regex")
    })
}

fn and_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s+and\s+").expect("static regex"))
}

/// Tables a condition may reference: the entity's own table plus its scope joins, keyed by unprefixed name.
struct TableScope<'a> {
    prefix: &'a str,
    home: &'a EntityConfig,
    by_table: &'a HashMap<&'a str, &'a EntityConfig>,
    joined: Vec<&'a str>,
}

impl<'a> TableScope<'a> {
    fn lookup(&self, qualifier: Option<&str>) -> Option<(&'a EntityConfig, Option<String>)> {
        match qualifier {
            None => Some((self.home, None)),
            Some(t) if Some(t) == self.home.table.as_deref() => {
                Some((self.home, Some(format!("{}{}", self.prefix, t))))
            }
            Some(t) if self.joined.contains(&t) => self
                .by_table
                .get(t)
                .map(|e| (*e, Some(format!("{}{}", self.prefix, t)))),
            Some(_) => None,
        }
    }
}

/// Build resolved model from declarations (validates first).
pub fn resolve(config: &FullConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;
    let flat = config.flattened()?;
    let prefix = config.table_prefix.as_str();
    let by_name: HashMap<&str, &EntityConfig> = flat.iter().map(|e| (e.name.as_str(), e)).collect();
    let by_table: HashMap<&str, &EntityConfig> = flat
        .iter()
        .filter(|e| e.extends.is_none())
        .filter_map(|e| e.table.as_deref().map(|t| (t, e)))
        .collect();

    let mut entities = Vec::with_capacity(flat.len());
    for e in &flat {
        let table = e
            .table
            .as_deref()
            .ok_or_else(|| ConfigError::Validation(format!("entity {} declares no table", e.name)))?;

        let (joins, scope) = match &e.scope {
            Some(scope) => {
                let joins: Vec<Join> = scope
                    .joins
                    .iter()
                    .map(|j| Join {
                        table: format!("{}{}", prefix, j.table),
                        local_column: j.local_column.clone(),
                        foreign_column: j.foreign_column.clone(),
                    })
                    .collect();
                let tables = TableScope {
                    prefix,
                    home: e,
                    by_table: &by_table,
                    joined: scope.joins.iter().map(|j| j.table.as_str()).collect(),
                };
                let predicate = match &scope.conditions {
                    Some(c) => build_predicate(&e.name, c, &tables)?,
                    None => Predicate::default(),
                };
                (joins, predicate)
            }
            None => (Vec::new(), Predicate::default()),
        };

        let mut relations = Vec::new();
        let groups = [
            (RelationKind::HasOne, &e.has_one),
            (RelationKind::HasMany, &e.has_many),
            (RelationKind::BelongsTo, &e.belongs_to),
        ];
        for (kind, decls) in groups {
            for rel in decls.iter() {
                relations.push(resolve_relation(e, rel, kind, prefix, &by_name, &by_table)?);
            }
        }

        entities.push(ResolvedEntity {
            name: e.name.clone(),
            table_name: format!("{}{}", prefix, table),
            primary_key: e.primary_key_name().to_string(),
            columns: e
                .columns
                .iter()
                .map(|c| ColumnInfo {
                    name: c.name().to_string(),
                    pg_type: c.pg_type().map(str::to_string),
                })
                .collect(),
            sensitive_columns: e.sensitive_columns.iter().cloned().collect(),
            joins,
            scope,
            relations,
        });
    }

    tracing::debug!(entities = entities.len(), prefix = %prefix, "resolved entity model");
    Ok(ResolvedModel::new(config.table_prefix.clone(), entities))
}

fn resolve_relation(
    owner: &EntityConfig,
    rel: &RelationConfig,
    kind: RelationKind,
    prefix: &str,
    by_name: &HashMap<&str, &EntityConfig>,
    by_table: &HashMap<&str, &EntityConfig>,
) -> Result<RelationDef, ConfigError> {
    let target_name = rel.target_name();
    let target = by_name
        .get(target_name.as_str())
        .ok_or_else(|| ConfigError::MissingReference {
            kind: "relation target",
            id: target_name.clone(),
        })?;
    let owner_label = format!("{}.{}", owner.name, rel.name);
    let conditions = match &rel.conditions {
        Some(c) => {
            let tables = TableScope {
                prefix,
                home: target,
                by_table,
                joined: target
                    .scope
                    .as_ref()
                    .map(|s| s.joins.iter().map(|j| j.table.as_str()).collect())
                    .unwrap_or_default(),
            };
            build_predicate(&owner_label, c, &tables)?
        }
        None => Predicate::default(),
    };
    Ok(RelationDef {
        name: rel.name.clone(),
        kind,
        target: target_name,
        foreign_key: rel.foreign_key.clone(),
        source_key: rel
            .source_key
            .clone()
            .unwrap_or_else(|| owner.primary_key_name().to_string()),
        conditions,
        limit: rel.limit,
        order: rel.order.as_ref().map(|o| OrderBy {
            column: o.column.clone(),
            descending: o.descending,
        }),
    })
}

fn build_predicate(owner: &str, conditions: &ConditionConfig, tables: &TableScope<'_>) -> Result<Predicate, ConfigError> {
    let raw = match conditions {
        ConditionConfig::Fragment(fragment, params) => parse_fragment(owner, fragment, params)?,
        ConditionConfig::Clauses(clauses) => clauses
            .iter()
            .map(|c| {
                let (qualifier, name) = match c.column.split_once('.') {
                    Some((t, n)) => (Some(t.to_string()), n.to_string()),
                    None => (None, c.column.clone()),
                };
                (qualifier, name, c.op, c.value.clone())
            })
            .collect(),
    };

    let mut predicate = Predicate::default();
    for (qualifier, name, op, value) in raw {
        let (entity, table) = tables.lookup(qualifier.as_deref()).ok_or_else(|| ConfigError::InvalidCondition {
            owner: owner.to_string(),
            message: format!("table {} is not queried", qualifier.as_deref().unwrap_or("?")),
        })?;
        if !entity.has_column(&name) {
            return Err(ConfigError::InvalidCondition {
                owner: owner.to_string(),
                message: format!("unknown column {} on {}", name, entity.name),
            });
        }
        let cast = entity
            .columns
            .iter()
            .find(|c| c.name() == name)
            .and_then(|c| c.pg_type())
            .map(str::to_string);
        predicate.push(Clause {
            column: ColumnRef { table, name },
            op,
            value,
            cast,
        });
    }
    Ok(predicate)
}

type RawClause = (Option<String>, String, CompareOp, Value);

/// Parse `"a = ? AND t.b <> ?"` with its parameters (array, or one scalar).
fn parse_fragment(owner: &str, fragment: &str, params: &Value) -> Result<Vec<RawClause>, ConfigError> {
    let params: Vec<Value> = match params {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    };
    let pieces: Vec<&str> = and_pattern().split(fragment.trim()).collect();
    if pieces.len() != params.len() {
        return Err(ConfigError::InvalidCondition {
            owner: owner.to_string(),
            message: format!(
                "{} placeholder(s) but {} parameter(s) in '{}'",
                pieces.len(),
                params.len(),
                fragment
            ),
        });
    }
    pieces
        .into_iter()
        .zip(params)
        .map(|(piece, value)| {
            let caps = clause_pattern().captures(piece).ok_or_else(|| ConfigError::InvalidCondition {
                owner: owner.to_string(),
                message: format!("cannot parse '{}'", piece),
            })?;
            let op: CompareOp = caps[3].parse()?;
            Ok((caps.get(1).map(|m| m.as_str().to_string()), caps[2].to_string(), op, value))
        })
        .collect()
}

/// Load declarations from a JSON file (`{"table_prefix": "wp_", "entities": [...]}`).
pub fn load_from_path(path: impl AsRef<Path>) -> Result<FullConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&text).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> FullConfig {
        serde_json::from_value(json!({
            "table_prefix": "blog_",
            "entities": [
                {
                    "name": "Post",
                    "table": "posts",
                    "primary_key": "ID",
                    "columns": [{"name": "ID", "type": "bigint"}, "post_status", "post_author"],
                    "belongs_to": [{"name": "user", "foreign_key": "post_author"}],
                    "has_many": [{
                        "name": "comments",
                        "foreign_key": "comment_post_ID",
                        "conditions": ["comment_parent = ? AND comment_approved <> ?", [0, "spam"]],
                        "limit": 5,
                        "order": {"column": "comment_ID", "descending": true}
                    }]
                },
                {"name": "User", "table": "users", "primary_key": "ID", "columns": ["ID"]},
                {
                    "name": "Comment",
                    "table": "comments",
                    "primary_key": "comment_ID",
                    "columns": ["comment_ID", "comment_post_ID", {"name": "comment_parent", "type": "bigint"}, "comment_approved"]
                },
                {"name": "Term", "table": "terms", "primary_key": "term_id", "columns": ["term_id", "name"]},
                {
                    "name": "TermTaxonomy", "table": "term_taxonomy", "primary_key": "term_id",
                    "columns": ["term_id", "taxonomy"]
                },
                {
                    "name": "Category",
                    "extends": "Term",
                    "scope": {
                        "joins": [{"table": "term_taxonomy", "local_column": "term_id", "foreign_column": "term_id"}],
                        "conditions": ["term_taxonomy.taxonomy = ?", "category"]
                    }
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn resolves_tables_keys_and_inferred_targets() {
        let model = resolve(&config()).unwrap();
        let post = model.entity("Post").unwrap();
        assert_eq!(post.table_name, "blog_posts");
        assert_eq!(post.primary_key, "ID");
        let user = post.relation("user").unwrap();
        assert_eq!(user.kind, RelationKind::BelongsTo);
        assert_eq!(user.target, "User");
        assert_eq!(user.effective_limit(), Some(1));
        let comments = post.relation("comments").unwrap();
        assert_eq!(comments.target, "Comment");
        assert_eq!(comments.source_key, "ID");
        assert_eq!(comments.effective_limit(), Some(5));
        assert_eq!(comments.order.as_ref().map(|o| o.descending), Some(true));
    }

    #[test]
    fn fragment_conditions_become_typed_clauses() {
        let model = resolve(&config()).unwrap();
        let comments = model.entity("Post").unwrap().relation("comments").unwrap();
        let clauses = &comments.conditions.clauses;
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].column, ColumnRef::bare("comment_parent"));
        assert_eq!(clauses[0].value, json!(0));
        assert_eq!(clauses[0].cast.as_deref(), Some("bigint"));
        assert_eq!(clauses[1].op, CompareOp::Ne);
        assert_eq!(clauses[1].value, json!("spam"));
    }

    #[test]
    fn scoped_entity_gets_prefixed_join_and_qualified_condition() {
        let model = resolve(&config()).unwrap();
        let category = model.entity("Category").unwrap();
        assert_eq!(category.table_name, "blog_terms");
        assert!(category.is_scoped());
        assert_eq!(category.joins[0].table, "blog_term_taxonomy");
        let clause = &category.scope.clauses[0];
        assert_eq!(clause.column.table.as_deref(), Some("blog_term_taxonomy"));
        assert_eq!(clause.column.name, "taxonomy");
        assert_eq!(clause.value, json!("category"));
    }

    #[test]
    fn declarations_group_by_kind() {
        let model = resolve(&config()).unwrap();
        let decl = model.declarations("Post").unwrap();
        assert!(decl.owns_one.is_empty());
        assert_eq!(decl.owns_many.len(), 1);
        assert_eq!(decl.belongs_to[0].name, "user");
        assert!(model.declarations("Nope").is_none());
    }

    #[test]
    fn rejects_placeholder_count_mismatch() {
        let mut config = config();
        config.entities[0].has_many[0].conditions = Some(ConditionConfig::fragment("comment_parent = ?", json!([0, 1])));
        assert!(matches!(resolve(&config), Err(ConfigError::InvalidCondition { .. })));
    }

    #[test]
    fn rejects_condition_on_unknown_column() {
        let mut config = config();
        config.entities[0].has_many[0].conditions = Some(ConditionConfig::fragment("post_status = ?", "publish"));
        assert!(matches!(resolve(&config), Err(ConfigError::InvalidCondition { .. })));
    }

    #[test]
    fn load_from_path_reports_missing_file() {
        let err = load_from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
