//! Declaration validation: referential integrity of entities, keys and relationships.

use crate::config::{EntityConfig, FullConfig, RelationConfig};
use crate::error::ConfigError;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

fn prefix_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]*$").expect("static regex"))
}

/// Which side of a relationship must carry the foreign key.
#[derive(Clone, Copy)]
enum KeySide {
    Owner,
    Target,
}

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    if !prefix_pattern().is_match(&config.table_prefix) {
        return Err(ConfigError::Validation(format!(
            "invalid table prefix: {}",
            config.table_prefix
        )));
    }

    let mut names = HashSet::new();
    for e in &config.entities {
        if !names.insert(e.name.as_str()) {
            return Err(ConfigError::DuplicateEntity(e.name.clone()));
        }
    }

    let flat = config.flattened()?;
    let by_name: HashMap<&str, &EntityConfig> = flat.iter().map(|e| (e.name.as_str(), e)).collect();
    let by_table: HashMap<&str, &EntityConfig> = flat
        .iter()
        .filter_map(|e| e.table.as_deref().map(|t| (t, e)))
        .collect();

    for e in &flat {
        if e.table.is_none() {
            return Err(ConfigError::Validation(format!("entity {} declares no table", e.name)));
        }
        let pk = e.primary_key_name();
        if !e.has_column(pk) {
            return Err(ConfigError::InvalidPrimaryKey {
                entity: e.name.clone(),
                column: pk.to_string(),
            });
        }
        for col in &e.sensitive_columns {
            if !e.has_column(col) {
                return Err(ConfigError::MissingReference {
                    kind: "sensitive column",
                    id: format!("{}.{}", e.name, col),
                });
            }
        }

        let mut relation_names = HashSet::new();
        for name in e.relation_names() {
            if !relation_names.insert(name) {
                return Err(ConfigError::DuplicateRelation {
                    entity: e.name.clone(),
                    relation: name.to_string(),
                });
            }
        }

        for rel in &e.has_one {
            validate_relation(e, rel, KeySide::Target, &by_name)?;
        }
        for rel in &e.has_many {
            validate_relation(e, rel, KeySide::Target, &by_name)?;
        }
        for rel in &e.belongs_to {
            validate_relation(e, rel, KeySide::Owner, &by_name)?;
        }

        if let Some(scope) = &e.scope {
            for join in &scope.joins {
                let joined = by_table.get(join.table.as_str()).ok_or_else(|| ConfigError::MissingReference {
                    kind: "join table",
                    id: join.table.clone(),
                })?;
                if !e.has_column(&join.local_column) || !joined.has_column(&join.foreign_column) {
                    return Err(ConfigError::MissingReference {
                        kind: "join column",
                        id: format!(
                            "{}.{} = {}.{}",
                            e.name, join.local_column, join.table, join.foreign_column
                        ),
                    });
                }
            }
        }
    }

    Ok(())
}

fn validate_relation(
    owner: &EntityConfig,
    rel: &RelationConfig,
    side: KeySide,
    by_name: &HashMap<&str, &EntityConfig>,
) -> Result<(), ConfigError> {
    let target_name = rel.target_name();
    let target = by_name
        .get(target_name.as_str())
        .ok_or_else(|| ConfigError::MissingReference {
            kind: "relation target",
            id: format!("{}.{} -> {}", owner.name, rel.name, target_name),
        })?;

    let (fk_holder, side_name) = match side {
        KeySide::Owner => (owner, owner.name.as_str()),
        KeySide::Target => (*target, target.name.as_str()),
    };
    if !fk_holder.has_column(&rel.foreign_key) {
        return Err(ConfigError::InvalidForeignKey {
            entity: owner.name.clone(),
            relation: rel.name.clone(),
            column: rel.foreign_key.clone(),
            side: side_name.to_string(),
        });
    }

    if let Some(source_key) = &rel.source_key {
        if matches!(side, KeySide::Owner) {
            return Err(ConfigError::Validation(format!(
                "{}.{}: source_key only applies to has_one/has_many",
                owner.name, rel.name
            )));
        }
        if !owner.has_column(source_key) {
            return Err(ConfigError::MissingReference {
                kind: "source key",
                id: format!("{}.{}", owner.name, source_key),
            });
        }
    }

    if let Some(order) = &rel.order {
        if !target.has_column(&order.column) {
            return Err(ConfigError::MissingReference {
                kind: "order column",
                id: format!("{}.{}", target.name, order.column),
            });
        }
    }

    if rel.limit == Some(0) {
        return Err(ConfigError::Validation(format!(
            "{}.{}: limit must be positive",
            owner.name, rel.name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnConfig, EntityConfig, FullConfig, RelationConfig};

    fn entity(name: &str, table: &str, pk: &str, columns: &[&str]) -> EntityConfig {
        EntityConfig {
            name: name.into(),
            table: Some(table.into()),
            primary_key: Some(pk.into()),
            columns: columns.iter().map(|c| ColumnConfig::from(*c)).collect(),
            ..Default::default()
        }
    }

    fn blog() -> FullConfig {
        let mut post = entity("Post", "posts", "ID", &["ID", "post_author", "post_status"]);
        post.belongs_to.push(RelationConfig::new("user", "post_author"));
        post.has_many.push(RelationConfig::new("comments", "comment_post_ID"));
        let user = entity("User", "users", "ID", &["ID", "user_login"]);
        let comment = entity("Comment", "comments", "comment_ID", &["comment_ID", "comment_post_ID"]);
        FullConfig {
            table_prefix: "wp_".into(),
            entities: vec![post, user, comment],
        }
    }

    #[test]
    fn accepts_consistent_declarations() {
        validate(&blog()).unwrap();
    }

    #[test]
    fn rejects_foreign_key_missing_from_both_tables() {
        let mut config = blog();
        config.entities[0].has_many[0].foreign_key = "nowhere".into();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidForeignKey { ref column, .. }) if column == "nowhere"
        ));
    }

    #[test]
    fn belongs_to_key_must_live_on_owner() {
        let mut config = blog();
        config.entities[0].belongs_to[0].foreign_key = "user_login".into();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidForeignKey { .. })));
    }

    #[test]
    fn rejects_unknown_target() {
        let mut config = blog();
        config.entities[0].has_many.push(RelationConfig::new("widgets", "post_id"));
        assert!(matches!(
            validate(&config),
            Err(ConfigError::MissingReference { kind: "relation target", .. })
        ));
    }

    #[test]
    fn rejects_duplicate_relation_names() {
        let mut config = blog();
        config.entities[0]
            .has_many
            .push(RelationConfig::new("user", "comment_post_ID").target("Comment"));
        assert!(matches!(validate(&config), Err(ConfigError::DuplicateRelation { .. })));
    }

    #[test]
    fn rejects_duplicate_entities_and_bad_prefix() {
        let mut config = blog();
        config.entities.push(entity("User", "users", "ID", &["ID"]));
        assert!(matches!(validate(&config), Err(ConfigError::DuplicateEntity(_))));

        let mut config = blog();
        config.table_prefix = "wp-; drop".into();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_missing_primary_key_column() {
        let mut config = blog();
        config.entities[1].primary_key = Some("user_id".into());
        assert!(matches!(validate(&config), Err(ConfigError::InvalidPrimaryKey { .. })));
    }
}
