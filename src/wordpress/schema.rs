//! Built-in declarations for the WordPress core tables.

use crate::config::{
    resolve, ColumnConfig, ConditionConfig, EntityConfig, FullConfig, JoinConfig, RelationConfig, ResolvedModel,
    ScopeConfig,
};
use crate::error::ConfigError;

const BIGINT: &str = "bigint";
const INT: &str = "integer";

/// Column list: names in `ints` are typed `bigint`, the rest are untyped text-like columns.
fn columns(ints: &[&str], others: &[&str]) -> Vec<ColumnConfig> {
    ints.iter()
        .map(|c| ColumnConfig::typed(c, BIGINT))
        .chain(others.iter().map(|c| ColumnConfig::from(*c)))
        .collect()
}

fn entity(name: &str, table: &str, primary_key: &str, columns: Vec<ColumnConfig>) -> EntityConfig {
    EntityConfig {
        name: name.to_string(),
        table: Some(table.to_string()),
        primary_key: Some(primary_key.to_string()),
        columns,
        ..Default::default()
    }
}

fn post() -> EntityConfig {
    let mut cols = columns(
        &["ID", "post_author", "post_parent", "comment_count"],
        &[
            "post_date",
            "post_date_gmt",
            "post_content",
            "post_title",
            "post_excerpt",
            "post_status",
            "comment_status",
            "ping_status",
            "post_password",
            "post_name",
            "to_ping",
            "pinged",
            "post_modified",
            "post_modified_gmt",
            "post_content_filtered",
            "guid",
            "post_type",
            "post_mime_type",
        ],
    );
    cols.push(ColumnConfig::typed("menu_order", INT));
    let mut e = entity("Post", "posts", "ID", cols);
    e.sensitive_columns = vec!["post_password".into()];
    e.belongs_to = vec![RelationConfig::new("user", "post_author")];
    e.has_many = vec![
        RelationConfig::new("postterms", "object_id").target("TermRelationship"),
        RelationConfig::new("comments", "comment_post_ID")
            .target("Comment")
            .conditions(ConditionConfig::fragment("comment_parent = ?", vec!["0"])),
        RelationConfig::new("meta", "post_id").target("PostMeta"),
    ];
    e
}

fn post_meta() -> EntityConfig {
    let mut e = entity(
        "PostMeta",
        "postmeta",
        "meta_id",
        columns(&["meta_id", "post_id"], &["meta_key", "meta_value"]),
    );
    e.belongs_to = vec![RelationConfig::new("post", "post_id").target("Post")];
    e
}

fn comment() -> EntityConfig {
    let mut cols = columns(
        &["comment_ID", "comment_post_ID", "comment_parent", "user_id"],
        &[
            "comment_author",
            "comment_author_email",
            "comment_author_url",
            "comment_author_IP",
            "comment_date",
            "comment_date_gmt",
            "comment_content",
            "comment_approved",
            "comment_agent",
            "comment_type",
        ],
    );
    cols.push(ColumnConfig::typed("comment_karma", INT));
    let mut e = entity("Comment", "comments", "comment_ID", cols);
    e.sensitive_columns = vec!["comment_author_email".into(), "comment_author_IP".into()];
    e.belongs_to = vec![
        RelationConfig::new("post", "comment_post_ID")
            .target("Post")
            .limit(10)
            .conditions(ConditionConfig::fragment("post_status = ?", "publish")),
        RelationConfig::new("user", "user_id"),
        RelationConfig::new("comment", "comment_parent").target("Comment").limit(10),
    ];
    e.has_many = vec![RelationConfig::new("comments", "comment_parent").target("Comment")];
    e
}

fn term() -> EntityConfig {
    let mut e = entity(
        "Term",
        "terms",
        "term_id",
        columns(&["term_id", "term_group"], &["name", "slug"]),
    );
    e.belongs_to = vec![RelationConfig::new("termtaxonomy", "term_id").target("TermTaxonomy")];
    e
}

/// A view of terms restricted to one taxonomy through the term_taxonomy join.
fn taxonomy_view(name: &str, taxonomy: &str) -> EntityConfig {
    EntityConfig {
        name: name.to_string(),
        extends: Some("Term".to_string()),
        scope: Some(ScopeConfig {
            joins: vec![JoinConfig {
                table: "term_taxonomy".into(),
                local_column: "term_id".into(),
                foreign_column: "term_id".into(),
            }],
            conditions: Some(ConditionConfig::fragment("term_taxonomy.taxonomy = ?", taxonomy)),
        }),
        ..Default::default()
    }
}

fn term_taxonomy() -> EntityConfig {
    let mut e = entity(
        "TermTaxonomy",
        "term_taxonomy",
        "term_id",
        columns(
            &["term_taxonomy_id", "term_id", "parent", "count"],
            &["taxonomy", "description"],
        ),
    );
    e.has_many = vec![RelationConfig::new("postterms", "term_taxonomy_id")
        .target("TermRelationship")
        .source_key("term_taxonomy_id")];
    e.has_one = vec![RelationConfig::new("term", "term_id").target("Term")];
    e
}

fn term_relationship() -> EntityConfig {
    let mut cols = columns(&["object_id", "term_taxonomy_id"], &[]);
    cols.push(ColumnConfig::typed("term_order", INT));
    let mut e = entity("TermRelationship", "term_relationships", "term_taxonomy_id", cols);
    e.has_one = vec![RelationConfig::new("termtaxonomy", "term_taxonomy_id").target("TermTaxonomy")];
    e.belongs_to = vec![RelationConfig::new("post", "object_id")];
    e
}

fn user() -> EntityConfig {
    let mut cols = columns(
        &["ID"],
        &[
            "user_login",
            "user_pass",
            "user_nicename",
            "user_email",
            "user_url",
            "user_registered",
            "user_activation_key",
            "display_name",
        ],
    );
    cols.push(ColumnConfig::typed("user_status", INT));
    let mut e = entity("User", "users", "ID", cols);
    e.sensitive_columns = vec!["user_pass".into(), "user_activation_key".into()];
    e.has_many = vec![
        RelationConfig::new("posts", "post_author")
            .limit(10)
            .conditions(ConditionConfig::fragment("post_status = ?", "publish")),
        RelationConfig::new("comments", "user_id").limit(10),
        RelationConfig::new("meta", "user_id").target("UserMeta"),
    ];
    e
}

fn user_meta() -> EntityConfig {
    let mut e = entity(
        "UserMeta",
        "usermeta",
        "umeta_id",
        columns(&["umeta_id", "user_id"], &["meta_key", "meta_value"]),
    );
    e.belongs_to = vec![RelationConfig::new("user", "user_id").target("User")];
    e
}

/// Declarations for every WordPress core table plus the `Category` and `Tag` term views.
pub fn schema(table_prefix: &str) -> FullConfig {
    FullConfig {
        table_prefix: table_prefix.to_string(),
        entities: vec![
            term_relationship(),
            term_taxonomy(),
            post(),
            post_meta(),
            comment(),
            term(),
            taxonomy_view("Category", "category"),
            taxonomy_view("Tag", "post_tag"),
            user(),
            user_meta(),
        ],
    }
}

/// Validated, resolved WordPress model for `table_prefix`.
pub fn model(table_prefix: &str) -> Result<ResolvedModel, ConfigError> {
    resolve(&schema(table_prefix))
}
