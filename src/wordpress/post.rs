//! Post helpers: term collections by taxonomy, rendered content and editable fields.

use crate::error::AppError;
use crate::filters::{FilterPipeline, THE_CONTENT};
use crate::service::{filter_project, Record};
use serde::Serialize;
use serde_json::Value;

pub const TAG_TAXONOMY: &str = "post_tag";
pub const CATEGORY_TAXONOMY: &str = "category";

fn terms_in<'a>(post: &Record<'a>, taxonomy: &str) -> Result<Vec<Record<'a>>, AppError> {
    let postterms = post.many("postterms")?;
    filter_project(
        &postterms,
        "termtaxonomy",
        "taxonomy",
        &Value::from(taxonomy),
        "term",
    )
}

/// Terms attached to `post` in the `post_tag` taxonomy.
pub fn tags<'a>(post: &Record<'a>) -> Result<Vec<Record<'a>>, AppError> {
    terms_in(post, TAG_TAXONOMY)
}

/// Terms attached to `post` in the `category` taxonomy.
pub fn categories<'a>(post: &Record<'a>) -> Result<Vec<Record<'a>>, AppError> {
    terms_in(post, CATEGORY_TAXONOMY)
}

/// `post_content` run through the `the_content` filters. A missing body renders as empty input.
pub fn render_content(post: &Record<'_>, filters: &FilterPipeline) -> String {
    let body = post.get_str("post_content").unwrap_or_default();
    filters.apply_filter(THE_CONTENT, body)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Input,
    Textarea,
}

/// Form metadata for one editable post field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Control {
    pub field: &'static str,
    #[serde(rename = "type")]
    pub kind: ControlKind,
    pub label: &'static str,
}

pub fn post_controls() -> Vec<Control> {
    vec![
        Control {
            field: "post_title",
            kind: ControlKind::Input,
            label: "Title",
        },
        Control {
            field: "post_content",
            kind: ControlKind::Textarea,
            label: "Content",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::Session;
    use crate::store::MemoryStore;
    use crate::wordpress::model;
    use serde_json::json;

    fn store() -> MemoryStore {
        let s = MemoryStore::new();
        s.insert("wp_posts", json!({"ID": 1, "post_author": 1, "post_content": "Hello\n\nWorld", "post_status": "publish"}))
            .unwrap();
        s.insert("wp_terms", json!({"term_id": 3, "name": "News", "slug": "news"})).unwrap();
        s.insert("wp_terms", json!({"term_id": 4, "name": "rust", "slug": "rust"})).unwrap();
        s.insert("wp_term_taxonomy", json!({"term_taxonomy_id": 30, "term_id": 3, "taxonomy": "category"}))
            .unwrap();
        s.insert("wp_term_taxonomy", json!({"term_taxonomy_id": 40, "term_id": 4, "taxonomy": "post_tag"}))
            .unwrap();
        s.insert("wp_term_relationships", json!({"object_id": 1, "term_taxonomy_id": 30})).unwrap();
        s.insert("wp_term_relationships", json!({"object_id": 1, "term_taxonomy_id": 40})).unwrap();
        s
    }

    #[test]
    fn tags_and_categories_split_by_taxonomy() {
        let (model, store) = (model("wp_").unwrap(), store());
        let session = Session::new(&model, &store);
        let post = session.find("Post", 1).unwrap().unwrap();
        let tags: Vec<_> = tags(&post).unwrap().iter().map(|t| t.get("name").cloned()).collect();
        let cats: Vec<_> = categories(&post).unwrap().iter().map(|t| t.get("name").cloned()).collect();
        assert_eq!(tags, vec![Some(json!("rust"))]);
        assert_eq!(cats, vec![Some(json!("News"))]);
    }

    #[test]
    fn render_content_applies_the_content() {
        let (model, store) = (model("wp_").unwrap(), store());
        let session = Session::new(&model, &store);
        let post = session.find("Post", 1).unwrap().unwrap();
        assert_eq!(
            render_content(&post, &FilterPipeline::wordpress_defaults()),
            "<p>Hello</p>\n<p>World</p>\n"
        );
        assert_eq!(render_content(&post, &FilterPipeline::new()), "Hello\n\nWorld");
    }

    #[test]
    fn controls_describe_title_and_body() {
        let controls = serde_json::to_value(post_controls()).unwrap();
        assert_eq!(
            controls,
            json!([
                {"field": "post_title", "type": "input", "label": "Title"},
                {"field": "post_content", "type": "textarea", "label": "Content"}
            ])
        );
    }
}
