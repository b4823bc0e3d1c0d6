#![allow(dead_code)]

use serde_json::json;
use std::sync::Arc;
use wpmvc::{wordpress, AppState, MemoryStore, ResolvedModel};

pub fn model() -> ResolvedModel {
    wordpress::model("wp_").unwrap()
}

/// One published post (ID 1) by user 7 with two tags, one category, three top-level comments
/// and one reply; a draft (ID 2) by the same user; a post (ID 3) whose author does not exist.
pub fn store() -> MemoryStore {
    let s = MemoryStore::new();
    s.insert(
        "wp_users",
        json!({"ID": 7, "user_login": "editor", "user_pass": "$P$secret", "user_activation_key": "k", "display_name": "Ed"}),
    )
    .unwrap();
    s.insert("wp_usermeta", json!({"umeta_id": 1, "user_id": 7, "meta_key": "nickname", "meta_value": "ed"}))
        .unwrap();
    s.insert(
        "wp_posts",
        json!({"ID": 1, "post_author": 7, "post_title": "First", "post_content": "One\n\nTwo", "post_status": "publish", "post_password": "pw"}),
    )
    .unwrap();
    s.insert(
        "wp_posts",
        json!({"ID": 2, "post_author": 7, "post_title": "Draft", "post_content": "", "post_status": "draft"}),
    )
    .unwrap();
    s.insert(
        "wp_posts",
        json!({"ID": 3, "post_author": 99, "post_title": "Orphan", "post_content": "", "post_status": "publish"}),
    )
    .unwrap();
    s.insert("wp_postmeta", json!({"meta_id": 1, "post_id": 1, "meta_key": "_edit_lock", "meta_value": "1"}))
        .unwrap();

    for (id, name) in [(10, "news"), (11, "rust"), (12, "wordpress")] {
        s.insert("wp_terms", json!({"term_id": id, "name": name, "slug": name})).unwrap();
    }
    for (tt, term, taxonomy) in [(100, 10, "category"), (101, 11, "post_tag"), (102, 12, "post_tag")] {
        s.insert("wp_term_taxonomy", json!({"term_taxonomy_id": tt, "term_id": term, "taxonomy": taxonomy}))
            .unwrap();
        s.insert("wp_term_relationships", json!({"object_id": 1, "term_taxonomy_id": tt})).unwrap();
    }

    for (id, parent) in [(1, 0), (2, 0), (3, 0), (4, 1)] {
        s.insert(
            "wp_comments",
            json!({"comment_ID": id, "comment_post_ID": 1, "comment_parent": parent, "user_id": 7, "comment_author_email": "ed@example.com"}),
        )
        .unwrap();
    }
    s.insert(
        "wp_comments",
        json!({"comment_ID": 5, "comment_post_ID": 2, "comment_parent": 0, "user_id": 0}),
    )
    .unwrap();
    s
}

pub fn state() -> AppState {
    AppState::with_example(model(), Arc::new(store())).unwrap()
}
