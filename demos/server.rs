//! Demo server: built-in WordPress schema (or SCHEMA_PATH declarations), PostgreSQL when
//! DATABASE_URL is set, otherwise a small seeded in-memory store. Mounts the example routes.
//!
//! Run: `cargo run --example server`, then GET /swpmvc/post/1 or /swpmvc/hello/there/you

use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use wpmvc::{app_router, load_from_path, resolve, wordpress, AppState, MemoryStore, PgStore, Settings, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wpmvc=info")))
        .init();

    let settings = Settings::from_env();
    let model = match &settings.schema_path {
        Some(path) => resolve(&load_from_path(path)?)?,
        None => wordpress::model(&settings.table_prefix)?,
    };

    let store: Arc<dyn Store> = match &settings.database_url {
        Some(url) => Arc::new(PgStore::connect(url).await?),
        None => {
            tracing::info!("DATABASE_URL not set; serving the in-memory demo store");
            Arc::new(demo_store(&model.table_prefix)?)
        }
    };

    let state = AppState::with_example(model, store)?;
    let app = app_router(state);

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn demo_store(prefix: &str) -> Result<MemoryStore, wpmvc::AppError> {
    let store = MemoryStore::new();
    let t = |name: &str| format!("{}{}", prefix, name);
    store.insert(
        &t("users"),
        json!({"ID": 1, "user_login": "admin", "user_pass": "$P$demo", "display_name": "Admin", "user_activation_key": ""}),
    )?;
    store.insert(
        &t("posts"),
        json!({
            "ID": 1,
            "post_author": 1,
            "post_title": "Hello world!",
            "post_content": "Welcome to WordPress.\n\nThis is your first post.",
            "post_status": "publish",
            "post_type": "post"
        }),
    )?;
    store.insert(&t("terms"), json!({"term_id": 1, "name": "Uncategorized", "slug": "uncategorized"}))?;
    store.insert(&t("terms"), json!({"term_id": 2, "name": "welcome", "slug": "welcome"}))?;
    store.insert(&t("term_taxonomy"), json!({"term_taxonomy_id": 1, "term_id": 1, "taxonomy": "category"}))?;
    store.insert(&t("term_taxonomy"), json!({"term_taxonomy_id": 2, "term_id": 2, "taxonomy": "post_tag"}))?;
    store.insert(&t("term_relationships"), json!({"object_id": 1, "term_taxonomy_id": 1}))?;
    store.insert(&t("term_relationships"), json!({"object_id": 1, "term_taxonomy_id": 2}))?;
    store.insert(
        &t("comments"),
        json!({"comment_ID": 1, "comment_post_ID": 1, "comment_parent": 0, "user_id": 0, "comment_content": "Hi, this is a comment."}),
    )?;
    Ok(store)
}
