//! Process settings read from the environment (after `.env`, if present).

use crate::config::DEFAULT_TABLE_PREFIX;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Settings {
    /// `DATABASE_URL`; the in-memory demo store is used when unset.
    pub database_url: Option<String>,
    /// `WP_TABLE_PREFIX`, default `wp_`.
    pub table_prefix: String,
    /// `BIND_ADDR`, default `0.0.0.0:3000`.
    pub bind_addr: String,
    /// `SCHEMA_PATH`: JSON declarations replacing the built-in WordPress schema.
    pub schema_path: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Settings {
            database_url: non_empty("DATABASE_URL"),
            table_prefix: lookup("WP_TABLE_PREFIX").unwrap_or_else(|| DEFAULT_TABLE_PREFIX.into()),
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            schema_path: non_empty("SCHEMA_PATH").map(PathBuf::from),
        }
    }
}
