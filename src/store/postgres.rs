//! PostgreSQL store over sqlx. Calls block the current thread on the captured runtime handle,
//! so they must run on a blocking thread (`spawn_blocking`), never inside an async task.

use super::{Row, Select, Store};
use crate::error::AppError;
use crate::sql::{select, select_by_primary_key, PgBindValue, QueryBuf};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use tokio::runtime::Handle;

pub struct PgStore {
    pool: PgPool,
    handle: Handle,
}

impl PgStore {
    /// Wrap a pool. Must be called from within a Tokio runtime.
    pub fn new(pool: PgPool) -> Result<Self, AppError> {
        let handle = Handle::try_current().map_err(|e| AppError::StoreUnavailable(e.to_string()))?;
        Ok(PgStore { pool, handle })
    }

    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(store_error)?;
        Self::new(pool)
    }

    fn query_many(&self, q: &QueryBuf) -> Result<Vec<Row>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = self.handle.block_on(query.fetch_all(&self.pool)).map_err(store_error)?;
        Ok(rows.iter().map(row_to_map).collect())
    }

    fn query_one(&self, q: &QueryBuf) -> Result<Option<Row>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let row = self.handle.block_on(query.fetch_optional(&self.pool)).map_err(store_error)?;
        Ok(row.as_ref().map(row_to_map))
    }
}

impl Store for PgStore {
    fn query(&self, sel: &Select) -> Result<Vec<Row>, AppError> {
        self.query_many(&select(sel))
    }

    fn get_by_primary_key(&self, table: &str, primary_key: &str, key: &Value) -> Result<Option<Row>, AppError> {
        self.query_one(&select_by_primary_key(table, primary_key, key))
    }

    fn ping(&self) -> Result<(), AppError> {
        self.handle
            .block_on(sqlx::query("SELECT 1").fetch_optional(&self.pool))
            .map_err(store_error)?;
        Ok(())
    }
}

/// Connection-level failures mean the store is unavailable; everything else is a query error.
fn store_error(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => AppError::StoreUnavailable(e.to_string()),
        other => AppError::Db(other),
    }
}

fn row_to_map(row: &PgRow) -> Row {
    use sqlx::Column;
    use sqlx::Row as _;
    let mut map = Row::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row as _;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%d %H:%M:%S").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
