//! Builds parameterized SELECTs from store reads. Identifiers come from declarations only; values are parameters.

use crate::config::{Clause, ColumnRef};
use crate::store::Select;
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from declarations).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_column(table: &str, column: &str) -> String {
    format!("{}.{}", quoted(table), quoted(column))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Placeholder for a new parameter, cast when the column type is known.
    fn placeholder(&mut self, v: Value, cast: Option<&str>) -> String {
        let n = self.push_param(v);
        match cast {
            Some(t) => format!("${}::{}", n, t),
            None => format!("${}", n),
        }
    }
}

fn column_sql(base_table: &str, column: &ColumnRef) -> String {
    qualified_column(column.table.as_deref().unwrap_or(base_table), &column.name)
}

fn clause_sql(q: &mut QueryBuf, base_table: &str, clause: &Clause) -> String {
    let ph = q.placeholder(clause.value.clone(), clause.cast.as_deref());
    format!("{} {} {}", column_sql(base_table, &clause.column), clause.op.as_sql(), ph)
}

/// SELECT base.* with LEFT JOINs, ANDed WHERE, optional ORDER BY and LIMIT.
pub fn select(select: &Select) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = &select.table;

    let joins: String = select
        .joins
        .iter()
        .map(|j| {
            format!(
                " LEFT JOIN {} ON {} = {}",
                quoted(&j.table),
                qualified_column(table, &j.local_column),
                qualified_column(&j.table, &j.foreign_column)
            )
        })
        .collect();

    let where_parts: Vec<String> = select
        .predicate
        .clauses
        .iter()
        .map(|c| clause_sql(&mut q, table, c))
        .collect();
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    let order_clause = select
        .order
        .as_ref()
        .map(|o| {
            format!(
                " ORDER BY {}{}",
                qualified_column(table, &o.column),
                if o.descending { " DESC" } else { "" }
            )
        })
        .unwrap_or_default();
    let limit_clause = select.limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();

    q.sql = format!(
        "SELECT {}.* FROM {}{}{}{}{}",
        quoted(table),
        quoted(table),
        joins,
        where_clause,
        order_clause,
        limit_clause
    );
    q
}

/// SELECT by primary key. The key is the sole parameter.
pub fn select_by_primary_key(table: &str, primary_key: &str, key: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.placeholder(key.clone(), None);
    q.sql = format!(
        "SELECT * FROM {} WHERE {} = {} LIMIT 1",
        quoted(table),
        quoted(primary_key),
        ph
    );
    q
}
