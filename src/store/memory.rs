//! In-memory store for tests and the demo server. Counts every lookup it answers.

use super::{compare_values, values_equal, Row, Select, Store};
use crate::config::{Clause, CompareOp, Join};
use crate::error::AppError;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    lookups: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row; `row` must be a JSON object.
    pub fn insert(&self, table: &str, row: Value) -> Result<(), AppError> {
        let Value::Object(row) = row else {
            return Err(AppError::BadRequest(format!("row for {} must be a JSON object", table)));
        };
        self.tables
            .write()
            .map_err(|_| poisoned())?
            .entry(table.to_string())
            .or_default()
            .push(row);
        Ok(())
    }

    /// Number of `query`/`get_by_primary_key` calls answered so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(AtomicOrdering::SeqCst)
    }

    fn count(&self) {
        self.lookups.fetch_add(1, AtomicOrdering::SeqCst);
    }
}

fn poisoned() -> AppError {
    AppError::StoreUnavailable("memory store lock poisoned".into())
}

fn clause_matches(clause: &Clause, base_table: &str, row: &Row, joins: &[Join], joined: &[Option<&Row>]) -> bool {
    let cell = match clause.column.table.as_deref() {
        None => row.get(&clause.column.name),
        Some(t) if t == base_table => row.get(&clause.column.name),
        Some(t) => joins
            .iter()
            .position(|j| j.table == t)
            .and_then(|i| joined[i])
            .and_then(|r| r.get(&clause.column.name)),
    };
    let Some(cell) = cell else { return false };
    let Some(ord) = compare_values(cell, &clause.value) else {
        return false;
    };
    match clause.op {
        CompareOp::Eq => ord == Ordering::Equal,
        CompareOp::Ne => ord != Ordering::Equal,
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::Le => ord != Ordering::Greater,
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::Ge => ord != Ordering::Less,
    }
}

fn any_combination<'r>(
    candidates: &[Vec<Option<&'r Row>>],
    current: &mut Vec<Option<&'r Row>>,
    accept: &dyn Fn(&[Option<&'r Row>]) -> bool,
) -> bool {
    let Some((first, rest)) = candidates.split_first() else {
        return accept(current);
    };
    for candidate in first {
        current.push(*candidate);
        let found = any_combination(rest, current, accept);
        current.pop();
        if found {
            return true;
        }
    }
    false
}

impl Store for MemoryStore {
    /// A base row is kept once when any combination of its LEFT JOINed rows satisfies the predicate.
    /// Rows keep insertion order unless ordered.
    fn query(&self, select: &Select) -> Result<Vec<Row>, AppError> {
        self.count();
        tracing::debug!(table = %select.table, clauses = select.predicate.clauses.len(), limit = ?select.limit, "memory query");
        let tables = self.tables.read().map_err(|_| poisoned())?;
        let Some(base) = tables.get(&select.table) else {
            return Ok(Vec::new());
        };

        let mut out: Vec<Row> = Vec::new();
        for row in base {
            // Every matching joined row per join; a join without matches contributes one null-extended slot.
            let candidates: Vec<Vec<Option<&Row>>> = select
                .joins
                .iter()
                .map(|j| {
                    let matches: Vec<Option<&Row>> = match (row.get(&j.local_column), tables.get(&j.table)) {
                        (Some(local), Some(rows)) => rows
                            .iter()
                            .filter(|r| r.get(&j.foreign_column).is_some_and(|v| values_equal(local, v)))
                            .map(Some)
                            .collect(),
                        _ => Vec::new(),
                    };
                    if matches.is_empty() {
                        vec![None]
                    } else {
                        matches
                    }
                })
                .collect();
            let satisfied = any_combination(&candidates, &mut Vec::with_capacity(candidates.len()), &|joined| {
                select
                    .predicate
                    .clauses
                    .iter()
                    .all(|c| clause_matches(c, &select.table, row, &select.joins, joined))
            });
            if satisfied {
                out.push(row.clone());
            }
        }

        if let Some(order) = &select.order {
            out.sort_by(|a, b| {
                let ord = match (a.get(&order.column), b.get(&order.column)) {
                    (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                    _ => Ordering::Equal,
                };
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        if let Some(limit) = select.limit {
            out.truncate(limit as usize);
        }
        Ok(out)
    }

    fn get_by_primary_key(&self, table: &str, primary_key: &str, key: &Value) -> Result<Option<Row>, AppError> {
        self.count();
        tracing::debug!(table = %table, primary_key = %primary_key, key = %key, "memory lookup");
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.get(table).and_then(|rows| {
            rows.iter()
                .find(|r| r.get(primary_key).is_some_and(|v| values_equal(v, key)))
                .cloned()
        }))
    }

    fn ping(&self) -> Result<(), AppError> {
        self.tables.read().map(|_| ()).map_err(|_| poisoned())
    }
}
