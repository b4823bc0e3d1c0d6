//! Row storage capability consumed by the resolver: a relational store answering filtered selects
//! and primary-key lookups.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::config::{Clause, Join, OrderBy, Predicate, ResolvedEntity};
use crate::error::AppError;
use serde_json::Value;
use std::cmp::Ordering;

/// One fetched row, column name to value.
pub type Row = serde_json::Map<String, Value>;

/// A read against one table: optional LEFT JOINs, ANDed clauses, optional order and row cap.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Select {
    pub table: String,
    pub joins: Vec<Join>,
    pub predicate: Predicate,
    pub limit: Option<u32>,
    pub order: Option<OrderBy>,
}

impl Select {
    /// Select from the entity's table with its scope joins and conditions applied.
    pub fn from_entity(entity: &ResolvedEntity) -> Self {
        Select {
            table: entity.table_name.clone(),
            joins: entity.joins.clone(),
            predicate: entity.scope.clone(),
            limit: None,
            order: None,
        }
    }

    pub fn filter(mut self, clause: Clause) -> Self {
        self.predicate.push(clause);
        self
    }

    pub fn and(mut self, predicate: &Predicate) -> Self {
        self.predicate = self.predicate.and(predicate);
        self
    }

    pub fn limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }

    pub fn order(mut self, order: Option<OrderBy>) -> Self {
        self.order = order;
        self
    }
}

/// Relational store. Calls block; implementations must be shareable across request threads.
pub trait Store: Send + Sync {
    fn query(&self, select: &Select) -> Result<Vec<Row>, AppError>;

    fn get_by_primary_key(&self, table: &str, primary_key: &str, key: &Value) -> Result<Option<Row>, AppError>;

    /// Readiness probe.
    fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

enum Scalar<'a> {
    Int(i64),
    Float(f64),
    Text(std::borrow::Cow<'a, str>),
}

fn scalar(v: &Value) -> Option<Scalar<'_>> {
    match v {
        Value::Null => None,
        Value::Bool(b) => Some(Scalar::Int(i64::from(*b))),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => Scalar::Int(i),
            None => Scalar::Float(n.as_f64().unwrap_or(f64::NAN)),
        }),
        Value::String(s) => {
            let t = s.trim();
            if let Ok(i) = t.parse::<i64>() {
                Some(Scalar::Int(i))
            } else if let Ok(f) = t.parse::<f64>() {
                Some(Scalar::Float(f))
            } else {
                Some(Scalar::Text(s.as_str().into()))
            }
        }
        other => Some(Scalar::Text(other.to_string().into())),
    }
}

/// Loose comparison: numbers and numeric strings compare numerically, null compares with nothing.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (scalar(a)?, scalar(b)?) {
        (Scalar::Int(x), Scalar::Int(y)) => Some(x.cmp(&y)),
        (Scalar::Int(x), Scalar::Float(y)) => (x as f64).partial_cmp(&y),
        (Scalar::Float(x), Scalar::Int(y)) => x.partial_cmp(&(y as f64)),
        (Scalar::Float(x), Scalar::Float(y)) => x.partial_cmp(&y),
        (Scalar::Text(x), Scalar::Text(y)) => Some(x.cmp(&y)),
        (Scalar::Text(_), _) | (_, Scalar::Text(_)) => Some(a.to_string().cmp(&b.to_string())).filter(|o| o.is_eq()),
    }
}

pub fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Some(Ordering::Equal)
}
