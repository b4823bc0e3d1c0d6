//! Resolved entity model: declarations validated and flattened into typed relationship descriptors.

use crate::config::CompareOp;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Kind of a declared relationship.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Owns one: target.foreign_key = owner.source_key, capped to one row.
    HasOne,
    /// Owns many: target.foreign_key = owner.source_key.
    HasMany,
    /// Belongs to one: target.primary_key = owner.foreign_key.
    BelongsTo,
}

/// Column reference; `table` is the full (prefixed) table name when qualified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn bare(name: &str) -> Self {
        ColumnRef {
            table: None,
            name: name.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Clause {
    pub column: ColumnRef,
    pub op: CompareOp,
    pub value: Value,
    /// PostgreSQL type the bound parameter is cast to.
    pub cast: Option<String>,
}

/// Conjunction of clauses. Empty matches every row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Predicate {
    pub clauses: Vec<Clause>,
}

impl Predicate {
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn and(mut self, other: &Predicate) -> Self {
        self.clauses.extend(other.clauses.iter().cloned());
        self
    }

    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

/// LEFT JOIN `table` ON owner.`local_column` = `table`.`foreign_column`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Join {
    pub table: String,
    pub local_column: String,
    pub foreign_column: String,
}

#[derive(Clone, Debug)]
pub struct RelationDef {
    pub name: String,
    pub kind: RelationKind,
    pub target: String,
    pub foreign_key: String,
    /// Owner column compared with the target's foreign key (has_one/has_many only).
    pub source_key: String,
    pub conditions: Predicate,
    pub limit: Option<u32>,
    pub order: Option<OrderBy>,
}

impl RelationDef {
    /// Row cap the resolver applies: one for has_one/belongs_to, the declared limit for has_many.
    pub fn effective_limit(&self) -> Option<u32> {
        match self.kind {
            RelationKind::HasMany => self.limit,
            RelationKind::HasOne | RelationKind::BelongsTo => Some(1),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub pg_type: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub name: String,
    pub table_name: String,
    pub primary_key: String,
    pub columns: Vec<ColumnInfo>,
    /// Column names stripped from serialized records.
    pub sensitive_columns: HashSet<String>,
    pub joins: Vec<Join>,
    /// Conditions applied to every query against this entity.
    pub scope: Predicate,
    pub relations: Vec<RelationDef>,
}

impl ResolvedEntity {
    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_type(&self, name: &str) -> Option<&str> {
        self.column(name).and_then(|c| c.pg_type.as_deref())
    }

    pub fn is_scoped(&self) -> bool {
        !self.joins.is_empty() || !self.scope.is_empty()
    }
}

/// Relationship declarations of one entity, grouped by kind.
#[derive(Debug, Default)]
pub struct Declarations<'a> {
    pub owns_one: Vec<&'a RelationDef>,
    pub owns_many: Vec<&'a RelationDef>,
    pub belongs_to: Vec<&'a RelationDef>,
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub table_prefix: String,
    pub entities: Vec<ResolvedEntity>,
    pub entity_by_name: HashMap<String, usize>,
}

impl ResolvedModel {
    pub fn new(table_prefix: String, entities: Vec<ResolvedEntity>) -> Self {
        let entity_by_name = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
        ResolvedModel {
            table_prefix,
            entities,
            entity_by_name,
        }
    }

    pub fn entity(&self, name: &str) -> Option<&ResolvedEntity> {
        self.entity_by_name.get(name).map(|&i| &self.entities[i])
    }

    pub fn declarations(&self, name: &str) -> Option<Declarations<'_>> {
        let entity = self.entity(name)?;
        let mut decl = Declarations::default();
        for rel in &entity.relations {
            match rel.kind {
                RelationKind::HasOne => decl.owns_one.push(rel),
                RelationKind::HasMany => decl.owns_many.push(rel),
                RelationKind::BelongsTo => decl.belongs_to.push(rel),
            }
        }
        Some(decl)
    }
}
