//! Request-scoped lazy relationship resolution.
//!
//! A [`Session`] pairs the resolved model with a store for the lifetime of one request.
//! Every row it fetches becomes a [`Record`]: a cheap handle to one instance whose relations
//! are unresolved until first accessed. The first access issues exactly one store call and
//! memoizes the result on the instance; later accesses (through any clone of the handle)
//! reuse it. Records are `!Send` and must not outlive or leave the request.

use crate::config::{Clause, ColumnRef, CompareOp, Predicate, RelationDef, RelationKind, ResolvedEntity, ResolvedModel};
use crate::error::AppError;
use crate::store::{Row, Select, Store};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Clone, Copy)]
pub struct Session<'a> {
    model: &'a ResolvedModel,
    store: &'a dyn Store,
}

impl<'a> Session<'a> {
    pub fn new(model: &'a ResolvedModel, store: &'a dyn Store) -> Self {
        Session { model, store }
    }

    pub fn model(&self) -> &'a ResolvedModel {
        self.model
    }

    pub fn entity(&self, name: &str) -> Result<&'a ResolvedEntity, AppError> {
        self.model
            .entity(name)
            .ok_or_else(|| AppError::UnknownEntity(name.to_string()))
    }

    /// Fetch one record by primary key, honoring the entity's scope.
    pub fn find(&self, entity: &str, key: impl Into<Value>) -> Result<Option<Record<'a>>, AppError> {
        let entity = self.entity(entity)?;
        let Some(key) = coerce_key(entity, &entity.primary_key, key.into()) else {
            return Ok(None);
        };
        let row = if entity.is_scoped() {
            let select = Select::from_entity(entity)
                .filter(key_clause(entity, &entity.primary_key, key))
                .limit(Some(1));
            self.store.query(&select)?.into_iter().next()
        } else {
            self.store
                .get_by_primary_key(&entity.table_name, &entity.primary_key, &key)?
        };
        Ok(row.map(|r| self.record(entity, r)))
    }

    /// Fetch records matching `predicate` (ANDed with the entity's scope).
    pub fn all(&self, entity: &str, predicate: &Predicate, limit: Option<u32>) -> Result<Vec<Record<'a>>, AppError> {
        let entity = self.entity(entity)?;
        let select = Select::from_entity(entity).and(predicate).limit(limit);
        let rows = self.store.query(&select)?;
        Ok(rows.into_iter().map(|r| self.record(entity, r)).collect())
    }

    /// Wrap an already fetched row.
    pub fn record(&self, entity: &'a ResolvedEntity, row: Row) -> Record<'a> {
        Record {
            inner: Rc::new(RecordInner {
                session: *self,
                entity,
                row,
                relations: RefCell::new(HashMap::new()),
            }),
        }
    }
}

fn is_integer_type(pg_type: &str) -> bool {
    matches!(
        pg_type.to_ascii_lowercase().as_str(),
        "bigint" | "int8" | "integer" | "int" | "int4" | "smallint" | "int2" | "bigserial" | "serial"
    )
}

/// Numeric strings (path parameters) become numbers for integer key columns.
/// `None` when the key cannot match an integer column at all.
fn coerce_key(entity: &ResolvedEntity, column: &str, key: Value) -> Option<Value> {
    let integer = entity.column_type(column).is_some_and(is_integer_type);
    match key {
        Value::String(s) if integer => s.trim().parse::<i64>().ok().map(|n| Value::Number(n.into())),
        other => Some(other),
    }
}

fn key_clause(entity: &ResolvedEntity, column: &str, value: Value) -> Clause {
    Clause {
        column: ColumnRef::bare(column),
        op: CompareOp::Eq,
        value,
        cast: entity.column_type(column).map(str::to_string),
    }
}

/// A resolved relation: zero-or-one record, or a sequence.
#[derive(Clone, Debug)]
pub enum Related<'a> {
    One(Option<Record<'a>>),
    Many(Vec<Record<'a>>),
}

impl<'a> Related<'a> {
    pub fn first(self) -> Option<Record<'a>> {
        match self {
            Related::One(r) => r,
            Related::Many(v) => v.into_iter().next(),
        }
    }

    pub fn into_records(self) -> Vec<Record<'a>> {
        match self {
            Related::One(r) => r.into_iter().collect(),
            Related::Many(v) => v,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Related::One(r) => usize::from(r.is_some()),
            Related::Many(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct RecordInner<'a> {
    session: Session<'a>,
    entity: &'a ResolvedEntity,
    row: Row,
    relations: RefCell<HashMap<&'a str, Related<'a>>>,
}

/// Handle to one fetched row. Clones share the instance and its relation memo.
#[derive(Clone)]
pub struct Record<'a> {
    inner: Rc<RecordInner<'a>>,
}

impl std::fmt::Debug for Record<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("entity", &self.inner.entity.name)
            .field("row", &self.inner.row)
            .finish()
    }
}

impl<'a> Record<'a> {
    pub fn entity(&self) -> &'a ResolvedEntity {
        self.inner.entity
    }

    pub fn row(&self) -> &Row {
        &self.inner.row
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.inner.row.get(column)
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    pub fn primary_key(&self) -> Option<&Value> {
        self.get(&self.inner.entity.primary_key)
    }

    /// Whether `relation` has already been resolved on this instance.
    pub fn is_loaded(&self, relation: &str) -> bool {
        self.inner.relations.borrow().contains_key(relation)
    }

    /// Resolve `name`, issuing one store call on first access and reusing the result afterwards.
    pub fn related(&self, name: &str) -> Result<Related<'a>, AppError> {
        let entity = self.inner.entity;
        let rel = entity.relation(name).ok_or_else(|| AppError::UnknownRelation {
            entity: entity.name.clone(),
            relation: name.to_string(),
        })?;

        let cached = self.inner.relations.borrow().get(name).cloned();
        if let Some(hit) = cached {
            tracing::trace!(entity = %entity.name, relation = %name, "relation memo hit");
            return Ok(hit);
        }

        tracing::trace!(entity = %entity.name, relation = %name, kind = ?rel.kind, target = %rel.target, "resolving relation");
        let resolved = self.resolve(rel)?;
        self.inner
            .relations
            .borrow_mut()
            .insert(rel.name.as_str(), resolved.clone());
        Ok(resolved)
    }

    /// Singular access: the belongs_to/has_one record, or the first of a has_many.
    pub fn one(&self, name: &str) -> Result<Option<Record<'a>>, AppError> {
        Ok(self.related(name)?.first())
    }

    pub fn many(&self, name: &str) -> Result<Vec<Record<'a>>, AppError> {
        Ok(self.related(name)?.into_records())
    }

    /// Row as JSON with sensitive columns removed.
    pub fn to_json(&self) -> Value {
        let sensitive = &self.inner.entity.sensitive_columns;
        Value::Object(
            self.inner
                .row
                .iter()
                .filter(|(k, _)| !sensitive.contains(k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    fn resolve(&self, rel: &'a RelationDef) -> Result<Related<'a>, AppError> {
        let session = self.inner.session;
        let target = session.entity(&rel.target)?;
        match rel.kind {
            RelationKind::BelongsTo => {
                let Some(fk) = self.get(&rel.foreign_key).filter(|v| !v.is_null()).cloned() else {
                    return Ok(Related::One(None));
                };
                let row = if rel.conditions.is_empty() && !target.is_scoped() {
                    session
                        .store
                        .get_by_primary_key(&target.table_name, &target.primary_key, &fk)?
                } else {
                    let select = Select::from_entity(target)
                        .filter(key_clause(target, &target.primary_key, fk))
                        .and(&rel.conditions)
                        .limit(Some(1));
                    session.store.query(&select)?.into_iter().next()
                };
                Ok(Related::One(row.map(|r| session.record(target, r))))
            }
            RelationKind::HasOne | RelationKind::HasMany => {
                let key = self.get(&rel.source_key).filter(|v| !v.is_null()).cloned();
                let rows = match key {
                    Some(key) => {
                        let select = Select::from_entity(target)
                            .filter(key_clause(target, &rel.foreign_key, key))
                            .and(&rel.conditions)
                            .limit(rel.effective_limit())
                            .order(rel.order.clone());
                        session.store.query(&select)?
                    }
                    None => Vec::new(),
                };
                let mut records = rows.into_iter().map(|r| session.record(target, r));
                Ok(match rel.kind {
                    RelationKind::HasOne => Related::One(records.next()),
                    _ => Related::Many(records.collect()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, ColumnConfig, ConditionConfig, EntityConfig, FullConfig, RelationConfig};
    use crate::store::MemoryStore;
    use serde_json::json;

    fn entity(name: &str, table: &str, pk: &str, columns: &[&str]) -> EntityConfig {
        EntityConfig {
            name: name.into(),
            table: Some(table.into()),
            primary_key: Some(pk.into()),
            columns: columns.iter().map(|c| ColumnConfig::typed(c, "bigint")).collect(),
            ..Default::default()
        }
    }

    fn model() -> ResolvedModel {
        let mut author = entity("Author", "authors", "id", &["id", "name", "secret"]);
        author.sensitive_columns = vec!["secret".into()];
        author.has_many.push(
            RelationConfig::new("books", "author_id")
                .limit(2)
                .order("id", false),
        );
        author.has_many.push(
            RelationConfig::new("drafts", "author_id")
                .target("Book")
                .conditions(ConditionConfig::fragment("published = ?", 0)),
        );
        author.has_one.push(RelationConfig::new("profile", "author_id"));
        author.has_one.push(
            RelationConfig::new("latest_book", "author_id")
                .target("Book")
                .order("id", true),
        );
        let mut book = entity("Book", "books", "id", &["id", "author_id", "published"]);
        book.belongs_to.push(RelationConfig::new("author", "author_id"));
        let profile = entity("Profile", "profiles", "id", &["id", "author_id"]);
        resolve(&FullConfig {
            table_prefix: "t_".into(),
            entities: vec![author, book, profile],
        })
        .unwrap()
    }

    fn store() -> MemoryStore {
        let s = MemoryStore::new();
        s.insert("t_authors", json!({"id": 1, "name": "Ann", "secret": "x"})).unwrap();
        s.insert("t_authors", json!({"id": 2, "name": "Bob", "secret": "y"})).unwrap();
        for (id, published) in [(13, 1), (11, 1), (12, 0)] {
            s.insert("t_books", json!({"id": id, "author_id": 1, "published": published}))
                .unwrap();
        }
        s.insert("t_books", json!({"id": 20, "author_id": 999, "published": 1})).unwrap();
        s.insert("t_books", json!({"id": 21, "author_id": null, "published": 1})).unwrap();
        s.insert("t_profiles", json!({"id": 5, "author_id": 1})).unwrap();
        s
    }

    #[test]
    fn belongs_to_dangling_key_is_absent_not_error() {
        let (model, store) = (model(), store());
        let session = Session::new(&model, &store);
        let orphan = session.find("Book", 20).unwrap().unwrap();
        assert!(orphan.one("author").unwrap().is_none());
        let null_fk = session.find("Book", 21).unwrap().unwrap();
        let before = store.lookups();
        assert!(null_fk.one("author").unwrap().is_none());
        assert_eq!(store.lookups(), before);
    }

    #[test]
    fn has_many_honors_cap_and_order() {
        let (model, store) = (model(), store());
        let session = Session::new(&model, &store);
        let ann = session.find("Author", "1").unwrap().unwrap();
        let books = ann.many("books").unwrap();
        let ids: Vec<_> = books.iter().map(|b| b.get("id").cloned().unwrap()).collect();
        assert_eq!(ids, vec![json!(11), json!(12)]);
    }

    #[test]
    fn has_many_applies_conditions() {
        let (model, store) = (model(), store());
        let session = Session::new(&model, &store);
        let ann = session.find("Author", 1).unwrap().unwrap();
        let drafts = ann.many("drafts").unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].get("id"), Some(&json!(12)));
    }

    #[test]
    fn has_many_without_rows_is_empty() {
        let (model, store) = (model(), store());
        let session = Session::new(&model, &store);
        let bob = session.find("Author", 2).unwrap().unwrap();
        assert!(bob.many("books").unwrap().is_empty());
        assert!(bob.one("profile").unwrap().is_none());
    }

    #[test]
    fn has_one_returns_single_record() {
        let (model, store) = (model(), store());
        let session = Session::new(&model, &store);
        let ann = session.find("Author", 1).unwrap().unwrap();
        let profile = ann.related("profile").unwrap();
        assert!(matches!(profile, Related::One(Some(_))));
        assert_eq!(profile.len(), 1);
    }

    #[test]
    fn has_one_caps_to_top_ordered_row() {
        let (model, store) = (model(), store());
        let session = Session::new(&model, &store);
        let ann = session.find("Author", 1).unwrap().unwrap();
        let latest = ann.related("latest_book").unwrap();
        assert_eq!(latest.len(), 1);
        let book = latest.first().unwrap();
        assert_eq!(book.get("id"), Some(&json!(13)));
    }

    #[test]
    fn second_resolution_is_memoized() {
        let (model, store) = (model(), store());
        let session = Session::new(&model, &store);
        let ann = session.find("Author", 1).unwrap().unwrap();
        let before = store.lookups();
        assert!(!ann.is_loaded("books"));
        ann.many("books").unwrap();
        assert!(ann.is_loaded("books"));
        let alias = ann.clone();
        alias.many("books").unwrap();
        assert_eq!(store.lookups(), before + 1);
    }

    #[test]
    fn unknown_relation_fails_without_store_call() {
        let (model, store) = (model(), store());
        let session = Session::new(&model, &store);
        let ann = session.find("Author", 1).unwrap().unwrap();
        let before = store.lookups();
        let err = ann.related("bogus").unwrap_err();
        assert!(matches!(err, AppError::UnknownRelation { ref relation, .. } if relation == "bogus"));
        assert_eq!(store.lookups(), before);
    }

    #[test]
    fn cycles_resolve_hop_by_hop() {
        let (model, store) = (model(), store());
        let session = Session::new(&model, &store);
        let book = session.find("Book", 11).unwrap().unwrap();
        let author = book.one("author").unwrap().unwrap();
        let again = author.many("books").unwrap();
        assert!(again.iter().any(|b| b.get("id") == Some(&json!(11))));
    }

    #[test]
    fn to_json_strips_sensitive_columns() {
        let (model, store) = (model(), store());
        let session = Session::new(&model, &store);
        let ann = session.find("Author", 1).unwrap().unwrap();
        let json = ann.to_json();
        assert_eq!(json["name"], json!("Ann"));
        assert!(json.get("secret").is_none());
    }

    #[test]
    fn non_numeric_key_on_integer_column_finds_nothing() {
        let (model, store) = (model(), store());
        let session = Session::new(&model, &store);
        let before = store.lookups();
        assert!(session.find("Author", "abc").unwrap().is_none());
        assert_eq!(store.lookups(), before);
    }

    #[test]
    fn unknown_entity_is_reported() {
        let (model, store) = (model(), store());
        let session = Session::new(&model, &store);
        assert!(matches!(session.find("Nope", 1), Err(AppError::UnknownEntity(_))));
    }
}
