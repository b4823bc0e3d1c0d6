//! Two-hop derived collections computed in application code.
//!
//! Every record's `via` relation is resolved (one query each, memoized per record), filtered on
//! an attribute of that hop, then projected through `project`. This reads everything and filters
//! in memory; it is only reasonable for the small per-post collections it serves.

use super::Record;
use crate::error::AppError;
use crate::store::values_equal;
use serde_json::Value;

/// For each record, follow `via`, keep it when `via.attribute == expected`, and collect `via.project`.
/// Resolution errors propagate unchanged.
pub fn filter_project<'a>(
    records: &[Record<'a>],
    via: &str,
    attribute: &str,
    expected: &Value,
    project: &str,
) -> Result<Vec<Record<'a>>, AppError> {
    let mut out = Vec::new();
    for record in records {
        let Some(hop) = record.one(via)? else { continue };
        if !hop.get(attribute).is_some_and(|v| values_equal(v, expected)) {
            continue;
        }
        if let Some(projected) = hop.one(project)? {
            out.push(projected);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, ColumnConfig, EntityConfig, FullConfig, RelationConfig, ResolvedModel};
    use crate::service::Session;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn entity(name: &str, table: &str, columns: &[&str]) -> EntityConfig {
        EntityConfig {
            name: name.into(),
            table: Some(table.into()),
            columns: columns.iter().map(|c| ColumnConfig::from(*c)).collect(),
            ..Default::default()
        }
    }

    // Shelf -> slots -> bin (kind) -> item, shaped like post -> postterms -> termtaxonomy -> term.
    fn model() -> ResolvedModel {
        let mut shelf = entity("Shelf", "shelves", &["id"]);
        shelf.has_many.push(RelationConfig::new("slots", "shelf_id"));
        let mut slot = entity("Slot", "slots", &["id", "shelf_id", "bin_id"]);
        slot.belongs_to.push(RelationConfig::new("bin", "bin_id"));
        let mut bin = entity("Bin", "bins", &["id", "kind", "item_id"]);
        bin.belongs_to.push(RelationConfig::new("item", "item_id"));
        let item = entity("Item", "items", &["id", "label"]);
        resolve(&FullConfig {
            table_prefix: String::new(),
            entities: vec![shelf, slot, bin, item],
        })
        .unwrap()
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert("shelves", json!({"id": 1})).unwrap();
        store.insert("items", json!({"id": 7, "label": "book"})).unwrap();
        store.insert("items", json!({"id": 8, "label": "mug"})).unwrap();
        store.insert("bins", json!({"id": 40, "kind": "paper", "item_id": 7})).unwrap();
        store.insert("bins", json!({"id": 41, "kind": "ceramic", "item_id": 8})).unwrap();
        store.insert("bins", json!({"id": 42, "kind": "paper", "item_id": 99})).unwrap();
        for (id, bin) in [(1, 40), (2, 41), (3, 42), (4, 77)] {
            store.insert("slots", json!({"id": id, "shelf_id": 1, "bin_id": bin})).unwrap();
        }
        store
    }

    #[test]
    fn keeps_matching_hops_and_projects() {
        let (model, store) = (model(), store());
        let session = Session::new(&model, &store);
        let slots = session.find("Shelf", 1).unwrap().unwrap().many("slots").unwrap();
        assert_eq!(slots.len(), 4);

        let paper = filter_project(&slots, "bin", "kind", &json!("paper"), "item").unwrap();
        let labels: Vec<_> = paper.iter().filter_map(|r| r.get_str("label")).collect();
        assert_eq!(labels, vec!["book"]);

        let ceramic = filter_project(&slots, "bin", "kind", &json!("ceramic"), "item").unwrap();
        assert_eq!(ceramic.len(), 1);
        assert!(filter_project(&slots, "bin", "kind", &json!("glass"), "item").unwrap().is_empty());
    }

    #[test]
    fn resolver_errors_propagate() {
        let (model, store) = (model(), store());
        let session = Session::new(&model, &store);
        let slots = session.find("Shelf", 1).unwrap().unwrap().many("slots").unwrap();
        let err = filter_project(&slots, "bin", "kind", &json!("paper"), "owner").unwrap_err();
        assert!(matches!(err, AppError::UnknownRelation { ref relation, .. } if relation == "owner"));
    }
}
