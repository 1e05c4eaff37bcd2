use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{Result, XferError};
use crate::index::{DocumentIndex, Hit, Query, merge_json};

/// Documents of one index, in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Collection {
    pub docs: Vec<Hit>,
}

impl Collection {
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.docs.iter().find(|h| h.id == id).map(|h| &h.source)
    }

    pub fn upsert(&mut self, id: &str, doc: Value) {
        match self.docs.iter_mut().find(|h| h.id == id) {
            Some(hit) => hit.source = doc,
            None => self.docs.push(Hit {
                id: id.to_string(),
                source: doc,
            }),
        }
    }

    pub fn merge(&mut self, index: &str, id: &str, partial: &Map<String, Value>) -> Result<()> {
        let hit = self
            .docs
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or_else(|| XferError::MissingRecord {
                id: format!("{index}/{id}"),
            })?;
        merge_json(&mut hit.source, &Value::Object(partial.clone()));
        Ok(())
    }

    pub fn matching<'a>(&'a self, query: &'a Query) -> impl Iterator<Item = &'a Hit> + 'a {
        self.docs.iter().filter(move |h| query.matches(&h.source))
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemIndex {
    pub by_index: BTreeMap<String, Collection>,
}

impl InMemIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an index with documents, ids taken from `id_of`.
    pub fn with_docs<I, F>(mut self, index: &str, docs: I, id_of: F) -> Self
    where
        I: IntoIterator<Item = Value>,
        F: Fn(usize, &Value) -> String,
    {
        let coll = self.by_index.entry(index.to_string()).or_default();
        for (i, doc) in docs.into_iter().enumerate() {
            let id = id_of(i, &doc);
            coll.upsert(&id, doc);
        }
        self
    }
}

impl DocumentIndex for InMemIndex {
    fn scan(&self, index: &str, query: &Query) -> Result<Vec<Hit>> {
        Ok(self
            .by_index
            .get(index)
            .map(|c| c.matching(query).cloned().collect())
            .unwrap_or_default())
    }

    fn count(&self, index: &str, query: &Query) -> Result<u64> {
        Ok(self
            .by_index
            .get(index)
            .map(|c| c.matching(query).count() as u64)
            .unwrap_or(0))
    }

    fn get(&self, index: &str, id: &str) -> Result<Option<Value>> {
        Ok(self.by_index.get(index).and_then(|c| c.get(id)).cloned())
    }

    fn put(&mut self, index: &str, id: &str, doc: &Value) -> Result<()> {
        self.by_index
            .entry(index.to_string())
            .or_default()
            .upsert(id, doc.clone());
        Ok(())
    }

    fn update(&mut self, index: &str, id: &str, partial: &Map<String, Value>) -> Result<()> {
        match self.by_index.get_mut(index) {
            Some(c) => c.merge(index, id, partial),
            None => Err(XferError::MissingRecord {
                id: format!("{index}/{id}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scan_filters_and_keeps_insertion_order() {
        let idx = InMemIndex::new().with_docs(
            "decisions",
            vec![json!({"k": "z"}), json!({"k": "a", "skip": true}), json!({"k": "m"})],
            |i, _| i.to_string(),
        );
        let hits = idx.scan("decisions", &Query::not_skipped()).unwrap();
        let keys: Vec<_> = hits.iter().map(|h| h.source["k"].clone()).collect();
        assert_eq!(keys, vec![json!("z"), json!("m")]);
        assert_eq!(idx.count("decisions", &Query::MatchAll).unwrap(), 3);
        assert_eq!(idx.count("other", &Query::MatchAll).unwrap(), 0);
    }

    #[test]
    fn update_of_unknown_id_is_missing_record() {
        let mut idx = InMemIndex::new();
        idx.put("chunks", "x/a", &json!({"a": 1})).unwrap();
        let err = idx.update("chunks", "x/b", &Map::new()).unwrap_err();
        assert!(matches!(err, XferError::MissingRecord { id } if id == "chunks/x/b"));
    }

    #[test]
    fn put_replaces_in_place() {
        let mut idx = InMemIndex::new();
        idx.put("chunks", "1", &json!({"v": 1})).unwrap();
        idx.put("chunks", "2", &json!({"v": 2})).unwrap();
        idx.put("chunks", "1", &json!({"v": 3})).unwrap();
        let hits = idx.scan("chunks", &Query::MatchAll).unwrap();
        assert_eq!(hits[0].source, json!({"v": 3}));
        assert_eq!(hits.len(), 2);
    }
}
