// xfer_core/src/index/mod.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// One stored document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source")]
    pub source: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Query {
    MatchAll,
    MustNotTerm { field: String, value: Value },
}

impl Query {
    /// Decisions still eligible for chunking.
    pub fn not_skipped() -> Self {
        Query::MustNotTerm {
            field: "skip".to_string(),
            value: Value::Bool(true),
        }
    }

    /// Search DSL form of the query.
    pub fn to_json(&self) -> Value {
        match self {
            Query::MatchAll => serde_json::json!({ "match_all": {} }),
            Query::MustNotTerm { field, value } => {
                let mut term = Map::new();
                term.insert(field.clone(), value.clone());
                serde_json::json!({ "bool": { "must_not": [{ "term": term }] } })
            }
        }
    }

    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Query::MatchAll => true,
            Query::MustNotTerm { field, value } => doc.get(field) != Some(value),
        }
    }
}

/// A pre-authenticated search index client.
pub trait DocumentIndex: Send {
    /// Every matching document, in stored order.
    fn scan(&self, index: &str, query: &Query) -> Result<Vec<Hit>>;

    fn count(&self, index: &str, query: &Query) -> Result<u64>;

    fn get(&self, index: &str, id: &str) -> Result<Option<Value>>;

    fn put(&mut self, index: &str, id: &str, doc: &Value) -> Result<()>;

    /// Partial merge into an existing document; last writer wins.
    fn update(&mut self, index: &str, id: &str, partial: &Map<String, Value>) -> Result<()>;
}

/// Deep-merge `patch` into `target` the way a partial document update does:
/// objects merge key by key, anything else replaces.
pub fn merge_json(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(t), Value::Object(p)) => {
            for (k, v) in p {
                match t.get_mut(k) {
                    Some(existing) => merge_json(existing, v),
                    None => {
                        t.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (t, p) => *t = p.clone(),
    }
}

pub mod inmem;
pub mod jsonl;
#[cfg(feature = "elastic")]
pub mod elastic;
