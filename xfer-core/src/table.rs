// xfer_core/src/table.rs
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, XferError};

/// Where a stored object lives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// A manifest row, keyed by (id, version).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifestItem {
    pub id: String,
    pub version: u64,
    #[serde(default)]
    pub payload: Value,
}

impl ManifestItem {
    /// Resolve the stored object from `payload.namespace/path`, falling back
    /// to `payload.bucket/key`.
    pub fn payload_location(&self) -> Result<ObjectLocation> {
        let pair = |b: &str, k: &str| -> Option<ObjectLocation> {
            Some(ObjectLocation {
                bucket: self.payload.get(b)?.as_str()?.to_string(),
                key: self.payload.get(k)?.as_str()?.to_string(),
            })
        };
        pair("namespace", "path")
            .or_else(|| pair("bucket", "key"))
            .ok_or_else(|| {
                XferError::Format(format!(
                    "no bucket/key in manifest {} v{}",
                    self.id, self.version
                ))
            })
    }
}

/// A pre-authenticated key-value table client.
pub trait ManifestTable {
    fn get_item(&self, id: &str, version: u64) -> Result<Option<ManifestItem>>;
}

/// Like `get_item`, but a miss is an error naming the id.
pub fn require_item(table: &dyn ManifestTable, id: &str, version: u64) -> Result<ManifestItem> {
    table
        .get_item(id, version)?
        .ok_or_else(|| XferError::MissingRecord {
            id: format!("{id} (version {version})"),
        })
}

#[derive(Clone, Debug, Default)]
pub struct InMemTable {
    items: HashMap<(String, u64), ManifestItem>,
}

impl InMemTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: ManifestItem) {
        self.items.insert((item.id.clone(), item.version), item);
    }

    /// Load a table dump, one JSON item per line.
    pub fn from_jsonl(path: &Path) -> Result<Self> {
        let mut table = Self::new();
        let f = File::open(path)?;
        for (lineno, line) in BufReader::new(f).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let item: ManifestItem = serde_json::from_str(&line).map_err(|e| {
                XferError::Format(format!("{}:{}: {e}", path.display(), lineno + 1))
            })?;
            table.insert(item);
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ManifestTable for InMemTable {
    fn get_item(&self, id: &str, version: u64) -> Result<Option<ManifestItem>> {
        Ok(self.items.get(&(id.to_string(), version)).cloned())
    }
}
