use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::error::{Result, XferError};
use crate::index::inmem::Collection;
use crate::index::{DocumentIndex, Hit, Query};
use crate::util::sanitize::safe_join;

/// File-backed index: `{dir}/{index}.jsonl`, one `{"_id", "_source"}` per line.
///
/// Every write rewrites the file through a temp file, so a crash leaves the
/// previous version intact.
#[derive(Clone, Debug)]
pub struct JsonlIndex {
    dir: PathBuf,
}

impl JsonlIndex {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, index: &str) -> Result<PathBuf> {
        safe_join(&self.dir, &format!("{index}.jsonl"))
    }

    pub fn load(&self, index: &str) -> Result<Collection> {
        let path = self.path_for(index)?;
        read_collection(&path)
    }

    pub fn store(&self, index: &str, coll: &Collection) -> Result<()> {
        let path = self.path_for(index)?;
        fs::create_dir_all(&self.dir)?;
        let tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut w = BufWriter::new(tmp.as_file());
            for hit in &coll.docs {
                serde_json::to_writer(&mut w, hit)?;
                w.write_all(b"\n")?;
            }
            w.flush()?;
        }
        tmp.persist(&path).map_err(|e| XferError::Io(e.error))?;
        Ok(())
    }
}

fn read_collection(path: &Path) -> Result<Collection> {
    let f = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Collection::default()),
        Err(e) => return Err(e.into()),
    };
    let mut coll = Collection::default();
    for (lineno, line) in BufReader::new(f).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let hit: Hit = serde_json::from_str(&line).map_err(|e| {
            XferError::Format(format!("{}:{}: {e}", path.display(), lineno + 1))
        })?;
        coll.upsert(&hit.id, hit.source);
    }
    Ok(coll)
}

impl DocumentIndex for JsonlIndex {
    fn scan(&self, index: &str, query: &Query) -> Result<Vec<Hit>> {
        let coll = self.load(index)?;
        Ok(coll.matching(query).cloned().collect())
    }

    fn count(&self, index: &str, query: &Query) -> Result<u64> {
        let coll = self.load(index)?;
        Ok(coll.matching(query).count() as u64)
    }

    fn get(&self, index: &str, id: &str) -> Result<Option<Value>> {
        Ok(self.load(index)?.get(id).cloned())
    }

    fn put(&mut self, index: &str, id: &str, doc: &Value) -> Result<()> {
        let mut coll = self.load(index)?;
        coll.upsert(id, doc.clone());
        self.store(index, &coll)
    }

    fn update(&mut self, index: &str, id: &str, partial: &Map<String, Value>) -> Result<()> {
        let mut coll = self.load(index)?;
        coll.merge(index, id, partial)?;
        self.store(index, &coll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut idx = JsonlIndex::new(dir.path());
        idx.put("chunks", "x/a", &json!({"group_name": "a"})).unwrap();
        let mut partial = Map::new();
        partial.insert("total_size".into(), json!(42));
        idx.update("chunks", "x/a", &partial).unwrap();

        let reopened = JsonlIndex::new(dir.path());
        assert_eq!(
            reopened.get("chunks", "x/a").unwrap(),
            Some(json!({"group_name": "a", "total_size": 42}))
        );
    }

    #[test]
    fn missing_file_is_an_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let idx = JsonlIndex::new(dir.path());
        assert!(idx.scan("decisions", &Query::MatchAll).unwrap().is_empty());
    }

    #[test]
    fn malformed_line_reports_position() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("decisions.jsonl"),
            "{\"_id\":\"1\",\"_source\":{}}\nnot json\n",
        )
        .unwrap();
        let err = JsonlIndex::new(dir.path())
            .count("decisions", &Query::MatchAll)
            .unwrap_err();
        match err {
            XferError::Format(msg) => assert!(msg.contains("decisions.jsonl:2"), "{msg}"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
