use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::{Chunk, TransferPackage};
use crate::error::{Result, XferError};
use crate::index::{DocumentIndex, Query};

/// Partial update recording a chunk's package.
pub fn package_update(package: &TransferPackage) -> Result<Map<String, Value>> {
    let mut update = Map::new();
    update.insert("transfer_package".to_string(), serde_json::to_value(package)?);
    Ok(update)
}

/// Merge `update` into the stored chunk record. No conflict detection.
pub fn update_chunk_record(
    index: &mut dyn DocumentIndex,
    chunks_index: &str,
    chunk_id: &str,
    update: &Map<String, Value>,
) -> Result<()> {
    index.update(chunks_index, chunk_id, update)?;
    debug!(chunks_index, chunk_id, fields = update.len(), "chunk record updated");
    Ok(())
}

fn parse_chunk(id: &str, source: Value) -> Result<Chunk> {
    serde_json::from_value(source).map_err(|e| XferError::Format(format!("chunk {id}: {e}")))
}

/// Every stored chunk, in stored order.
pub fn get_chunks(index: &dyn DocumentIndex, chunks_index: &str) -> Result<Vec<Chunk>> {
    index
        .scan(chunks_index, &Query::MatchAll)?
        .into_iter()
        .map(|hit| parse_chunk(&hit.id, hit.source))
        .collect()
}

pub fn get_chunk(index: &dyn DocumentIndex, chunks_index: &str, chunk_id: &str) -> Result<Chunk> {
    let source = index
        .get(chunks_index, chunk_id)?
        .ok_or_else(|| XferError::MissingRecord {
            id: format!("{chunks_index}/{chunk_id}"),
        })?;
    parse_chunk(chunk_id, source)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    pub written: usize,
    pub kept: usize,
}

/// Store gathered chunks by id. Records that already carry a package are left
/// alone so a re-gather never drops transfer progress.
pub fn save_chunks(
    index: &mut dyn DocumentIndex,
    chunks_index: &str,
    chunks: &[Chunk],
) -> Result<SaveOutcome> {
    let mut outcome = SaveOutcome::default();
    for chunk in chunks {
        let id = chunk.chunk_id();
        let packaged = index
            .get(chunks_index, &id)?
            .is_some_and(|doc| doc.get("transfer_package").is_some_and(|p| !p.is_null()));
        if packaged {
            warn!(chunk_id = %id, "chunk already packaged; keeping stored record");
            outcome.kept += 1;
            continue;
        }
        index.put(chunks_index, &id, &serde_json::to_value(chunk)?)?;
        outcome.written += 1;
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::inmem::InMemIndex;
    use serde_json::json;

    #[test]
    fn save_keeps_packaged_records() {
        let mut idx = InMemIndex::new();
        let mut a = Chunk::new("a", "x");
        a.s3_keys = vec!["k1".into()];
        let b = Chunk::new("b", "x");
        save_chunks(&mut idx, "chunks", &[a.clone(), b.clone()]).unwrap();

        let pkg = TransferPackage {
            local_location: Some("out/x/a.tar.gz".into()),
            content_length: 9,
            ..Default::default()
        };
        update_chunk_record(&mut idx, "chunks", "x/a", &package_update(&pkg).unwrap()).unwrap();

        a.s3_keys.push("k2".into());
        let outcome = save_chunks(&mut idx, "chunks", &[a, b]).unwrap();
        assert_eq!(outcome, SaveOutcome { written: 1, kept: 1 });

        let stored = get_chunk(&idx, "chunks", "x/a").unwrap();
        assert_eq!(stored.s3_keys, vec!["k1"]);
        assert_eq!(stored.transfer_package, Some(pkg));
    }

    #[test]
    fn unknown_chunk_is_missing_record() {
        let idx = InMemIndex::new();
        assert!(matches!(
            get_chunk(&idx, "chunks", "x/nope"),
            Err(XferError::MissingRecord { .. })
        ));
    }

    #[test]
    fn malformed_chunk_names_its_id() {
        let mut idx = InMemIndex::new();
        idx.put("chunks", "x/a", &json!({ "group_name": 3 })).unwrap();
        match get_chunks(&idx, "chunks") {
            Err(XferError::Format(msg)) => assert!(msg.starts_with("chunk x/a"), "{msg}"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
