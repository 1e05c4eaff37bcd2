use std::collections::HashMap;

use tracing::{debug, info};

use crate::domain::{Chunk, Decision};
use crate::error::{Result, XferError};

/// Upper bound on the bytes packed into one chunk (~15 GB).
pub const DEFAULT_BATCH_THRESHOLD: u64 = 15_000_000_000;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub group_name: String,
    pub destination: String,
}

/// Group chunkable decisions by (group, destination).
///
/// Groups come back in first-seen order and keep their decisions in encounter
/// order, so chunk numbering is reproducible for the same input. Skipped
/// decisions are dropped; a decision is fanned out to every destination.
pub fn group_decisions<I>(decisions: I) -> Vec<(GroupKey, Vec<Decision>)>
where
    I: IntoIterator<Item = Decision>,
{
    let mut slots: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<(GroupKey, Vec<Decision>)> = Vec::new();

    for decision in decisions {
        if decision.skip {
            continue;
        }
        for destination in &decision.destinations {
            let key = GroupKey {
                group_name: decision.group_name.clone(),
                destination: destination.clone(),
            };
            let slot = *slots.entry(key.clone()).or_insert_with(|| {
                groups.push((key, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(decision.clone());
        }
    }
    groups
}

/// Split one group into size-bounded chunks.
///
/// An item that would push a non-empty batch over `threshold` starts the next
/// batch, so only a batch holding a single oversized item can exceed it. The
/// last batch is always emitted. Split groups are named `{group}_1..{group}_N`.
pub fn build_group_chunks(
    key: &GroupKey,
    decisions: &[Decision],
    threshold: u64,
) -> Result<Vec<Chunk>> {
    let mut batches: Vec<(Vec<String>, u64)> = Vec::new();
    let mut keys: Vec<String> = Vec::new();
    let mut size = 0u64;

    for d in decisions {
        if !keys.is_empty() && size.saturating_add(d.s3_size) > threshold {
            batches.push((std::mem::take(&mut keys), size));
            size = 0;
        }
        keys.push(d.s3_key.clone());
        size = size.saturating_add(d.s3_size);
    }
    batches.push((keys, size));

    let split = batches.len() > 1;
    let chunks: Vec<Chunk> = batches
        .into_iter()
        .enumerate()
        .map(|(i, (s3_keys, total_size))| {
            let group_name = if split {
                format!("{}_{}", key.group_name, i + 1)
            } else {
                key.group_name.clone()
            };
            Chunk {
                s3_keys,
                total_size,
                ..Chunk::new(group_name, key.destination.clone())
            }
        })
        .collect();

    let group = format!("{}/{}", key.destination, key.group_name);
    let expected_size = checked_total(&group, decisions.iter().map(|d| d.s3_size))?;
    let actual_size = checked_total(&group, chunks.iter().map(|c| c.total_size))?;
    if expected_size != actual_size {
        return Err(XferError::SizeMismatch {
            group,
            expected: expected_size,
            actual: actual_size,
        });
    }
    let actual_files: usize = chunks.iter().map(Chunk::file_count).sum();
    if decisions.len() != actual_files {
        return Err(XferError::CountMismatch {
            group,
            expected: decisions.len(),
            actual: actual_files,
        });
    }

    debug!(group = %group, chunks = chunks.len(), bytes = actual_size, "group chunked");
    Ok(chunks)
}

fn checked_total(group: &str, mut sizes: impl Iterator<Item = u64>) -> Result<u64> {
    sizes.try_fold(0u64, |acc, n| {
        acc.checked_add(n)
            .ok_or_else(|| XferError::Format(format!("total size of {group} overflows u64")))
    })
}

/// Merge chunks whose identities collide, keeping first-seen order.
///
/// A merged chunk must still fit in `threshold` unless it holds a single key;
/// otherwise the collision is an error.
pub fn dedupe_chunks(chunks: Vec<Chunk>, threshold: u64) -> Result<Vec<Chunk>> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<Chunk> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        match slots.get(&chunk.chunk_id()) {
            Some(&i) => {
                let chunk_id = chunk.chunk_id();
                let combined = out[i].total_size.checked_add(chunk.total_size);
                let keys = out[i].file_count() + chunk.file_count();
                match combined {
                    Some(n) if n <= threshold || keys <= 1 => {}
                    _ => {
                        return Err(XferError::ChunkCollision {
                            chunk_id,
                            combined: combined.unwrap_or(u64::MAX),
                            threshold,
                        });
                    }
                }
                debug!(chunk_id = %chunk_id, "merging colliding chunk");
                out[i].merge(&chunk)?;
            }
            None => {
                slots.insert(chunk.chunk_id(), out.len());
                out.push(chunk);
            }
        }
    }
    Ok(out)
}

/// Group, split and dedupe a decision set into chunks.
pub fn build_chunks<I>(decisions: I, threshold: u64) -> Result<Vec<Chunk>>
where
    I: IntoIterator<Item = Decision>,
{
    let groups = group_decisions(decisions);
    info!(groups = groups.len(), "found chunk groups");

    let mut chunks = Vec::new();
    for (key, items) in &groups {
        chunks.extend(build_group_chunks(key, items, threshold)?);
    }
    dedupe_chunks(chunks, threshold)
}

/// Chunk id to key count, in chunk order.
pub fn tally(chunks: &[Chunk]) -> Vec<(String, usize)> {
    chunks
        .iter()
        .map(|c| (c.chunk_id(), c.file_count()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(group: &str, dests: &[&str], key: &str, size: u64) -> Decision {
        Decision {
            group_name: group.into(),
            destinations: dests.iter().map(|d| d.to_string()).collect(),
            s3_key: key.into(),
            s3_size: size,
            skip: false,
        }
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let groups = group_decisions(vec![
            decision("b", &["x"], "1", 1),
            decision("a", &["x"], "2", 1),
            decision("b", &["x"], "3", 1),
        ]);
        let names: Vec<_> = groups.iter().map(|(k, _)| k.group_name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn fans_out_to_each_destination() {
        let groups = group_decisions(vec![decision("a", &["x", "y"], "1", 1)]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].0.destination, "y");
    }

    #[test]
    fn skipped_and_destinationless_decisions_are_dropped() {
        let mut skipped = decision("a", &["x"], "1", 1);
        skipped.skip = true;
        let groups = group_decisions(vec![skipped, decision("a", &[], "2", 1)]);
        assert!(groups.is_empty());
    }

    #[test]
    fn empty_group_still_yields_one_chunk() {
        let key = GroupKey {
            group_name: "a".into(),
            destination: "x".into(),
        };
        let chunks = build_group_chunks(&key, &[], 10).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].group_name, "a");
        assert!(chunks[0].s3_keys.is_empty());
    }

    #[test]
    fn exactly_at_threshold_stays_in_one_chunk() {
        let key = GroupKey {
            group_name: "a".into(),
            destination: "x".into(),
        };
        let items = vec![decision("a", &["x"], "1", 6), decision("a", &["x"], "2", 4)];
        let chunks = build_group_chunks(&key, &items, 10).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].total_size, 10);
    }

    #[test]
    fn group_total_overflow_is_an_error() {
        let key = GroupKey {
            group_name: "a".into(),
            destination: "x".into(),
        };
        let items = vec![
            decision("a", &["x"], "1", u64::MAX),
            decision("a", &["x"], "2", u64::MAX),
        ];
        let err = build_group_chunks(&key, &items, 10).unwrap_err();
        assert!(matches!(err, XferError::Format(msg) if msg.contains("x/a")));
    }

    #[test]
    fn tally_reports_key_counts() {
        let chunks = build_chunks(
            vec![decision("a", &["x"], "1", 1), decision("a", &["x"], "2", 1)],
            10,
        )
        .unwrap();
        assert_eq!(tally(&chunks), vec![("x/a".to_string(), 2)]);
    }
}
