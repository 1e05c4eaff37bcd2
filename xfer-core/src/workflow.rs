// xfer_core/src/workflow.rs
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::chunking::builder::build_chunks;
use crate::config::MigrationConfig;
use crate::domain::{Chunk, Decision, TransferPackage};
use crate::error::{Result, XferError};
use crate::index::{DocumentIndex, Query};
use crate::pack::builder::create_chunk_package;
use crate::record::{get_chunks, package_update, update_chunk_record};
use crate::stats::RunStats;
use crate::store::ObjectStore;
use crate::upload::upload_chunk_package;

/// Read chunkable decisions from the index and build chunks from them.
pub fn gather_chunks(
    index: &dyn DocumentIndex,
    decisions_index: &str,
    threshold: u64,
) -> Result<Vec<Chunk>> {
    let query = Query::not_skipped();
    let total = index.count(decisions_index, &query)?;
    info!(decisions = total, index = decisions_index, "gathering chunks");

    let decisions = index
        .scan(decisions_index, &query)?
        .into_iter()
        .map(|hit| {
            let id = hit.id;
            serde_json::from_value::<Decision>(hit.source)
                .map_err(|e| XferError::Format(format!("decision {id}: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    let chunks = build_chunks(decisions, threshold)?;
    info!(chunks = chunks.len(), "chunks gathered");
    Ok(chunks)
}

/// Package, upload and record chunks, one at a time.
///
/// Any error stops the run; the package and upload steps skip work a previous
/// run already finished, so re-running picks up where it stopped.
pub struct Migration<'a> {
    source: &'a dyn ObjectStore,
    target: &'a dyn ObjectStore,
    config: &'a MigrationConfig,
}

impl<'a> Migration<'a> {
    pub fn new(
        source: &'a dyn ObjectStore,
        target: &'a dyn ObjectStore,
        config: &'a MigrationConfig,
    ) -> Result<Self> {
        config.validate_for_transfer()?;
        Ok(Self {
            source,
            target,
            config,
        })
    }

    /// Build (or reuse) the chunk's package and record it.
    pub fn package_chunk(
        &self,
        index: &mut dyn DocumentIndex,
        chunk: &Chunk,
        stats: &mut RunStats,
    ) -> Result<TransferPackage> {
        let package = create_chunk_package(
            self.source,
            &self.config.source_bucket,
            chunk,
            &self.config.package_options(),
        )?;
        if chunk.transfer_package.as_ref() == Some(&package) {
            stats.reused += 1;
        } else {
            update_chunk_record(
                index,
                &self.config.chunks_index,
                &chunk.chunk_id(),
                &package_update(&package)?,
            )?;
            stats.packaged += 1;
        }
        Ok(package)
    }

    /// Upload (or verify) a package and record the uploaded location.
    pub fn upload_package(
        &self,
        index: &mut dyn DocumentIndex,
        chunk_id: &str,
        package: &TransferPackage,
        stats: &mut RunStats,
    ) -> Result<TransferPackage> {
        let already = package.is_uploaded();
        let uploaded = upload_chunk_package(self.target, &self.config.upload_target(), package)?;
        if already {
            stats.verified += 1;
        } else {
            update_chunk_record(
                index,
                &self.config.chunks_index,
                chunk_id,
                &package_update(&uploaded)?,
            )?;
            stats.uploaded += 1;
            stats.bytes_uploaded += uploaded.content_length;
        }
        Ok(uploaded)
    }

    pub fn migrate_chunk(
        &self,
        index: &mut dyn DocumentIndex,
        chunk: &Chunk,
        stats: &mut RunStats,
    ) -> Result<Chunk> {
        let chunk_id = chunk.chunk_id();
        info!(
            chunk_id = %chunk_id,
            files = chunk.file_count(),
            bytes = chunk.total_size,
            "migrating chunk"
        );

        // An uploaded package is verified remotely; its local copy may be gone.
        let package = match &chunk.transfer_package {
            Some(pkg) if pkg.is_uploaded() => pkg.clone(),
            _ => self.package_chunk(index, chunk, stats)?,
        };
        let uploaded = self.upload_package(index, &chunk_id, &package, stats)?;

        Ok(Chunk {
            transfer_package: Some(uploaded),
            ..chunk.clone()
        })
    }

    pub fn migrate_chunks(
        &self,
        index: &mut dyn DocumentIndex,
        chunks: &[Chunk],
    ) -> Result<RunStats> {
        let mut stats = RunStats {
            started_at: OffsetDateTime::now_utc().unix_timestamp(),
            ..Default::default()
        };
        for chunk in chunks {
            stats.chunks += 1;
            if chunk.s3_keys.is_empty() {
                warn!(chunk_id = %chunk.chunk_id(), "chunk has no keys");
            }
            self.migrate_chunk(index, chunk, &mut stats)?;
        }
        stats.finished_at = OffsetDateTime::now_utc().unix_timestamp();
        info!(
            chunks = stats.chunks,
            packaged = stats.packaged,
            reused = stats.reused,
            uploaded = stats.uploaded,
            verified = stats.verified,
            bytes = stats.bytes_uploaded,
            "migration finished"
        );
        Ok(stats)
    }

    /// Migrate every chunk stored in the chunk index.
    pub fn run(&self, index: &mut dyn DocumentIndex) -> Result<RunStats> {
        let chunks = get_chunks(index, &self.config.chunks_index)?;
        self.migrate_chunks(index, &chunks)
    }
}
