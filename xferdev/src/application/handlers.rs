use std::path::Path;

use tracing::info;
use xfer_core::backends::{IndexBackend, StoreBackend, open_index, open_store};
use xfer_core::codec::CodecId;
use xfer_core::error::{Result, XferError};
use xfer_core::index::DocumentIndex;
use xfer_core::record::{get_chunk, save_chunks};
use xfer_core::stats::RunStats;
use xfer_core::store::ObjectStore;
use xfer_core::table::{InMemTable, require_item};
use xfer_core::{Migration, MigrationConfig, gather_chunks, list_package, tally, verify_local_file};

use crate::presentation::cli::{CodecArg, ConfigOverrides, GlobalArgs, IndexKind, StoreKind};

fn load_config(g: &GlobalArgs) -> Result<MigrationConfig> {
    let mut config = match &g.config {
        Some(path) => MigrationConfig::load(path)?,
        None => MigrationConfig::default(),
    };
    apply_overrides(&mut config, &g.overrides);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(config: &mut MigrationConfig, o: &ConfigOverrides) {
    if let Some(v) = &o.source_bucket {
        config.source_bucket = v.clone();
    }
    if let Some(v) = &o.target_bucket {
        config.target_bucket = v.clone();
    }
    if let Some(v) = &o.target_prefix {
        config.target_prefix = v.clone();
    }
    if let Some(v) = &o.output_dir {
        config.output_dir = v.clone();
    }
    if let Some(v) = &o.scratch_dir {
        config.scratch_dir = Some(v.clone());
    }
    if let Some(v) = o.batch_threshold {
        config.batch_threshold = v;
    }
    if let Some(v) = &o.decisions_index {
        config.decisions_index = v.clone();
    }
    if let Some(v) = &o.chunks_index {
        config.chunks_index = v.clone();
    }
    if let Some(c) = o.codec {
        config.codec = match c {
            CodecArg::Store => CodecId::Store,
            CodecArg::Gzip => CodecId::Gzip,
            CodecArg::Zstd => CodecId::Zstd,
        };
    }
    if let Some(v) = o.compression_level {
        config.compression_level = v;
    }
    if o.deterministic {
        config.deterministic = true;
    }
}

fn store_from_args(g: &GlobalArgs) -> Result<Box<dyn ObjectStore>> {
    let backend = match g.store {
        StoreKind::Fs => StoreBackend::Fs {
            root: g.store_root.clone(),
        },
        StoreKind::S3 => StoreBackend::S3,
    };
    open_store(&backend)
}

fn index_from_args(g: &GlobalArgs) -> Result<Box<dyn DocumentIndex>> {
    let backend = match g.index {
        IndexKind::Jsonl => IndexBackend::Jsonl {
            dir: g.index_dir.clone(),
        },
        IndexKind::Elastic => IndexBackend::Elastic {
            url: g.elastic_url.clone(),
        },
    };
    open_index(&backend)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn handle_tally(g: &GlobalArgs) -> Result<()> {
    let config = load_config(g)?;
    let index = index_from_args(g)?;
    let chunks = gather_chunks(&*index, &config.decisions_index, config.batch_threshold)?;
    for (chunk_id, keys) in tally(&chunks) {
        println!("{chunk_id}\t{keys}");
    }
    Ok(())
}

pub fn handle_gather(g: &GlobalArgs) -> Result<()> {
    let config = load_config(g)?;
    let mut index = index_from_args(g)?;
    let chunks = gather_chunks(&*index, &config.decisions_index, config.batch_threshold)?;
    let outcome = save_chunks(&mut *index, &config.chunks_index, &chunks)?;
    info!(
        written = outcome.written,
        kept = outcome.kept,
        index = %config.chunks_index,
        "chunks saved"
    );
    println!("written={} kept={}", outcome.written, outcome.kept);
    Ok(())
}

pub fn handle_package(g: &GlobalArgs, chunk_id: &str) -> Result<()> {
    let config = load_config(g)?;
    let store = store_from_args(g)?;
    let mut index = index_from_args(g)?;
    let migration = Migration::new(&*store, &*store, &config)?;

    let chunk = get_chunk(&*index, &config.chunks_index, chunk_id)?;
    let mut stats = RunStats::default();
    let package = migration.package_chunk(&mut *index, &chunk, &mut stats)?;
    print_json(&package)
}

pub fn handle_upload(g: &GlobalArgs, chunk_id: &str) -> Result<()> {
    let config = load_config(g)?;
    let store = store_from_args(g)?;
    let mut index = index_from_args(g)?;
    let migration = Migration::new(&*store, &*store, &config)?;

    let chunk = get_chunk(&*index, &config.chunks_index, chunk_id)?;
    let package = chunk.transfer_package.ok_or_else(|| {
        XferError::Format(format!("chunk {chunk_id} has no package; run `package` first"))
    })?;
    let mut stats = RunStats::default();
    let uploaded = migration.upload_package(&mut *index, chunk_id, &package, &mut stats)?;
    print_json(&uploaded)
}

pub fn handle_run(g: &GlobalArgs) -> Result<()> {
    let config = load_config(g)?;
    let store = store_from_args(g)?;
    let mut index = index_from_args(g)?;
    let stats = Migration::new(&*store, &*store, &config)?.run(&mut *index)?;
    print_json(&stats)
}

pub fn handle_list(archive: &Path) -> Result<()> {
    for entry in list_package(archive)? {
        println!("{:>12}  {}", entry.size, entry.path);
    }
    Ok(())
}

pub fn handle_verify_local(path: &Path, length: u64) -> Result<()> {
    verify_local_file(path, length)?;
    eprintln!("verify-local: OK");
    Ok(())
}

pub fn handle_manifest(table: &Path, id: &str, version: u64) -> Result<()> {
    let table = InMemTable::from_jsonl(table)?;
    let item = require_item(&table, id, version)?;
    println!("{}", item.payload_location()?);
    Ok(())
}
