use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "xferdev: born-digital transfer packaging", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Buckets are directories under --store-root
    Fs,
    /// AWS S3, credentials from the environment
    S3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum IndexKind {
    /// One JSON-lines file per index under --index-dir
    Jsonl,
    /// Elasticsearch-compatible HTTP endpoint at --elastic-url
    Elastic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CodecArg {
    Store,
    Gzip,
    Zstd,
}

/// Per-field overrides applied over the config file.
#[derive(Args, Debug, Default)]
pub struct ConfigOverrides {
    #[arg(long, global = true, env = "XFER_SOURCE_BUCKET")]
    pub source_bucket: Option<String>,

    #[arg(long, global = true, env = "XFER_TARGET_BUCKET")]
    pub target_bucket: Option<String>,

    /// Key prefix for uploaded packages
    #[arg(long, global = true, env = "XFER_TARGET_PREFIX")]
    pub target_prefix: Option<String>,

    /// Where finished packages are written
    #[arg(long, global = true, env = "XFER_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, global = true, env = "XFER_SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Max bytes per chunk
    #[arg(long, global = true, env = "XFER_BATCH_THRESHOLD")]
    pub batch_threshold: Option<u64>,

    #[arg(long, global = true, env = "XFER_DECISIONS_INDEX")]
    pub decisions_index: Option<String>,

    #[arg(long, global = true, env = "XFER_CHUNKS_INDEX")]
    pub chunks_index: Option<String>,

    #[arg(long, global = true, value_enum, env = "XFER_CODEC")]
    pub codec: Option<CodecArg>,

    #[arg(long, global = true, env = "XFER_COMPRESSION_LEVEL")]
    pub compression_level: Option<i32>,

    /// Zero tar owners and timestamps
    #[arg(long, global = true, env = "XFER_DETERMINISTIC")]
    pub deterministic: bool,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Migration config (JSON); missing fields take defaults
    #[arg(long, global = true, env = "XFER_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = StoreKind::Fs, env = "XFER_STORE")]
    pub store: StoreKind,

    /// Root directory of the filesystem store
    #[arg(long, global = true, default_value = "store", env = "XFER_STORE_ROOT")]
    pub store_root: PathBuf,

    #[arg(long, global = true, value_enum, default_value_t = IndexKind::Jsonl, env = "XFER_INDEX")]
    pub index: IndexKind,

    /// Directory of the JSONL index
    #[arg(long, global = true, default_value = "index", env = "XFER_INDEX_DIR")]
    pub index_dir: PathBuf,

    #[arg(long, global = true, default_value = "http://localhost:9200", env = "XFER_ELASTIC_URL")]
    pub elastic_url: String,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print `chunk_id  key_count` for the chunks the decisions would produce
    Tally,

    /// Build chunks from the decisions index and save them to the chunk index
    Gather,

    /// Build (or reuse) the package for one chunk
    Package { chunk_id: String },

    /// Upload (or verify) the recorded package for one chunk
    Upload { chunk_id: String },

    /// Package and upload every stored chunk, then print run stats
    Run,

    /// List the files inside a package
    List { archive: PathBuf },

    /// Check a local archive is non-empty and exactly `length` bytes
    VerifyLocal { path: PathBuf, length: u64 },

    /// Look up a manifest item and print its payload location
    Manifest {
        /// Manifest table as JSON lines
        table: PathBuf,
        id: String,
        version: u64,
    },
}
