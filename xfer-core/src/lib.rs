#![forbid(unsafe_code)]

pub mod backends;
pub mod config;
pub mod domain;
pub mod error;
pub mod list;
pub mod record;
pub mod stats;
pub mod table;
pub mod upload;
pub mod workflow;

pub mod util {
    pub mod hash_forward;
    pub mod sanitize;
}

pub mod chunking {
    pub mod builder;
}

pub mod codec;
pub mod index;
pub mod store;

pub mod pack {
    pub mod builder;
    pub mod tarball;
}

// Re-exports: stable API surface
pub use chunking::builder::{DEFAULT_BATCH_THRESHOLD, build_chunks, tally};
pub use config::MigrationConfig;
pub use domain::{Chunk, Decision, TransferPackage};
pub use list::list_package;
pub use pack::builder::{PackageOptions, create_chunk_package, verify_local_file};
pub use upload::{UploadTarget, upload_chunk_package};
pub use workflow::{Migration, gather_chunks};
