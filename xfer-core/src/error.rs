use thiserror::Error;

#[derive(Error, Debug)]
pub enum XferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Total size mismatch for {group}: expected {expected}, chunked {actual}")]
    SizeMismatch {
        group: String,
        expected: u64,
        actual: u64,
    },

    #[error("Total file count mismatch for {group}: expected {expected}, chunked {actual}")]
    CountMismatch {
        group: String,
        expected: usize,
        actual: usize,
    },

    #[error("Chunk id {chunk_id} collides; merged size {combined} exceeds threshold {threshold}")]
    ChunkCollision {
        chunk_id: String,
        combined: u64,
        threshold: u64,
    },

    #[error("Cannot merge chunk {right} into {left}")]
    IdentityMismatch { left: String, right: String },

    #[error("Missing record: {id}")]
    MissingRecord { id: String },

    #[error("Content length mismatch for {location}: {actual} != {expected}")]
    ContentLengthMismatch {
        location: String,
        expected: u64,
        actual: u64,
    },

    #[error("Content length is zero: {path}")]
    EmptyFile { path: String },

    #[error("Unsafe object key: {key}")]
    UnsafeKey { key: String },

    #[error("Backend error: {0}")]
    Backend(String),
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, XferError>;
