// xfer_core/src/store/mod.rs
use crate::error::Result;
use std::io::Write;
use std::path::Path;

/// A pre-authenticated object storage client.
pub trait ObjectStore: Send + Sync {
    /// Stream an object into `dst`; returns the bytes written.
    fn get_object(&self, bucket: &str, key: &str, dst: &mut dyn Write) -> Result<u64>;

    /// Upload a local file; returns the bytes sent.
    fn put_object(&self, bucket: &str, key: &str, src: &Path) -> Result<u64>;

    /// Stored length of an object, without fetching it.
    fn content_length(&self, bucket: &str, key: &str) -> Result<u64>;
}

pub mod fs;
#[cfg(feature = "s3")]
pub mod s3;
