use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecId {
    Store = 0,
    #[default]
    Gzip = 1,
    Zstd = 2,
}

impl CodecId {
    pub fn extension(self) -> &'static str {
        match self {
            CodecId::Store => "tar",
            CodecId::Gzip => "tar.gz",
            CodecId::Zstd => "tar.zst",
        }
    }

    /// Guess the codec of a package from its file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy();
        [CodecId::Gzip, CodecId::Zstd, CodecId::Store]
            .into_iter()
            .find(|c| name.ends_with(&format!(".{}", c.extension())))
    }

    pub fn compressor(self) -> &'static dyn Compressor {
        match self {
            CodecId::Store => &store::Store,
            CodecId::Gzip => &gzip::GzipCompressor,
            CodecId::Zstd => &zstdc::ZstdCompressor,
        }
    }
}

pub trait Compressor: Send + Sync {
    fn id(&self) -> CodecId;
    /// Returns the number of uncompressed bytes consumed from `src`.
    fn compress(&self, src: &mut dyn Read, dst: &mut dyn Write, level: i32) -> Result<u64>;
    fn decoder<'a>(&self, src: Box<dyn Read + 'a>) -> Result<Box<dyn Read + 'a>>;
}

pub mod gzip;
pub mod store;
pub mod zstdc;
