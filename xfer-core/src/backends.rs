use std::path::PathBuf;

use crate::error::Result;
use crate::index::DocumentIndex;
use crate::index::jsonl::JsonlIndex;
use crate::store::ObjectStore;
use crate::store::fs::FsObjectStore;

#[derive(Clone, Debug)]
pub enum StoreBackend {
    Fs { root: PathBuf },
    S3,
}

#[derive(Clone, Debug)]
pub enum IndexBackend {
    Jsonl { dir: PathBuf },
    Elastic { url: String },
}

pub fn open_store(backend: &StoreBackend) -> Result<Box<dyn ObjectStore>> {
    match backend {
        StoreBackend::Fs { root } => Ok(Box::new(FsObjectStore::new(root.clone()))),
        StoreBackend::S3 => open_s3(),
    }
}

pub fn open_index(backend: &IndexBackend) -> Result<Box<dyn DocumentIndex>> {
    match backend {
        IndexBackend::Jsonl { dir } => Ok(Box::new(JsonlIndex::new(dir.clone()))),
        IndexBackend::Elastic { url } => open_elastic(url),
    }
}

#[cfg(feature = "s3")]
fn open_s3() -> Result<Box<dyn ObjectStore>> {
    Ok(Box::new(crate::store::s3::S3ObjectStore::from_env()?))
}

#[cfg(not(feature = "s3"))]
fn open_s3() -> Result<Box<dyn ObjectStore>> {
    Err(crate::error::XferError::Config(
        "built without the `s3` feature".into(),
    ))
}

#[cfg(feature = "elastic")]
fn open_elastic(url: &str) -> Result<Box<dyn DocumentIndex>> {
    Ok(Box::new(crate::index::elastic::ElasticIndex::new(url)?))
}

#[cfg(not(feature = "elastic"))]
fn open_elastic(_url: &str) -> Result<Box<dyn DocumentIndex>> {
    Err(crate::error::XferError::Config(
        "built without the `elastic` feature".into(),
    ))
}
