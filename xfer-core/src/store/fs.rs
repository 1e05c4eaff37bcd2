use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Result, XferError};
use crate::store::ObjectStore;
use crate::util::sanitize::safe_join;

/// Object store over a local directory: `{root}/{bucket}/{key}`.
#[derive(Clone, Debug)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let bucket_dir = safe_join(&self.root, bucket)?;
        safe_join(&bucket_dir, key)
    }

    fn open(&self, bucket: &str, key: &str) -> Result<File> {
        let path = self.object_path(bucket, key)?;
        File::open(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => XferError::MissingRecord {
                id: format!("{bucket}/{key}"),
            },
            _ => e.into(),
        })
    }
}

impl ObjectStore for FsObjectStore {
    fn get_object(&self, bucket: &str, key: &str, dst: &mut dyn Write) -> Result<u64> {
        let mut f = self.open(bucket, key)?;
        Ok(std::io::copy(&mut f, dst)?)
    }

    fn put_object(&self, bucket: &str, key: &str, src: &Path) -> Result<u64> {
        let dest = self.object_path(bucket, key)?;
        let parent = dest
            .parent()
            .ok_or_else(|| XferError::UnsafeKey { key: key.to_string() })?;
        fs::create_dir_all(parent)?;

        // Land the whole object or nothing.
        let mut tmp = NamedTempFile::new_in(parent)?;
        let mut f = File::open(src)?;
        let n = std::io::copy(&mut f, &mut tmp)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&dest).map_err(|e| XferError::Io(e.error))?;
        Ok(n)
    }

    fn content_length(&self, bucket: &str, key: &str) -> Result<u64> {
        Ok(self.open(bucket, key)?.metadata()?.len())
    }
}
