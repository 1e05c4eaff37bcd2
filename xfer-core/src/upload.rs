use std::path::Path;

use tracing::info;

use crate::domain::TransferPackage;
use crate::error::{Result, XferError};
use crate::pack::builder::verify_local_file;
use crate::store::ObjectStore;
use crate::util::sanitize::key_from_path;

/// Where packages are uploaded.
#[derive(Clone, Debug)]
pub struct UploadTarget<'a> {
    pub bucket: &'a str,
    pub prefix: &'a str,
    /// Local archives are keyed by their path relative to this directory.
    pub output_dir: &'a Path,
}

impl UploadTarget<'_> {
    /// Remote key for a local archive; it must live under `output_dir`.
    pub fn key_for(&self, local: &Path) -> Result<String> {
        let rel = local.strip_prefix(self.output_dir).map_err(|_| {
            XferError::Format(format!(
                "package {} is outside output dir {}",
                local.display(),
                self.output_dir.display()
            ))
        })?;
        let rel = key_from_path(rel);
        if rel.is_empty() {
            return Err(XferError::UnsafeKey {
                key: local.display().to_string(),
            });
        }
        let prefix = self.prefix.trim_end_matches('/');
        Ok(if prefix.is_empty() {
            rel
        } else {
            format!("{prefix}/{rel}")
        })
    }
}

fn check_remote(store: &dyn ObjectStore, bucket: &str, key: &str, expected: u64) -> Result<()> {
    let actual = store.content_length(bucket, key)?;
    if actual != expected {
        return Err(XferError::ContentLengthMismatch {
            location: format!("{bucket}/{key}"),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Upload `package`, or verify it when a previous run already did.
///
/// The returned package always carries both locations once uploaded.
pub fn upload_chunk_package(
    store: &dyn ObjectStore,
    target: &UploadTarget<'_>,
    package: &TransferPackage,
) -> Result<TransferPackage> {
    if let Some(key) = &package.s3_location {
        check_remote(store, target.bucket, key, package.content_length)?;
        info!(key = %key, content_length = package.content_length, "package already uploaded");
        return Ok(package.clone());
    }

    let local = package
        .local_location
        .as_deref()
        .ok_or_else(|| XferError::Format("package has no local or remote location".into()))?;
    verify_local_file(local, package.content_length)?;

    let key = target.key_for(local)?;
    let sent = store.put_object(target.bucket, &key, local)?;
    check_remote(store, target.bucket, &key, sent)?;
    info!(bucket = target.bucket, key = %key, bytes = sent, "package uploaded");

    Ok(TransferPackage {
        s3_location: Some(key),
        content_length: sent,
        ..package.clone()
    })
}
