use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::codec::CodecId;
use crate::domain::{Chunk, TransferPackage};
use crate::error::{Result, XferError};
use crate::pack::tarball::write_tarball;
use crate::store::ObjectStore;
use crate::util::hash_forward::HashingForward;
use crate::util::sanitize::safe_join;

#[derive(Clone, Debug)]
pub struct PackageOptions {
    /// Finished archives land here as `{destination}/{group}.{ext}`.
    pub output_dir: PathBuf,
    /// Parent for the per-chunk download directory; system temp dir when unset.
    pub scratch_dir: Option<PathBuf>,
    pub codec: CodecId,
    pub level: i32,
    /// When true, zero tar owners and timestamps for reproducible archives.
    pub deterministic: bool,
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("target/packages"),
            scratch_dir: None,
            codec: CodecId::Gzip,
            level: 6,
            deterministic: false,
        }
    }
}

impl PackageOptions {
    pub fn archive_path(&self, chunk: &Chunk) -> Result<PathBuf> {
        safe_join(
            &self.output_dir,
            &format!("{}.{}", chunk.chunk_id(), self.codec.extension()),
        )
    }
}

/// A local archive must be non-empty and exactly `expected` bytes long.
pub fn verify_local_file(path: &Path, expected: u64) -> Result<()> {
    let actual = fs::metadata(path)?.len();
    if actual == 0 {
        return Err(XferError::EmptyFile {
            path: path.display().to_string(),
        });
    }
    if actual != expected {
        return Err(XferError::ContentLengthMismatch {
            location: path.display().to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// The chunk's recorded package, if its archive is still on disk intact.
fn reusable_package(chunk: &Chunk) -> Option<&TransferPackage> {
    let pkg = chunk.transfer_package.as_ref()?;
    let local = pkg.local_location.as_ref()?;
    match fs::metadata(local) {
        Ok(md) if md.is_file() && md.len() == pkg.content_length => Some(pkg),
        Ok(md) => {
            warn!(
                chunk_id = %chunk.chunk_id(),
                path = %local.display(),
                expected = pkg.content_length,
                actual = md.len(),
                "recorded package is stale; rebuilding"
            );
            None
        }
        Err(_) => None,
    }
}

/// Build (or reuse) the transfer package for `chunk`.
pub fn create_chunk_package(
    store: &dyn ObjectStore,
    bucket: &str,
    chunk: &Chunk,
    opts: &PackageOptions,
) -> Result<TransferPackage> {
    if let Some(pkg) = reusable_package(chunk) {
        info!(chunk_id = %chunk.chunk_id(), "reusing existing package");
        return Ok(pkg.clone());
    }
    let out = opts.archive_path(chunk)?;
    create_transfer_package(store, bucket, &chunk.group_name, &chunk.s3_keys, &out, opts)
}

/// Download `keys` into a scratch directory named `group_name` and pack it
/// into `out`. The scratch directory is removed on return, success or not.
pub fn create_transfer_package(
    store: &dyn ObjectStore,
    bucket: &str,
    group_name: &str,
    keys: &[String],
    out: &Path,
    opts: &PackageOptions,
) -> Result<TransferPackage> {
    let mut scratch = tempfile::Builder::new();
    scratch.prefix("xfer-");
    let scratch = match &opts.scratch_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            scratch.tempdir_in(dir)?
        }
        None => scratch.tempdir()?,
    };

    let root = safe_join(scratch.path(), group_name)?;
    fs::create_dir_all(&root)?;
    let mut downloaded = 0u64;
    for key in keys {
        let dest = safe_join(&root, key)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut f = BufWriter::new(File::create(&dest)?);
        let n = store.get_object(bucket, key, &mut f)?;
        f.flush()?;
        downloaded += n;
        debug!(bucket, key = %key, bytes = n, "object downloaded");
    }

    let tar_path = scratch.path().join(format!("{group_name}.tar"));
    let files = write_tarball(scratch.path(), group_name, &tar_path, opts.deterministic)?;

    let parent = out
        .parent()
        .ok_or_else(|| XferError::Format(format!("no parent for {}", out.display())))?;
    fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    let (written, digest) = {
        let mut src = File::open(&tar_path)?;
        let mut fw = HashingForward::new(BufWriter::new(tmp.as_file_mut()));
        opts.codec
            .compressor()
            .compress(&mut src, &mut fw, opts.level)?;
        let (mut inner, written, digest) = fw.finish();
        inner.flush()?;
        (written, digest)
    };
    tmp.as_file().sync_all()?;
    tmp.persist(out).map_err(|e| XferError::Io(e.error))?;

    let content_length = fs::metadata(out)?.len();
    if content_length != written {
        return Err(XferError::ContentLengthMismatch {
            location: out.display().to_string(),
            expected: written,
            actual: content_length,
        });
    }

    info!(
        group = group_name,
        files,
        downloaded,
        content_length,
        path = %out.display(),
        "package created"
    );
    Ok(TransferPackage {
        local_location: Some(out.to_path_buf()),
        s3_location: None,
        content_length,
        blake3: Some(hex::encode(digest.as_bytes())),
    })
}
