use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tar::HeaderMode;
use walkdir::WalkDir;

use crate::error::{Result, XferError};

/// Tar `{base}/{root_name}` into `out`, entries named relative to `base` so
/// the archive has a single `root_name/` top-level directory.
///
/// Entries are walked in file-name order; with `deterministic` set, owners and
/// timestamps are zeroed so identical inputs give identical archives.
pub fn write_tarball(
    base: &Path,
    root_name: &str,
    out: &Path,
    deterministic: bool,
) -> Result<u64> {
    let mut builder = tar::Builder::new(BufWriter::new(File::create(out)?));
    builder.follow_symlinks(false);
    builder.mode(if deterministic {
        HeaderMode::Deterministic
    } else {
        HeaderMode::Complete
    });

    let mut files = 0u64;
    for entry in WalkDir::new(base.join(root_name))
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        let rel = entry.path().strip_prefix(base).map_err(|_| {
            XferError::Format(format!("{} escaped {}", entry.path().display(), base.display()))
        })?;
        if entry.file_type().is_dir() {
            builder.append_dir(rel, entry.path())?;
        } else if entry.file_type().is_file() {
            builder.append_path_with_name(entry.path(), rel)?;
            files += 1;
        }
        // (symlinks never come out of a download)
    }

    let mut w = builder.into_inner()?;
    w.flush()?;
    Ok(files)
}
