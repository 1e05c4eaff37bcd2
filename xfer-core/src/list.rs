use crate::codec::CodecId;
use crate::error::{Result, XferError};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageEntry {
    pub path: String,
    pub size: u64,
}

/// Files inside a package, in archive order.
pub fn list_package(archive: &Path) -> Result<Vec<PackageEntry>> {
    let codec = CodecId::from_path(archive)
        .ok_or_else(|| XferError::Format(format!("unknown package type: {}", archive.display())))?;
    let f = File::open(archive)?;
    let reader = codec.compressor().decoder(Box::new(BufReader::new(f)))?;
    let mut tar = tar::Archive::new(reader);

    let mut out = Vec::new();
    for entry in tar.entries()? {
        let entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        out.push(PackageEntry {
            path: entry.path()?.to_string_lossy().into_owned(),
            size: entry.header().size()?,
        });
    }
    Ok(out)
}
