use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::chunking::builder::DEFAULT_BATCH_THRESHOLD;
use crate::codec::CodecId;
use crate::error::{Result, XferError};
use crate::pack::builder::PackageOptions;
use crate::upload::UploadTarget;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    /// Bucket the chunk keys are downloaded from.
    pub source_bucket: String,
    /// Bucket packages are uploaded to.
    pub target_bucket: String,
    pub target_prefix: String,
    pub output_dir: PathBuf,
    pub scratch_dir: Option<PathBuf>,
    pub batch_threshold: u64,
    pub decisions_index: String,
    pub chunks_index: String,
    pub codec: CodecId,
    pub compression_level: i32,
    pub deterministic: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            source_bucket: String::new(),
            target_bucket: String::new(),
            target_prefix: "born-digital".to_string(),
            output_dir: PathBuf::from("target/packages"),
            scratch_dir: None,
            batch_threshold: DEFAULT_BATCH_THRESHOLD,
            decisions_index: "decisions".to_string(),
            chunks_index: "chunks".to_string(),
            codec: CodecId::Gzip,
            compression_level: 6,
            deterministic: false,
        }
    }
}

impl MigrationConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| XferError::Config(format!("{}: {e}", path.display())))
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_threshold == 0 {
            return Err(XferError::Config("batch_threshold must be positive".into()));
        }
        if self.target_prefix.trim_matches('/').is_empty() {
            return Err(XferError::Config("target_prefix must not be empty".into()));
        }
        for (name, value) in [
            ("decisions_index", &self.decisions_index),
            ("chunks_index", &self.chunks_index),
        ] {
            if value.is_empty() {
                return Err(XferError::Config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    /// Transfers additionally need both buckets.
    pub fn validate_for_transfer(&self) -> Result<()> {
        self.validate()?;
        for (name, value) in [
            ("source_bucket", &self.source_bucket),
            ("target_bucket", &self.target_bucket),
        ] {
            if value.is_empty() {
                return Err(XferError::Config(format!("{name} must be set")));
            }
        }
        Ok(())
    }

    pub fn package_options(&self) -> PackageOptions {
        PackageOptions {
            output_dir: self.output_dir.clone(),
            scratch_dir: self.scratch_dir.clone(),
            codec: self.codec,
            level: self.compression_level,
            deterministic: self.deterministic,
        }
    }

    pub fn upload_target(&self) -> UploadTarget<'_> {
        UploadTarget {
            bucket: &self.target_bucket,
            prefix: &self.target_prefix,
            output_dir: &self.output_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xfer.json");
        fs::write(
            &path,
            r#"{"source_bucket": "src", "target_bucket": "dst", "codec": "zstd"}"#,
        )
        .unwrap();
        let cfg = MigrationConfig::load(&path).unwrap();
        assert_eq!(cfg.codec, CodecId::Zstd);
        assert_eq!(cfg.batch_threshold, 15_000_000_000);
        assert_eq!(cfg.chunks_index, "chunks");
        cfg.validate_for_transfer().unwrap();
    }

    #[test]
    fn unknown_keys_are_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xfer.json");
        fs::write(&path, r#"{"batch_treshold": 1}"#).unwrap();
        assert!(matches!(
            MigrationConfig::load(&path),
            Err(XferError::Config(_))
        ));
    }

    #[test]
    fn transfer_needs_buckets() {
        let cfg = MigrationConfig::default();
        cfg.validate().unwrap();
        assert!(cfg.validate_for_transfer().is_err());
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let cfg = MigrationConfig {
            batch_threshold: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
