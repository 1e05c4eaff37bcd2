// xfer_core/src/domain.rs
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, XferError};

/// One source object and the destinations it is migrating to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub group_name: String,
    #[serde(default)]
    pub destinations: Vec<String>,
    pub s3_key: String,
    pub s3_size: u64,
    #[serde(default)]
    pub skip: bool,
}

/// A packaged chunk: local-only until the uploader fills in `s3_location`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPackage {
    pub local_location: Option<PathBuf>,
    pub s3_location: Option<String>,
    pub content_length: u64,
    /// blake3 of the compressed archive, hex encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blake3: Option<String>,
}

impl TransferPackage {
    pub fn is_uploaded(&self) -> bool {
        self.s3_location.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub group_name: String,
    pub destination: String,
    #[serde(default)]
    pub s3_keys: Vec<String>,
    #[serde(default)]
    pub total_size: u64,
    #[serde(default)]
    pub transfer_package: Option<TransferPackage>,
}

impl Chunk {
    pub fn new(group_name: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            destination: destination.into(),
            s3_keys: Vec::new(),
            total_size: 0,
            transfer_package: None,
        }
    }

    pub fn chunk_id(&self) -> String {
        format!("{}/{}", self.destination, self.group_name)
    }

    pub fn file_count(&self) -> usize {
        self.s3_keys.len()
    }

    pub fn is_uploaded(&self) -> bool {
        self.transfer_package
            .as_ref()
            .is_some_and(TransferPackage::is_uploaded)
    }

    /// Append `other`'s keys; both chunks must share an identity.
    pub fn merge(&mut self, other: &Chunk) -> Result<()> {
        if other.chunk_id() != self.chunk_id() {
            return Err(XferError::IdentityMismatch {
                left: self.chunk_id(),
                right: other.chunk_id(),
            });
        }
        self.total_size = self
            .total_size
            .checked_add(other.total_size)
            .ok_or_else(|| XferError::Format(format!("size of {} overflows u64", self.chunk_id())))?;
        self.s3_keys.extend(other.s3_keys.iter().cloned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(group: &str, keys: &[&str], size: u64) -> Chunk {
        Chunk {
            s3_keys: keys.iter().map(|k| k.to_string()).collect(),
            total_size: size,
            ..Chunk::new(group, "library")
        }
    }

    #[test]
    fn chunk_id_is_destination_then_group() {
        assert_eq!(chunk("A_1", &[], 0).chunk_id(), "library/A_1");
    }

    #[test]
    fn merge_appends_keys_and_sizes() {
        let mut a = chunk("A", &["x", "y"], 5);
        a.merge(&chunk("A", &["z"], 7)).unwrap();
        assert_eq!(a.s3_keys, vec!["x", "y", "z"]);
        assert_eq!(a.total_size, 12);
    }

    #[test]
    fn merge_rejects_other_identity() {
        let mut a = chunk("A", &["x"], 1);
        let err = a.merge(&chunk("B", &["y"], 1)).unwrap_err();
        assert!(matches!(err, XferError::IdentityMismatch { .. }));
        assert_eq!(a.s3_keys, vec!["x"]);
    }

    #[test]
    fn uploaded_only_with_remote_location() {
        let mut c = chunk("A", &["x"], 1);
        assert!(!c.is_uploaded());
        c.transfer_package = Some(TransferPackage {
            local_location: Some(PathBuf::from("out/library/A.tar.gz")),
            ..Default::default()
        });
        assert!(!c.is_uploaded());
        if let Some(p) = c.transfer_package.as_mut() {
            p.s3_location = Some("born-digital/library/A.tar.gz".into());
        }
        assert!(c.is_uploaded());
    }

    #[test]
    fn decision_defaults_optional_fields() {
        let d: Decision =
            serde_json::from_str(r#"{"group_name":"g","s3_key":"k","s3_size":3}"#).unwrap();
        assert!(d.destinations.is_empty());
        assert!(!d.skip);
    }
}
