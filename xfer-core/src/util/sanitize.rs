use std::path::{Component, Path, PathBuf};

use crate::error::{Result, XferError};

/// Join an object key under `root`, refusing keys that would escape it.
pub fn safe_join(root: &Path, key: &str) -> Result<PathBuf> {
    let rel = Path::new(key);
    let clean = !key.is_empty()
        && rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !clean {
        return Err(XferError::UnsafeKey {
            key: key.to_string(),
        });
    }
    Ok(root.join(rel))
}

/// Forward-slash form of a relative path, for object keys.
pub fn key_from_path(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_keys_are_mirrored() {
        let p = safe_join(Path::new("/tmp/x"), "A/B/c.tif").unwrap();
        assert_eq!(p, Path::new("/tmp/x/A/B/c.tif"));
    }

    #[test]
    fn escaping_keys_are_rejected() {
        for key in ["", "/etc/passwd", "../up", "a/../../b"] {
            assert!(safe_join(Path::new("/tmp/x"), key).is_err(), "{key}");
        }
    }

    #[test]
    fn key_uses_forward_slashes() {
        let rel: PathBuf = ["library", "group_1.tar.gz"].iter().collect();
        assert_eq!(key_from_path(&rel), "library/group_1.tar.gz");
    }
}
