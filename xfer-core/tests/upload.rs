mod common;

use std::fs;

use common::CountingStore;
use xfer_core::error::XferError;
use xfer_core::{TransferPackage, UploadTarget, upload_chunk_package};

fn local_package(dir: &std::path::Path, body: &[u8]) -> TransferPackage {
    let path = dir.join("out/library/box.tar.gz");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, body).unwrap();
    TransferPackage {
        local_location: Some(path),
        s3_location: None,
        content_length: body.len() as u64,
        blake3: None,
    }
}

#[test]
fn upload_returns_package_with_both_locations() {
    let tmp = tempfile::tempdir().unwrap();
    let store = CountingStore::new(&tmp.path().join("remote"));
    let out = tmp.path().join("out");
    let target = UploadTarget {
        bucket: "transfer",
        prefix: "born-digital",
        output_dir: &out,
    };
    let pkg = local_package(tmp.path(), b"archive bytes");

    let uploaded = upload_chunk_package(&store, &target, &pkg).unwrap();
    assert_eq!(uploaded.local_location, pkg.local_location);
    assert_eq!(
        uploaded.s3_location.as_deref(),
        Some("born-digital/library/box.tar.gz")
    );
    assert_eq!(uploaded.content_length, 13);
    assert_eq!(
        fs::read(tmp.path().join("remote/transfer/born-digital/library/box.tar.gz")).unwrap(),
        b"archive bytes"
    );
    assert_eq!(store.puts(), 1);
}

#[test]
fn reupload_of_verified_package_is_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    let store = CountingStore::new(&tmp.path().join("remote"));
    let out = tmp.path().join("out");
    let target = UploadTarget {
        bucket: "transfer",
        prefix: "born-digital",
        output_dir: &out,
    };
    let uploaded =
        upload_chunk_package(&store, &target, &local_package(tmp.path(), b"abc")).unwrap();

    // The local copy may be gone by now; only the remote length matters.
    fs::remove_file(uploaded.local_location.as_ref().unwrap()).unwrap();
    let again = upload_chunk_package(&store, &target, &uploaded).unwrap();
    assert_eq!(again, uploaded);
    assert_eq!(store.puts(), 1);
}

#[test]
fn truncated_remote_object_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let store = CountingStore::new(&tmp.path().join("remote"));
    let out = tmp.path().join("out");
    let target = UploadTarget {
        bucket: "transfer",
        prefix: "born-digital",
        output_dir: &out,
    };
    let uploaded =
        upload_chunk_package(&store, &target, &local_package(tmp.path(), b"abcdef")).unwrap();

    let remote = store
        .inner
        .object_path("transfer", uploaded.s3_location.as_deref().unwrap())
        .unwrap();
    fs::write(&remote, b"abc").unwrap();

    match upload_chunk_package(&store, &target, &uploaded) {
        Err(XferError::ContentLengthMismatch {
            expected, actual, ..
        }) => {
            assert_eq!(expected, 6);
            assert_eq!(actual, 3);
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(store.puts(), 1);
}

#[test]
fn local_length_mismatch_blocks_upload() {
    let tmp = tempfile::tempdir().unwrap();
    let store = CountingStore::new(&tmp.path().join("remote"));
    let out = tmp.path().join("out");
    let target = UploadTarget {
        bucket: "transfer",
        prefix: "born-digital",
        output_dir: &out,
    };
    let mut pkg = local_package(tmp.path(), b"abcdef");
    pkg.content_length = 99;

    assert!(matches!(
        upload_chunk_package(&store, &target, &pkg),
        Err(XferError::ContentLengthMismatch { .. })
    ));
    assert_eq!(store.puts(), 0);
}

#[test]
fn package_without_any_location_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let store = CountingStore::new(tmp.path());
    let target = UploadTarget {
        bucket: "transfer",
        prefix: "born-digital",
        output_dir: tmp.path(),
    };
    assert!(matches!(
        upload_chunk_package(&store, &target, &TransferPackage::default()),
        Err(XferError::Format(_))
    ));
}

#[test]
fn package_from_another_output_dir_is_not_uploaded() {
    let tmp = tempfile::tempdir().unwrap();
    let store = CountingStore::new(&tmp.path().join("remote"));
    let out = tmp.path().join("new-out");
    let target = UploadTarget {
        bucket: "transfer",
        prefix: "born-digital",
        output_dir: &out,
    };

    // Same file name under two destinations of the old output dir.
    for dest in ["library", "archive"] {
        let path = tmp.path().join("out").join(dest).join("A.tar.gz");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"bytes").unwrap();
        let pkg = TransferPackage {
            local_location: Some(path),
            s3_location: None,
            content_length: 5,
            blake3: None,
        };
        let err = upload_chunk_package(&store, &target, &pkg).unwrap_err();
        assert!(matches!(err, XferError::Format(msg) if msg.contains("outside output dir")));
    }
    assert_eq!(store.puts(), 0);
    assert!(!tmp.path().join("remote/transfer/born-digital/A.tar.gz").exists());
}
