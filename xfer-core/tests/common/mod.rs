#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use xfer_core::error::Result;
use xfer_core::store::ObjectStore;
use xfer_core::store::fs::FsObjectStore;

/// Filesystem store that counts calls, to prove work was skipped.
pub struct CountingStore {
    pub inner: FsObjectStore,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    pub heads: AtomicUsize,
}

impl CountingStore {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: FsObjectStore::new(root),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            heads: AtomicUsize::new(0),
        }
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

impl ObjectStore for CountingStore {
    fn get_object(&self, bucket: &str, key: &str, dst: &mut dyn Write) -> Result<u64> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get_object(bucket, key, dst)
    }

    fn put_object(&self, bucket: &str, key: &str, src: &Path) -> Result<u64> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put_object(bucket, key, src)
    }

    fn content_length(&self, bucket: &str, key: &str) -> Result<u64> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        self.inner.content_length(bucket, key)
    }
}

/// Write `objects` (key, body) under `{root}/{bucket}`.
pub fn seed_bucket(root: &Path, bucket: &str, objects: &[(&str, &[u8])]) {
    for (key, body) in objects {
        let p = root.join(bucket).join(key);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, body).unwrap();
    }
}
