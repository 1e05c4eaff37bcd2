use std::io::{Result, Write};

/// Forwards writes to `inner`, hashing and counting every byte that passes.
pub struct HashingForward<W: Write> {
    inner: W,
    hasher: blake3::Hasher,
    pub counted: u64,
}

impl<W: Write> HashingForward<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: blake3::Hasher::new(),
            counted: 0,
        }
    }

    pub fn finish(self) -> (W, u64, blake3::Hash) {
        let digest = self.hasher.finalize();
        (self.inner, self.counted, digest)
    }
}

impl<W: Write> Write for HashingForward<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.counted += n as u64;
        Ok(n)
    }
    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_hashes_forwarded_bytes() {
        let mut fw = HashingForward::new(Vec::new());
        fw.write_all(b"hello ").unwrap();
        fw.write_all(b"world").unwrap();
        let (inner, n, digest) = fw.finish();
        assert_eq!(inner, b"hello world");
        assert_eq!(n, 11);
        assert_eq!(digest, blake3::hash(b"hello world"));
    }
}
