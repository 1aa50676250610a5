//! Chunked SHA-1 computation
//!
//! B2 declares the SHA-1 of every stored file. This module hashes local
//! files block by block so arbitrarily large files are verified with a
//! single reusable buffer.

use crate::{ClientError, Result};
use sha1::{Digest, Sha1};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Size of a SHA-1 digest in bytes
pub const SHA1_BYTE_SIZE: usize = 20;

/// SHA-1 of the empty byte sequence
pub const EMPTY_SHA1_HEX: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";

/// A SHA-1 digest
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha1Digest([u8; SHA1_BYTE_SIZE]);

impl Sha1Digest {
    /// Create a digest from raw bytes
    pub fn new(bytes: [u8; SHA1_BYTE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse a hex digest (either case)
    pub fn from_hex(s: &str) -> Option<Self> {
        let mut arr = [0u8; SHA1_BYTE_SIZE];
        hex::decode_to_slice(s.trim(), &mut arr).ok()?;
        Some(Self(arr))
    }

    /// Get the digest as bytes
    pub fn as_bytes(&self) -> &[u8; SHA1_BYTE_SIZE] {
        &self.0
    }

    /// Lowercase hex, the form B2 uses in `X-Bz-Content-Sha1`
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Compare against a digest string declared by the server.
    ///
    /// The declared value is treated as text: surrounding whitespace and
    /// case are ignored, as is the `unverified:` marker B2 puts in front of
    /// digests it supplied on behalf of the uploader.
    pub fn matches_declared(&self, declared: &str) -> bool {
        normalize_declared(declared) == self.to_hex()
    }
}

impl fmt::Debug for Sha1Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha1Digest({})", self.to_hex())
    }
}

impl fmt::Display for Sha1Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Sha1Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

pub(crate) fn normalize_declared(declared: &str) -> String {
    let trimmed = declared.trim();
    let bare = trimmed
        .get(..11)
        .filter(|p| p.eq_ignore_ascii_case("unverified:"))
        .map(|_| &trimmed[11..])
        .unwrap_or(trimmed);
    bare.to_ascii_lowercase()
}

/// Hash a byte slice in one pass
pub fn sha1_bytes(data: &[u8]) -> Sha1Digest {
    let mut hasher = Sha1::new();
    hasher.update(data);
    finish(hasher)
}

fn finish(hasher: Sha1) -> Sha1Digest {
    let mut out = [0u8; SHA1_BYTE_SIZE];
    out.copy_from_slice(&hasher.finalize());
    Sha1Digest(out)
}

/// Hash everything `reader` yields, `block_size` bytes at a time.
///
/// Only the bytes each `read` call actually returns are fed to the hasher;
/// short reads are normal and the loop ends at the first zero-length read.
pub fn sha1_reader<R: Read>(mut reader: R, block_size: usize) -> io::Result<Sha1Digest> {
    if block_size == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "block size must be at least 1",
        ));
    }

    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; block_size];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(finish(hasher))
}

/// Hash a file on disk. The handle is closed before returning.
pub fn sha1_file(path: &Path, block_size: usize) -> io::Result<Sha1Digest> {
    let file = File::open(path)?;
    sha1_reader(file, block_size)
}

/// Hash a file on the blocking thread pool
pub async fn sha1_file_blocking(path: PathBuf, block_size: usize) -> Result<Sha1Digest> {
    tokio::task::spawn_blocking(move || sha1_file(&path, block_size))
        .await
        .map_err(|e| ClientError::Io(io::Error::other(e)))?
        .map_err(ClientError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader that hands out at most `limit` bytes per call
    struct Trickle<R> {
        inner: R,
        limit: usize,
    }

    impl<R: Read> Read for Trickle<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.limit);
            self.inner.read(&mut buf[..n])
        }
    }

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "disk went away"))
        }
    }

    #[test]
    fn test_empty_input() {
        let digest = sha1_reader(Cursor::new(Vec::new()), 8192).unwrap();
        assert_eq!(digest.to_hex(), EMPTY_SHA1_HEX);
    }

    #[test]
    fn test_known_content() {
        let digest = sha1_reader(Cursor::new(b"abc".to_vec()), 2).unwrap();
        assert_eq!(digest.to_hex(), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_short_reads() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let reader = Trickle {
            inner: Cursor::new(data.clone()),
            limit: 7,
        };
        assert_eq!(sha1_reader(reader, 4096).unwrap(), sha1_bytes(&data));
    }

    #[test]
    fn test_non_utf8_bytes_hashed_raw() {
        let data = [0xff, 0xfe, 0x00, 0xc3];
        assert_eq!(
            sha1_reader(Cursor::new(data), 3).unwrap(),
            sha1_bytes(&data)
        );
    }

    #[test]
    fn test_read_error_propagates() {
        let err = sha1_reader(Failing, 16).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_zero_block_size() {
        let err = sha1_reader(Cursor::new(b"x".to_vec()), 0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_hex_roundtrip_and_case() {
        let digest = sha1_bytes(b"hello");
        let upper = digest.to_hex().to_uppercase();
        assert_eq!(Sha1Digest::from_hex(&upper), Some(digest));
        assert!(Sha1Digest::from_hex("abcd").is_none());
        assert!(Sha1Digest::from_hex("zz").is_none());
    }

    #[test]
    fn test_matches_declared() {
        let digest = sha1_bytes(b"hello");
        let hex = digest.to_hex();
        assert!(digest.matches_declared(&hex));
        assert!(digest.matches_declared(&hex.to_uppercase()));
        assert!(digest.matches_declared(&format!(" {} ", hex)));
        assert!(digest.matches_declared(&format!("unverified:{}", hex)));
        assert!(!digest.matches_declared("none"));
        assert!(!digest.matches_declared(EMPTY_SHA1_HEX));
    }

    #[test]
    fn test_file_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"hello\n").unwrap();
        let digest = sha1_file(&path, 4).unwrap();
        assert_eq!(digest.to_hex(), "f572d396fae9206628714fb2ce00f72e94f2258f");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = sha1_file(&dir.path().join("nope"), 8192).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
