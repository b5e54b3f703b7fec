//! Streaming file hashers.
//!
//! Two hashers back the detection pipeline: a CRC32 checksum (crc32fast)
//! used to cheaply reject non-duplicates within a size bucket, and an MD5
//! digest used as the final duplicate-confirmation criterion. Both stream
//! the file in 64 KiB reads, so memory stays flat for large files.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read chunk size for streaming hashes.
const READ_CHUNK: usize = 64 * 1024;

/// Which algorithm produced a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKind {
    /// Fast whole-file checksum.
    Crc32,
    /// Strong confirmation digest.
    Md5,
}

impl std::fmt::Display for DigestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Crc32 => write!(f, "crc32"),
            Self::Md5 => write!(f, "md5"),
        }
    }
}

/// Compute the CRC32 checksum of a file's entire contents.
///
/// # Errors
///
/// Returns the underlying I/O error when the file cannot be opened or read.
pub fn crc32_file(path: &Path) -> io::Result<u32> {
    let mut file = File::open(path)?;
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finalize())
}

/// Compute the MD5 digest of a file's entire contents, as lower-case hex.
///
/// # Errors
///
/// Returns the underlying I/O error when the file cannot be opened or read.
pub fn md5_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut context = md5::Context::new();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        context.consume(&buf[..n]);
    }

    Ok(format!("{:x}", context.compute()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_crc32_known_value() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "hello.txt", b"hello");

        // CRC32 (IEEE) of "hello"
        assert_eq!(crc32_file(&path).unwrap(), 0x3610_A686);
    }

    #[test]
    fn test_crc32_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "empty.txt", b"");

        assert_eq!(crc32_file(&path).unwrap(), 0);
    }

    #[test]
    fn test_md5_known_value() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "hello.txt", b"hello");

        assert_eq!(
            md5_file(&path).unwrap(),
            "5d41402abc4b2a76b9719d911017c592"
        );
    }

    #[test]
    fn test_md5_streams_across_chunks() {
        let dir = TempDir::new().unwrap();
        // Larger than one read chunk, so the loop runs more than once.
        let content = vec![0xABu8; READ_CHUNK * 2 + 17];
        let path = write_file(&dir, "big.bin", &content);

        assert_eq!(md5_file(&path).unwrap(), format!("{:x}", md5::compute(&content)));
    }

    #[test]
    fn test_identical_content_identical_hashes() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.bin", b"same bytes");
        let b = write_file(&dir, "b.bin", b"same bytes");

        assert_eq!(crc32_file(&a).unwrap(), crc32_file(&b).unwrap());
        assert_eq!(md5_file(&a).unwrap(), md5_file(&b).unwrap());
    }

    #[test]
    fn test_missing_file_errors() {
        let missing = Path::new("/nonexistent/file.bin");
        assert!(crc32_file(missing).is_err());
        assert!(md5_file(missing).is_err());
    }

    #[test]
    fn test_digest_kind_display() {
        assert_eq!(DigestKind::Crc32.to_string(), "crc32");
        assert_eq!(DigestKind::Md5.to_string(), "md5");
    }
}
