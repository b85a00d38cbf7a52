//! Utility functions shared across cardforge modules.

use std::fs;
use std::path::Path;

use crate::error::{CardError, Result};

/// Maximum source file size that can be read into memory (1 MB).
///
/// Generation caps the source text far below this; the limit only keeps a
/// mistaken `--file` argument from pulling a huge file into memory.
pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Read a file into a string with size limit protection.
///
/// # Errors
///
/// Returns an error if:
/// * The file cannot be read (doesn't exist, permission denied, not UTF-8)
/// * The file exceeds `MAX_FILE_SIZE`
pub fn read_to_string_limited(path: &Path) -> Result<String> {
    read_to_string_with_limit(path, MAX_FILE_SIZE)
}

/// Read a file into a string with a custom size limit.
pub fn read_to_string_with_limit(path: &Path, max_size: u64) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| CardError::storage(path, e))?;

    let size = metadata.len();
    if size > max_size {
        return Err(CardError::validation(format!(
            "file {} is too large ({} bytes, max {} bytes)",
            path.display(),
            size,
            max_size
        )));
    }

    fs::read_to_string(path).map_err(|e| CardError::storage(path, e))
}

/// The first `max_chars` characters of `text`.
///
/// Cuts on a char boundary, so multi-byte text never splits.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_to_string_limited_success() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        fs::write(&path, "Mitochondria are the powerhouse of the cell.").unwrap();

        let content = read_to_string_limited(&path).unwrap();
        assert_eq!(content, "Mitochondria are the powerhouse of the cell.");
    }

    #[test]
    fn test_read_to_string_limited_nonexistent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.txt");

        let err = read_to_string_limited(&path).unwrap_err();
        assert!(matches!(err, CardError::Storage { .. }));
        assert!(err.to_string().contains("nonexistent.txt"));
    }

    #[test]
    fn test_read_to_string_with_limit_exceeds() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("large.txt");
        fs::write(&path, "x".repeat(200)).unwrap();

        let err = read_to_string_with_limit(&path, 100).unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_read_to_string_with_limit_at_boundary() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("exact.txt");
        fs::write(&path, "x".repeat(100)).unwrap();

        assert_eq!(read_to_string_with_limit(&path, 100).unwrap().len(), 100);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("hello", 0), "");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("日本語のテキスト", 3), "日本語");
    }
}
