//! Allowed-vocabulary loading.
//!
//! The vocabulary file is scanned in fixed-size chunks with a byte loop;
//! only non-blank tokens are allocated.

use crate::error::{Result, SemvecError};
use std::collections::HashSet;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use tracing::debug;

/// Set of words eligible for indexing.
pub type Vocabulary = HashSet<String>;

/// Load the vocabulary file at `path`, reading `buffer_size` bytes at a time.
///
/// # Errors
///
/// Returns `SemvecError::Config` if the file cannot be opened or read.
pub fn load_dictionary(path: &Path, buffer_size: usize) -> Result<Vocabulary> {
    let file = File::open(path)
        .map_err(|e| SemvecError::config(path, format!("cannot open dictionary: {e}")))?;
    let words = scan_dictionary(file, buffer_size)
        .map_err(|e| SemvecError::config(path, format!("cannot read dictionary: {e}")))?;
    debug!(path = %path.display(), words = words.len(), "Loaded dictionary");
    Ok(words)
}

/// Scan newline-delimited tokens out of `reader`.
///
/// Both `\n` and `\r\n` terminate a token, blank lines are skipped and
/// surrounding spaces or tabs are trimmed.
///
/// # Errors
///
/// Propagates read errors other than `Interrupted`.
pub fn scan_dictionary<R: Read>(mut reader: R, buffer_size: usize) -> std::io::Result<Vocabulary> {
    let mut words = Vocabulary::new();
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut current: Vec<u8> = Vec::new();

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        for &byte in &buffer[..bytes_read] {
            if byte == b'\n' || byte == b'\r' {
                push_token(&mut words, &current);
                current.clear();
            } else {
                current.push(byte);
            }
        }
    }
    // Last line without a trailing newline.
    push_token(&mut words, &current);

    Ok(words)
}

fn push_token(words: &mut Vocabulary, raw: &[u8]) {
    let token = raw.trim_ascii();
    if !token.is_empty() {
        words.insert(String::from_utf8_lossy(token).into_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scan(input: &str, buffer_size: usize) -> Vocabulary {
        scan_dictionary(Cursor::new(input.as_bytes()), buffer_size).unwrap()
    }

    #[test]
    fn test_mixed_line_endings() {
        let words = scan("cat\r\ndog\nfish\r\n", 4096);
        assert_eq!(words.len(), 3);
        assert!(words.contains("cat"));
        assert!(words.contains("dog"));
        assert!(words.contains("fish"));
    }

    #[test]
    fn test_blank_lines_and_duplicates() {
        let words = scan("\n\ncat\n\r\n\ncat\ndog", 4096);
        assert_eq!(words.len(), 2);
        assert!(words.contains("dog"));
    }

    #[test]
    fn test_tokens_split_across_chunks() {
        // Three-byte buffer forces every token to straddle reads.
        let words = scan("elephant\r\ngiraffe\n", 3);
        assert!(words.contains("elephant"));
        assert!(words.contains("giraffe"));
        assert_eq!(words.len(), 2);
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let words = scan("  cat \n\tdog\t\n   \n", 16);
        assert!(words.contains("cat"));
        assert!(words.contains("dog"));
        assert_eq!(words.len(), 2);
    }

    #[test]
    fn test_case_sensitive() {
        let words = scan("Paris\nparis\n", 16);
        assert_eq!(words.len(), 2);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = load_dictionary(Path::new("/no/such/dictionary.txt"), 64).unwrap_err();
        assert!(matches!(err, SemvecError::Config { .. }));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("words.txt");
        std::fs::write(&path, "alpha\nbeta\r\n").unwrap();
        let words = load_dictionary(&path, 2).unwrap();
        assert_eq!(words.len(), 2);
    }
}
