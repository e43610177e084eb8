//! Random-access vector reads.
//!
//! Every lookup goes back to the embedding file: decoded vectors are owned
//! by the caller and never cached. Reads are positional, so concurrent
//! lookups share one read-only handle without a seek cursor.

use crate::error::{Result, ResultExt, SemvecError};
use crate::index::{COMPONENT_SIZE, VectorIndex};
use std::fs::File;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// A decoded embedding, `dimension` components long.
pub type Vector = Vec<f32>;

/// Byte source supporting reads at an absolute offset.
pub trait VectorSource: Send + Sync + 'static {
    /// Read up to `buf.len()` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize>;
}

impl VectorSource for File {
    #[cfg(unix)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(self, buf, offset)
    }
}

impl VectorSource for Vec<u8> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(self.len());
        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }
}

/// Resolves words to vectors through a [`VectorIndex`].
pub struct VectorStore {
    index: Arc<VectorIndex>,
    source: Arc<dyn VectorSource>,
    reads: AtomicU64,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("words", &self.index.len())
            .field("dimension", &self.index.dimension())
            .field("reads", &self.reads())
            .finish_non_exhaustive()
    }
}

impl VectorStore {
    pub fn new(index: Arc<VectorIndex>, source: impl VectorSource) -> Self {
        Self {
            index,
            source: Arc::new(source),
            reads: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Total vector reads issued so far.
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Read and decode the vector for `word`, blocking the calling thread.
    ///
    /// Returns `Ok(None)` if the word is not indexed.
    ///
    /// # Errors
    ///
    /// Returns `PartialRead` if the file yields fewer bytes than a full
    /// vector, or the IO error from the read.
    pub fn read_vector_blocking(&self, word: &str) -> Result<Option<Vector>> {
        let Some(offset) = self.index.offset(word) else {
            return Ok(None);
        };
        let expected = self.index.header().vector_len();
        let mut bytes = vec![0u8; expected];

        self.reads.fetch_add(1, Ordering::Relaxed);
        let actual = read_full(self.source.as_ref(), &mut bytes, offset)?;
        if actual != expected {
            return Err(SemvecError::PartialRead {
                word: word.to_string(),
                offset,
                expected,
                actual,
            });
        }
        trace!(word, offset, "Read word vector");

        Ok(Some(decode_vector(&bytes)))
    }

    /// Async wrapper over [`Self::read_vector_blocking`] that runs the read
    /// on the blocking pool.
    ///
    /// # Errors
    ///
    /// See [`Self::read_vector_blocking`].
    pub async fn read_vector(self: &Arc<Self>, word: &str) -> Result<Option<Vector>> {
        if !self.index.contains(word) {
            return Ok(None);
        }
        let store = Arc::clone(self);
        let word = word.to_string();
        tokio::task::spawn_blocking(move || store.read_vector_blocking(&word))
            .await
            .context("vector read task failed")?
    }
}

fn read_full(source: &dyn VectorSource, buf: &mut [u8], offset: u64) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read_at(&mut buf[filled..], offset + filled as u64) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Decode little-endian `f32` components.
#[must_use]
pub fn decode_vector(bytes: &[u8]) -> Vector {
    bytes
        .chunks_exact(COMPONENT_SIZE)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::dictionary::Vocabulary;
    use crate::index::{IndexBuilder, encode_vector_file};
    use std::io::Cursor;
    use std::path::PathBuf;

    fn fixture() -> (Arc<VectorIndex>, Vec<u8>) {
        let bytes = encode_vector_file(
            3,
            &[
                ("red", &[1.0, 2.0, 3.0]),
                ("green", &[-0.5, 0.25, 8.0]),
            ],
        );
        let vocab: Vocabulary = ["red", "green"].iter().map(ToString::to_string).collect();
        let config = IndexConfig {
            dictionary_filename: PathBuf::new(),
            word_vector_filename: PathBuf::new(),
            buffer_size: 8,
            max_header_size: 32,
            max_word_length: 8,
        };
        let index = IndexBuilder::new(&vocab, &config)
            .build(&mut Cursor::new(bytes.clone()))
            .unwrap();
        (Arc::new(index), bytes)
    }

    #[test]
    fn test_reads_exact_components() {
        let (index, bytes) = fixture();
        let store = VectorStore::new(index, bytes);

        assert_eq!(
            store.read_vector_blocking("green").unwrap(),
            Some(vec![-0.5, 0.25, 8.0])
        );
        assert_eq!(
            store.read_vector_blocking("red").unwrap(),
            Some(vec![1.0, 2.0, 3.0])
        );
        assert_eq!(store.reads(), 2);
    }

    #[test]
    fn test_unknown_word_is_absent() {
        let (index, bytes) = fixture();
        let store = VectorStore::new(index, bytes);
        assert_eq!(store.read_vector_blocking("blue").unwrap(), None);
        assert_eq!(store.reads(), 0);
    }

    #[test]
    fn test_truncated_source_is_partial_read() {
        let (index, mut bytes) = fixture();
        bytes.truncate(bytes.len() - 2);
        let store = VectorStore::new(index, bytes);

        let err = store.read_vector_blocking("green").unwrap_err();
        assert!(matches!(
            err,
            SemvecError::PartialRead {
                expected: 12,
                actual: 10,
                ..
            }
        ));
        // Other lookups are unaffected.
        assert!(store.read_vector_blocking("red").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_async_read() {
        let (index, bytes) = fixture();
        let store = Arc::new(VectorStore::new(index, bytes));
        let (a, b) = tokio::join!(store.read_vector("red"), store.read_vector("nope"));
        assert_eq!(a.unwrap(), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(b.unwrap(), None);
    }

    #[test]
    fn test_file_source() {
        let (index, bytes) = fixture();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("vectors.bin");
        std::fs::write(&path, &bytes).unwrap();

        let store = VectorStore::new(index, File::open(&path).unwrap());
        assert_eq!(
            store.read_vector_blocking("red").unwrap(),
            Some(vec![1.0, 2.0, 3.0])
        );
    }
}
