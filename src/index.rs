//! Streaming index over a word2vec binary embedding file.
//!
//! File layout:
//!
//! ```text
//! <vocabulary size> <dimension>\n
//! <word> <dimension x f32 LE><word> <dimension x f32 LE>...
//! ```
//!
//! The builder makes one pass over the file with fixed-size reads and never
//! decodes vector bytes. It records, for each allowed word, the absolute
//! offset of that word's first vector byte. Lookups later read exactly
//! `dimension * 4` bytes at that offset.
//!
//! # Scan states
//!
//! | State             | Consumes until | On delimiter                         |
//! |-------------------|----------------|--------------------------------------|
//! | `HeaderCount`     | `0x20`         | parse vocabulary size                |
//! | `HeaderDimension` | `0x0A`         | parse dimension                      |
//! | `WordScan`        | `0x20`         | record word, go to `SkipVector`      |
//! | `SkipVector`      | -              | jump `dimension * 4` bytes forward   |
//!
//! When the skipped vector ends inside the current chunk, scanning resumes
//! in place. Otherwise the driver seeks past it before the next read.

use crate::config::IndexConfig;
use crate::dictionary::Vocabulary;
use crate::error::{Result, SemvecError};
use indexmap::IndexMap;
use ring::digest;
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, info};

/// Size in bytes of one stored vector component.
pub const COMPONENT_SIZE: usize = std::mem::size_of::<f32>();

/// Header line declared at the start of the embedding file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorFileHeader {
    pub vocabulary_size: u64,
    pub dimension: usize,
}

impl VectorFileHeader {
    /// Byte length of one vector record body.
    #[must_use]
    pub const fn vector_len(&self) -> usize {
        self.dimension * COMPONENT_SIZE
    }
}

/// Immutable word-to-offset index, in embedding-file order.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    header: VectorFileHeader,
    offsets: IndexMap<String, u64>,
    records_scanned: u64,
    file_len: u64,
}

impl VectorIndex {
    /// Offset of the first vector byte for `word`.
    #[must_use]
    pub fn offset(&self, word: &str) -> Option<u64> {
        self.offsets.get(word).copied()
    }

    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.offsets.contains_key(word)
    }

    /// Number of indexed words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    #[must_use]
    pub const fn header(&self) -> VectorFileHeader {
        self.header
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.header.dimension
    }

    /// Records present in the file, indexed or not.
    #[must_use]
    pub const fn records_scanned(&self) -> u64 {
        self.records_scanned
    }

    /// Length of the embedding file when it was indexed.
    #[must_use]
    pub const fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Indexed words in embedding-file order.
    pub fn words(&self) -> impl ExactSizeIterator<Item = &str> + Clone + '_ {
        self.offsets.keys().map(String::as_str)
    }

    /// `(word, offset)` pairs in embedding-file order.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = (&str, u64)> + '_ {
        self.offsets.iter().map(|(w, &o)| (w.as_str(), o))
    }

    /// SHA256 over the indexed words and their offsets, as 16 hex digits.
    ///
    /// Changes whenever the vocabulary or the word length limit changes
    /// which records are indexed.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use std::fmt::Write;

        let mut context = digest::Context::new(&digest::SHA256);
        for (word, offset) in self.entries() {
            context.update(word.as_bytes());
            context.update(&[0]);
            context.update(&offset.to_le_bytes());
        }
        let digest = context.finish();

        let mut out = String::with_capacity(16);
        for byte in &digest.as_ref()[..8] {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

/// Position of the streaming scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    HeaderCount,
    HeaderDimension,
    WordScan,
    SkipVector,
}

/// What the driver should do after a chunk has been fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feed {
    /// Whole chunk consumed; read the next bytes sequentially.
    Continue,
    /// Next read must start at this absolute offset.
    SeekTo(u64),
}

/// Builds a [`VectorIndex`] restricted to an allowed vocabulary.
#[derive(Debug)]
pub struct IndexBuilder<'a> {
    vocabulary: &'a Vocabulary,
    buffer_size: usize,
    max_header_size: usize,
    max_word_length: usize,
}

impl<'a> IndexBuilder<'a> {
    #[must_use]
    pub fn new(vocabulary: &'a Vocabulary, config: &IndexConfig) -> Self {
        Self {
            vocabulary,
            buffer_size: config.buffer_size.max(1),
            max_header_size: config.max_header_size,
            max_word_length: config.max_word_length,
        }
    }

    /// Open `path` and index it. Returns the index and the open file so
    /// lookups can share the handle.
    ///
    /// # Errors
    ///
    /// `Config` if the file cannot be opened, otherwise see [`Self::build`].
    pub fn build_from_path(&self, path: &Path) -> Result<(VectorIndex, File)> {
        let mut file = File::open(path)
            .map_err(|e| SemvecError::config(path, format!("cannot open word vectors: {e}")))?;
        let index = self.build(&mut file)?;
        Ok((index, file))
    }

    /// Scan `reader` from the start and build the index.
    ///
    /// # Errors
    ///
    /// - `Format` for a missing, oversized or non-numeric header, or an
    ///   empty word.
    /// - `Truncation` if the input ends inside a word or a vector.
    /// - `Consistency` if the record count differs from the header.
    pub fn build<R: Read + Seek>(&self, reader: &mut R) -> Result<VectorIndex> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let mut scanner = Scanner::new(self);
        let mut buffer = vec![0u8; self.buffer_size];
        let mut position = 0u64;

        loop {
            let bytes_read = read_chunk(reader, &mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            match scanner.feed(&buffer[..bytes_read], position)? {
                Feed::Continue => position += bytes_read as u64,
                Feed::SeekTo(next) => {
                    if next >= file_len {
                        position = next;
                        break;
                    }
                    reader.seek(SeekFrom::Start(next))?;
                    position = next;
                }
            }
        }

        let index = scanner.finish(position, file_len)?;
        info!(
            records = index.records_scanned,
            indexed = index.len(),
            dimension = index.dimension(),
            "Built word vector index"
        );
        Ok(index)
    }
}

fn read_chunk<R: Read>(reader: &mut R, buffer: &mut [u8]) -> std::io::Result<usize> {
    loop {
        match reader.read(buffer) {
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            other => return other,
        }
    }
}

struct Scanner<'b, 'a> {
    builder: &'b IndexBuilder<'a>,
    state: ScanState,
    field: Vec<u8>,
    field_start: u64,
    declared: u64,
    dimension: usize,
    vector_len: u64,
    pending_skip_end: u64,
    records: u64,
    offsets: IndexMap<String, u64>,
}

impl<'b, 'a> Scanner<'b, 'a> {
    fn new(builder: &'b IndexBuilder<'a>) -> Self {
        Self {
            builder,
            state: ScanState::HeaderCount,
            field: Vec::new(),
            field_start: 0,
            declared: 0,
            dimension: 0,
            vector_len: 0,
            pending_skip_end: 0,
            records: 0,
            offsets: IndexMap::new(),
        }
    }

    /// Consume `chunk`, which starts at absolute offset `start`.
    fn feed(&mut self, chunk: &[u8], start: u64) -> Result<Feed> {
        let mut i = 0usize;

        while i < chunk.len() {
            let here = start + i as u64;
            match self.state {
                ScanState::HeaderCount | ScanState::HeaderDimension => {
                    let delimiter = if self.state == ScanState::HeaderCount {
                        b' '
                    } else {
                        b'\n'
                    };
                    let window = self.header_window(&chunk[i..], here)?;
                    match memchr::memchr(delimiter, window) {
                        Some(j) => {
                            self.field.extend_from_slice(&window[..j]);
                            self.finish_header_field(here + j as u64)?;
                            i += j + 1;
                            if self.state == ScanState::WordScan {
                                self.field_start = start + i as u64;
                            }
                        }
                        None => {
                            self.field.extend_from_slice(window);
                            i += window.len();
                            if here + window.len() as u64 >= self.builder.max_header_size as u64 {
                                return Err(SemvecError::format(
                                    here + window.len() as u64,
                                    format!(
                                        "header line exceeds {} bytes",
                                        self.builder.max_header_size
                                    ),
                                ));
                            }
                        }
                    }
                }
                ScanState::WordScan => {
                    let rest = &chunk[i..];
                    // word2vec.c writes a line feed after each vector; skip it.
                    if self.field.is_empty() && rest[0] == b'\n' {
                        i += 1;
                        self.field_start = start + i as u64;
                        continue;
                    }
                    match memchr::memchr(b' ', rest) {
                        Some(j) => {
                            self.push_word_bytes(&rest[..j]);
                            let vector_offset = here + j as u64 + 1;
                            self.finish_word(vector_offset)?;
                            self.pending_skip_end =
                                vector_offset.checked_add(self.vector_len).ok_or_else(|| {
                                    SemvecError::format(
                                        vector_offset,
                                        "vector extends past addressable range",
                                    )
                                })?;
                            self.state = ScanState::SkipVector;
                            i += j + 1;
                        }
                        None => {
                            self.push_word_bytes(rest);
                            i = chunk.len();
                        }
                    }
                }
                ScanState::SkipVector => {
                    let chunk_end = start + chunk.len() as u64;
                    if self.pending_skip_end > chunk_end {
                        return Ok(Feed::SeekTo(self.pending_skip_end));
                    }
                    // The skip end lies in this chunk, so it fits in usize.
                    i = usize::try_from(self.pending_skip_end - start).unwrap_or(chunk.len());
                    self.state = ScanState::WordScan;
                    self.field_start = self.pending_skip_end;
                }
            }
        }

        // A vector ending exactly at the chunk boundary.
        if self.state == ScanState::SkipVector {
            let chunk_end = start + chunk.len() as u64;
            if self.pending_skip_end == chunk_end {
                self.state = ScanState::WordScan;
                self.field_start = chunk_end;
            } else {
                return Ok(Feed::SeekTo(self.pending_skip_end));
            }
        }
        Ok(Feed::Continue)
    }

    /// Clip `rest` so header parsing never looks past `max_header_size`.
    fn header_window<'c>(&self, rest: &'c [u8], here: u64) -> Result<&'c [u8]> {
        let limit = self.builder.max_header_size as u64;
        if here >= limit {
            return Err(SemvecError::format(
                here,
                format!("header line exceeds {limit} bytes"),
            ));
        }
        let allowed = usize::try_from(limit - here).unwrap_or(usize::MAX);
        Ok(&rest[..rest.len().min(allowed)])
    }

    fn finish_header_field(&mut self, delimiter_at: u64) -> Result<()> {
        let text = std::str::from_utf8(self.field.trim_ascii()).unwrap_or("");
        match self.state {
            ScanState::HeaderCount => {
                self.declared = text.parse().map_err(|_| {
                    SemvecError::format(
                        delimiter_at,
                        format!("vocabulary size '{text}' is not a number"),
                    )
                })?;
                self.state = ScanState::HeaderDimension;
            }
            ScanState::HeaderDimension => {
                let dimension: usize = text.parse().map_err(|_| {
                    SemvecError::format(delimiter_at, format!("dimension '{text}' is not a number"))
                })?;
                if dimension == 0 {
                    return Err(SemvecError::format(delimiter_at, "dimension must be non-zero"));
                }
                self.dimension = dimension;
                self.vector_len = dimension
                    .checked_mul(COMPONENT_SIZE)
                    .map(|n| n as u64)
                    .ok_or_else(|| SemvecError::format(delimiter_at, "dimension too large"))?;
                self.state = ScanState::WordScan;
                debug!(
                    declared = self.declared,
                    dimension, "Parsed word vector header"
                );
            }
            ScanState::WordScan | ScanState::SkipVector => {}
        }
        self.field.clear();
        Ok(())
    }

    /// Append word bytes, keeping at most one byte past `max_word_length`.
    /// That is enough to know the word will not be indexed.
    fn push_word_bytes(&mut self, bytes: &[u8]) {
        let room = (self.builder.max_word_length + 1).saturating_sub(self.field.len());
        self.field.extend_from_slice(&bytes[..bytes.len().min(room)]);
    }

    fn finish_word(&mut self, vector_offset: u64) -> Result<()> {
        if self.field.is_empty() {
            return Err(SemvecError::format(
                self.field_start,
                "empty word in record",
            ));
        }
        self.records += 1;

        if self.field.len() <= self.builder.max_word_length {
            if let Ok(word) = std::str::from_utf8(&self.field) {
                if self.vocabulary_contains(word) && !self.offsets.contains_key(word) {
                    self.offsets.insert(word.to_owned(), vector_offset);
                }
            }
        }
        self.field.clear();
        Ok(())
    }

    fn vocabulary_contains(&self, word: &str) -> bool {
        self.builder.vocabulary.contains(word)
    }

    fn finish(self, position: u64, file_len: u64) -> Result<VectorIndex> {
        match self.state {
            ScanState::HeaderCount | ScanState::HeaderDimension => {
                let reason = if file_len == 0 {
                    "no data in word vector file"
                } else if self.state == ScanState::HeaderCount {
                    "missing vocabulary size"
                } else {
                    "missing dimension"
                };
                return Err(SemvecError::format(position, reason));
            }
            ScanState::WordScan if !self.field.is_empty() => {
                return Err(SemvecError::truncation(
                    self.field_start,
                    "end of file while parsing word",
                ));
            }
            ScanState::SkipVector if self.pending_skip_end > file_len => {
                return Err(SemvecError::truncation(
                    file_len,
                    format!(
                        "vector ends at byte {} but file has {file_len} bytes",
                        self.pending_skip_end
                    ),
                ));
            }
            _ => {}
        }

        if self.records != self.declared {
            return Err(SemvecError::Consistency {
                declared: self.declared,
                found: self.records,
            });
        }

        Ok(VectorIndex {
            header: VectorFileHeader {
                vocabulary_size: self.declared,
                dimension: self.dimension,
            },
            offsets: self.offsets,
            records_scanned: self.records,
            file_len,
        })
    }
}

/// Encode an embedding file in the layout this module parses.
#[must_use]
pub fn encode_vector_file(dimension: usize, records: &[(&str, &[f32])]) -> Vec<u8> {
    let mut bytes = format!("{} {dimension}\n", records.len()).into_bytes();
    for (word, vector) in records {
        debug_assert_eq!(vector.len(), dimension, "vector dimension mismatch");
        bytes.extend_from_slice(word.as_bytes());
        bytes.push(b' ');
        for component in *vector {
            bytes.extend_from_slice(&component.to_le_bytes());
        }
    }
    bytes
}
