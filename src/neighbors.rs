//! Ranked nearest neighbours with a persistent per-word cache.
//!
//! A neighbour list is always computed at the configured maximum size and
//! persisted as a JSON array of `{word, similarity}` objects. Requests for
//! fewer entries are served by trimming the cached list, so the word alone
//! is a sufficient cache key.
//!
//! Cache files live under a namespace derived from the embedding file
//! (dimension, declared count, file length) and the list size, so a new
//! embedding file never reuses stale lists.
//!
//! Concurrent requests for the same uncached word share one computation
//! through an in-flight registry.

use crate::error::{Result, ResultExt, SemvecError};
use crate::logging::OperationGuard;
use crate::perf::{self, Timer};
use crate::similarity::{SimilarityScore, cosine_from_parts, dot, norm};
use crate::store::VectorStore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use tokio::sync::OnceCell;
use tracing::debug;

/// One neighbour of a query word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopKEntry {
    pub word: String,
    pub similarity: SimilarityScore,
}

/// Neighbours ordered by descending similarity; never contains the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopKList(Vec<TopKEntry>);

/// Similarity of the 1st, 10th, 100th and 1000th nearest neighbours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Milestones {
    pub nearest: Option<SimilarityScore>,
    pub tenth: Option<SimilarityScore>,
    pub hundredth: Option<SimilarityScore>,
    pub thousandth: Option<SimilarityScore>,
}

impl TopKList {
    #[must_use]
    pub fn entries(&self) -> &[TopKEntry] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TopKEntry> {
        self.0.iter()
    }

    /// The first `count` entries.
    #[must_use]
    pub fn truncated(&self, count: usize) -> Self {
        Self(self.0.iter().take(count).cloned().collect())
    }

    /// 1-based rank of `word` in the list.
    #[must_use]
    pub fn rank_of(&self, word: &str) -> Option<usize> {
        self.0.iter().position(|e| e.word == word).map(|i| i + 1)
    }

    #[must_use]
    pub fn milestones(&self) -> Milestones {
        let at = |rank: usize| self.0.get(rank - 1).map(|e| e.similarity);
        Milestones {
            nearest: at(1),
            tenth: at(10),
            hundredth: at(100),
            thousandth: at(1000),
        }
    }
}

impl<'a> IntoIterator for &'a TopKList {
    type Item = &'a TopKEntry;
    type IntoIter = std::slice::Iter<'a, TopKEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Rank every indexed word other than `word` against it.
///
/// Iterates in index order and sorts stably, so ties keep file order.
/// Returns `Ok(None)` if `word` is not indexed.
///
/// # Errors
///
/// Propagates vector read failures.
pub fn compute_top_k(store: &VectorStore, word: &str, k: usize) -> Result<Option<TopKList>> {
    let Some(query) = store.read_vector_blocking(word)? else {
        return Ok(None);
    };
    let query_norm = norm(&query);

    let index = store.index();
    let mut ranked = Vec::with_capacity(index.len().saturating_sub(1));
    for other in index.words() {
        if other == word {
            continue;
        }
        let Some(vector) = store.read_vector_blocking(other)? else {
            continue;
        };
        ranked.push(TopKEntry {
            word: other.to_string(),
            similarity: cosine_from_parts(dot(&query, &vector), query_norm, norm(&vector)),
        });
    }

    ranked.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    ranked.truncate(k);
    Ok(Some(TopKList(ranked)))
}

/// Directory-backed store of neighbour lists, one JSON file per word.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Cache rooted at `directory/namespace`.
    #[must_use]
    pub fn new(directory: &Path, namespace: &str) -> Self {
        Self {
            root: directory.join(namespace),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the list for `word`.
    #[must_use]
    pub fn path_for(&self, word: &str) -> PathBuf {
        self.root.join(format!("{}.json", encode_key(word)))
    }

    /// Load the cached list for `word`, if any.
    ///
    /// # Errors
    ///
    /// `CacheCorrupted` if the file does not decode, or the IO error.
    pub async fn load(&self, word: &str) -> Result<Option<TopKList>> {
        let path = self.path_for(word);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SemvecError::path_error("read", path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| SemvecError::CacheCorrupted {
                path,
                reason: e.to_string(),
            })
    }

    /// Persist `list` for `word`. The file appears atomically.
    ///
    /// # Errors
    ///
    /// Returns the IO or serialization error.
    pub async fn save(&self, word: &str, list: &TopKList) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| SemvecError::path_error("create", &self.root, e))?;

        let path = self.path_for(word);
        let tmp = self.root.join(format!(
            "{}.tmp-{}-{}",
            encode_key(word),
            std::process::id(),
            TMP_COUNTER.fetch_add(1, AtomicOrdering::Relaxed)
        ));
        let payload = serde_json::to_vec(list)?;

        let written = match tokio::fs::write(&tmp, payload).await {
            Ok(()) => tokio::fs::rename(&tmp, &path)
                .await
                .map_err(|e| SemvecError::path_error("rename", &path, e)),
            Err(e) => Err(SemvecError::path_error("write", &tmp, e)),
        };
        if written.is_err() {
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        written
    }
}

/// Distinguishes temporary files of concurrent writers in one process.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Percent-encode every byte outside `[A-Za-z0-9_-]`.
#[must_use]
pub fn encode_key(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    for byte in word.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

type InFlight = Arc<OnceCell<Option<Arc<TopKList>>>>;

/// Computes, persists and serves nearest-neighbour lists.
pub struct NeighborCache {
    store: Arc<VectorStore>,
    cache: CacheStore,
    max_neighbors: usize,
    in_flight: Mutex<HashMap<String, InFlight>>,
    computations: AtomicU64,
}

impl std::fmt::Debug for NeighborCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeighborCache")
            .field("root", &self.cache.root())
            .field("max_neighbors", &self.max_neighbors)
            .field("computations", &self.computations())
            .finish_non_exhaustive()
    }
}

impl NeighborCache {
    /// Cache under `directory`, namespaced by the store's embedding file.
    #[must_use]
    pub fn new(store: Arc<VectorStore>, directory: &Path, max_neighbors: usize) -> Self {
        let namespace = namespace(&store, max_neighbors);
        Self {
            cache: CacheStore::new(directory, &namespace),
            store,
            max_neighbors,
            in_flight: Mutex::new(HashMap::new()),
            computations: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn cache_store(&self) -> &CacheStore {
        &self.cache
    }

    #[must_use]
    pub const fn max_neighbors(&self) -> usize {
        self.max_neighbors
    }

    /// Vocabulary-wide scans performed so far.
    #[must_use]
    pub fn computations(&self) -> u64 {
        self.computations.load(AtomicOrdering::Relaxed)
    }

    /// The `count` nearest neighbours of `word`, or `None` if it is not
    /// indexed. `count` is capped at the configured maximum.
    ///
    /// # Errors
    ///
    /// Vector read failures, cache IO failures and corrupted cache files.
    pub async fn top_similar(&self, word: &str, count: usize) -> Result<Option<TopKList>> {
        if !self.store.index().contains(word) {
            return Ok(None);
        }
        let full = self.full_list(word).await?;
        Ok(full.map(|list| list.truncated(count.min(self.max_neighbors))))
    }

    async fn full_list(&self, word: &str) -> Result<Option<Arc<TopKList>>> {
        let cell = Arc::clone(
            self.in_flight
                .lock()
                .entry(word.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        );

        let result = cell
            .get_or_try_init(|| self.load_or_compute(word))
            .await
            .cloned();

        let mut in_flight = self.in_flight.lock();
        if in_flight.get(word).is_some_and(|c| Arc::ptr_eq(c, &cell)) {
            in_flight.remove(word);
        }
        result
    }

    async fn load_or_compute(&self, word: &str) -> Result<Option<Arc<TopKList>>> {
        let timer = Timer::start(perf::NEIGHBORS_CACHED);
        if let Some(list) = self.cache.load(word).await? {
            debug!(word, entries = list.len(), "Neighbour cache hit");
            timer.stop();
            return Ok(Some(Arc::new(list)));
        }
        debug!(word, "Neighbour cache miss");

        let guard = OperationGuard::new(format!("top {} neighbours of '{word}'", self.max_neighbors));
        let timer = Timer::start(perf::NEIGHBORS_SCAN);
        match self.compute_and_persist(word).await {
            Ok(list) => {
                timer.stop();
                guard.complete();
                Ok(list)
            }
            Err(e) => {
                guard.fail(&e);
                Err(e)
            }
        }
    }

    async fn compute_and_persist(&self, word: &str) -> Result<Option<Arc<TopKList>>> {
        let store = Arc::clone(&self.store);
        let owned = word.to_string();
        let k = self.max_neighbors;
        self.computations.fetch_add(1, AtomicOrdering::Relaxed);

        let computed = tokio::task::spawn_blocking(move || compute_top_k(&store, &owned, k))
            .await
            .with_context(|| format!("neighbour scan for '{word}' failed"))??;

        let Some(list) = computed else {
            return Ok(None);
        };
        self.cache.save(word, &list).await?;
        Ok(Some(Arc::new(list)))
    }
}

fn namespace(store: &VectorStore, max_neighbors: usize) -> String {
    let index = store.index();
    let header = index.header();
    format!(
        "{}x{}-{}-{}-k{max_neighbors}",
        header.dimension,
        header.vocabulary_size,
        index.file_len(),
        index.fingerprint()
    )
}
