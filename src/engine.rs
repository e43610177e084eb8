//! The engine handle consumed by the game layer.
//!
//! [`Engine::build`] loads the vocabulary, indexes the embedding file and
//! opens the lookup handle. Nothing can be queried before it returns, and
//! a failed build exposes no partial index. The resulting value is
//! immutable and can be shared behind an `Arc`.

use crate::config::{CacheConfig, Config, IndexConfig};
use crate::dictionary::load_dictionary;
use crate::error::{Result, ResultExt, SemvecError};
use crate::index::{IndexBuilder, VectorIndex};
use crate::logging::OperationGuard;
use crate::neighbors::{NeighborCache, TopKList};
use crate::perf::{self, Timer};
use crate::similarity::{SimilarityEngine, SimilarityScore};
use crate::store::VectorStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Default neighbour count requested by the game.
pub const DEFAULT_TOP_COUNT: usize = 2000;

/// Diagnostic summary of a built engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub indexed_words: usize,
    pub declared_records: u64,
    pub records_scanned: u64,
    pub dimension: usize,
    pub file_len: u64,
    pub max_neighbors: usize,
}

/// Word-vector similarity engine.
#[derive(Debug)]
pub struct Engine {
    store: Arc<VectorStore>,
    similarity: SimilarityEngine,
    neighbors: NeighborCache,
}

impl Engine {
    /// Validate `config` and build the engine.
    ///
    /// # Errors
    ///
    /// Any startup error: `Config`, `Format`, `Truncation`, `Consistency`.
    pub async fn build(config: &Config) -> Result<Self> {
        let index_config = config.index_config()?;
        Self::build_with(index_config, config.cache.clone()).await
    }

    /// Build from already validated settings.
    ///
    /// # Errors
    ///
    /// See [`Self::build`].
    pub async fn build_with(index_config: IndexConfig, cache: CacheConfig) -> Result<Self> {
        if cache.max_neighbors == 0 {
            return Err(SemvecError::config(
                "max_neighbors",
                "must be greater than zero",
            ));
        }

        let guard = OperationGuard::new("build word vector index");
        let timer = Timer::start(perf::INDEX_BUILD);
        let built = tokio::task::spawn_blocking(move || {
            let vocabulary =
                load_dictionary(&index_config.dictionary_filename, index_config.buffer_size)?;
            info!(words = vocabulary.len(), "Loaded vocabulary");
            IndexBuilder::new(&vocabulary, &index_config)
                .build_from_path(&index_config.word_vector_filename)
        })
        .await
        .context("index build task failed")?;

        let (index, file) = match built {
            Ok(parts) => parts,
            Err(e) => {
                guard.fail(&e);
                return Err(e);
            }
        };
        timer.stop();
        guard.complete();

        Ok(Self::from_index(index, file, &cache))
    }

    fn from_index(
        index: VectorIndex,
        source: impl crate::store::VectorSource,
        cache: &CacheConfig,
    ) -> Self {
        let store = Arc::new(VectorStore::new(Arc::new(index), source));
        Self {
            similarity: SimilarityEngine::new(Arc::clone(&store)),
            neighbors: NeighborCache::new(Arc::clone(&store), &cache.directory, cache.max_neighbors),
            store,
        }
    }

    /// Cosine similarity of two words, or `None` if either is unknown.
    ///
    /// # Errors
    ///
    /// `PartialRead` or IO errors from the lookup.
    pub async fn similarity(&self, a: &str, b: &str) -> Result<Option<SimilarityScore>> {
        let timer = Timer::start(perf::SIMILARITY);
        let score = self.similarity.similarity(a, b).await;
        timer.stop();
        score
    }

    /// The `count` nearest neighbours of `word`, or `None` if it is unknown.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero `count`, otherwise lookup and cache
    /// errors; see [`NeighborCache::top_similar`].
    pub async fn top_similarity(&self, word: &str, count: usize) -> Result<Option<TopKList>> {
        if count == 0 {
            return Err(SemvecError::invalid_argument("count must be at least 1"));
        }
        self.neighbors.top_similar(word, count).await
    }

    /// Every indexed word in embedding-file order. Call again to restart.
    pub fn word_list(&self) -> impl ExactSizeIterator<Item = &str> + Clone + '_ {
        self.store.index().words()
    }

    #[must_use]
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    #[must_use]
    pub const fn neighbors(&self) -> &NeighborCache {
        &self.neighbors
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        let index = self.store.index();
        EngineStats {
            indexed_words: index.len(),
            declared_records: index.header().vocabulary_size,
            records_scanned: index.records_scanned(),
            dimension: index.dimension(),
            file_len: index.file_len(),
            max_neighbors: self.neighbors.max_neighbors(),
        }
    }
}
