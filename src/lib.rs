//! semvec - word-vector similarity engine
//!
//! Indexes a word2vec binary embedding file restricted to an allowed
//! vocabulary, scores word pairs by cosine similarity and serves cached
//! nearest-neighbour lists.
//!
//! # Modules
//!
//! - [`dictionary`] - Allowed-vocabulary loading
//! - [`index`] - Streaming embedding-file index
//! - [`store`] - Random-access vector reads
//! - [`similarity`] - Cosine similarity
//! - [`neighbors`] - Ranked, persisted nearest neighbours
//! - [`engine`] - The handle the game layer consumes
//!
//! # Example
//!
//! ```no_run
//! # async fn run() -> semvec::Result<()> {
//! let config = semvec::Config::load(None)?;
//! let engine = semvec::Engine::build(&config).await?;
//!
//! if let Some(score) = engine.similarity("king", "queen").await? {
//!     println!("{score:.4}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod dictionary;
pub mod engine;
pub mod error;
pub mod index;
pub mod logging;
pub mod neighbors;
pub mod perf;
pub mod similarity;
pub mod store;

pub use config::Config;
pub use engine::{DEFAULT_TOP_COUNT, Engine, EngineStats};
pub use error::{Result, ResultExt, SemvecError, format_error};
pub use index::{VectorFileHeader, VectorIndex};
pub use neighbors::{Milestones, TopKEntry, TopKList};
pub use similarity::SimilarityScore;
pub use store::Vector;

/// Format a similarity for display, `"unknown"` when absent.
#[must_use]
pub fn format_similarity(score: Option<SimilarityScore>) -> String {
    score.map_or_else(|| "unknown".to_string(), |s| format!("{s:.5}"))
}

#[cfg(test)]
mod tests {
    use super::format_similarity;

    #[test]
    fn format_similarity_rounds_and_handles_absent() {
        assert_eq!(format_similarity(Some(std::f64::consts::FRAC_1_SQRT_2)), "0.70711");
        assert_eq!(format_similarity(Some(1.0)), "1.00000");
        assert_eq!(format_similarity(None), "unknown");
    }
}
