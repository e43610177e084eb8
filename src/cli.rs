//! CLI definitions for semvec.
//!
//! Uses clap for argument parsing with derive macros.

use crate::logging::LogLevel;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// semvec - word-vector similarity engine
#[derive(Parser, Debug)]
#[command(name = "semvec")]
#[command(version)]
#[command(about = "Score word similarity and nearest neighbours from word2vec embeddings")]
#[command(long_about = r#"
semvec indexes a word2vec binary embedding file, restricted to an allowed
vocabulary, and answers cosine-similarity and nearest-neighbour queries.

Quick start:
  1. Write a config: semvec config --init > ~/.config/semvec/config.toml
  2. Point dictionary_filename and word_vector_filename at your files
  3. Query: semvec similarity king queen
"#)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, short = 'c', env = "SEMVEC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Vocabulary file (overrides config)
    #[arg(long, global = true)]
    pub dictionary: Option<PathBuf>,

    /// Word vector file (overrides config)
    #[arg(long, global = true)]
    pub vectors: Option<PathBuf>,

    /// Neighbour cache directory (overrides config)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Be verbose (show debug info)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Be quiet (suppress non-error output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Log level: error, warn, info, debug, trace or off (overrides -v/-q)
    #[arg(long, env = "SEMVEC_LOG_LEVEL", global = true, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cosine similarity between two words
    Similarity(SimilarityArgs),

    /// Nearest neighbours of a word (computed once, then cached)
    Top(TopArgs),

    /// List every indexed word in file order
    Words,

    /// Show index statistics
    Stats,

    /// Show the effective configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct SimilarityArgs {
    pub first: String,
    pub second: String,
}

#[derive(Args, Debug)]
pub struct TopArgs {
    pub word: String,

    /// Number of neighbours to return
    #[arg(long, short = 'n', default_value_t = crate::DEFAULT_TOP_COUNT)]
    pub count: usize,

    /// Also print the 1st/10th/100th/1000th neighbour similarities
    #[arg(long)]
    pub milestones: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Print a starter configuration file instead
    #[arg(long)]
    pub init: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}
