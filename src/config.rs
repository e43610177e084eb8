//! Configuration system for semvec.
//!
//! Provides layered configuration from multiple sources:
//!
//! 1. **Compiled defaults** - Sensible defaults built into the binary
//! 2. **Config file** - `--config <path>` or `~/.config/semvec/config.toml`
//! 3. **Environment variables** - `SEMVEC_*` prefix
//! 4. **CLI arguments** - Highest priority, always wins
//!
//! # Example Configuration File
//!
//! ```toml
//! [dictionary]
//! dictionary_filename = "data/dictionary.txt"
//! word_vector_filename = "data/GoogleNews-vectors-negative300.bin"
//! buffer_size = 65536
//! max_header_size = 1024
//! max_word_length = 64
//!
//! [cache]
//! directory = "data/similarity"
//! max_neighbors = 2000
//! ```

use crate::error::{Result, SemvecError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default number of nearest neighbours computed and cached per word.
pub const DEFAULT_MAX_NEIGHBORS: usize = 2000;

/// Main configuration structure for semvec.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input files and streaming-scan parameters.
    pub dictionary: DictionaryConfig,
    /// Nearest-neighbour cache settings.
    pub cache: CacheConfig,
}

/// Input file configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryConfig {
    /// Newline-delimited list of allowed words.
    /// Environment variable: `SEMVEC_DICTIONARY`
    pub dictionary_filename: Option<PathBuf>,

    /// Binary word2vec embedding file.
    /// Environment variable: `SEMVEC_VECTORS`
    pub word_vector_filename: Option<PathBuf>,

    /// Read chunk size for streaming scans, in bytes.
    pub buffer_size: usize,

    /// Bytes reserved to parse the header line.
    pub max_header_size: usize,

    /// Longest word (in bytes) that is indexed.
    pub max_word_length: usize,
}

/// Nearest-neighbour cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding persisted neighbour lists.
    /// Environment variable: `SEMVEC_CACHE_DIR`
    pub directory: PathBuf,

    /// Neighbour lists are always computed at this size and trimmed per request.
    /// Environment variable: `SEMVEC_MAX_NEIGHBORS`
    pub max_neighbors: usize,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            dictionary_filename: None,
            word_vector_filename: None,
            buffer_size: 64 * 1024,
            max_header_size: 1024,
            max_word_length: 64,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data/similarity"),
            max_neighbors: DEFAULT_MAX_NEIGHBORS,
        }
    }
}

/// Fully validated settings consumed by index construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    pub dictionary_filename: PathBuf,
    pub word_vector_filename: PathBuf,
    pub buffer_size: usize,
    pub max_header_size: usize,
    pub max_word_length: usize,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// An explicit `path` replaces the user config file location. A
    /// missing explicit file is an error; a missing user file is not.
    ///
    /// # Errors
    ///
    /// Returns `SemvecError::Config` if an explicit config file cannot be
    /// read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        match path {
            Some(path) => config = Self::load_from_file(path)?,
            None => {
                if let Some(user_config) = Self::load_user_config() {
                    config = user_config;
                }
            }
        }

        config.apply_env_overrides();

        debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `SemvecError::Config` if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SemvecError::config(path, format!("cannot read config: {e}")))?;
        let config = toml::from_str(&content)
            .map_err(|e| SemvecError::config(path, format!("cannot parse config: {e}")))?;
        info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    fn load_user_config() -> Option<Self> {
        let config_path = Self::user_config_path()?;
        if !config_path.exists() {
            debug!("Config file not found: {}", config_path.display());
            return None;
        }
        match Self::load_from_file(&config_path) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Ignoring user config: {e}");
                None
            }
        }
    }

    /// Get the path to the user configuration file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("semvec").join("config.toml"))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("SEMVEC_DICTIONARY") {
            self.dictionary.dictionary_filename = Some(PathBuf::from(path));
        }
        if let Some(path) = var("SEMVEC_VECTORS") {
            self.dictionary.word_vector_filename = Some(PathBuf::from(path));
        }
        if let Some(n) = var("SEMVEC_BUFFER_SIZE").and_then(|v| v.parse().ok()) {
            self.dictionary.buffer_size = n;
        }
        if let Some(n) = var("SEMVEC_MAX_HEADER_SIZE").and_then(|v| v.parse().ok()) {
            self.dictionary.max_header_size = n;
        }
        if let Some(n) = var("SEMVEC_MAX_WORD_LENGTH").and_then(|v| v.parse().ok()) {
            self.dictionary.max_word_length = n;
        }
        if let Some(dir) = var("SEMVEC_CACHE_DIR") {
            self.cache.directory = PathBuf::from(dir);
        }
        if let Some(n) = var("SEMVEC_MAX_NEIGHBORS").and_then(|v| v.parse().ok()) {
            self.cache.max_neighbors = n;
        }
    }

    /// Validate the dictionary section into the settings index
    /// construction needs.
    ///
    /// # Errors
    ///
    /// Returns `SemvecError::Config` if a filename is missing or a size is zero.
    pub fn index_config(&self) -> Result<IndexConfig> {
        let d = &self.dictionary;
        let dictionary_filename = d
            .dictionary_filename
            .clone()
            .ok_or_else(|| SemvecError::config("dictionary_filename", "not configured"))?;
        let word_vector_filename = d
            .word_vector_filename
            .clone()
            .ok_or_else(|| SemvecError::config("word_vector_filename", "not configured"))?;

        for (name, value) in [
            ("buffer_size", d.buffer_size),
            ("max_header_size", d.max_header_size),
            ("max_word_length", d.max_word_length),
        ] {
            if value == 0 {
                return Err(SemvecError::config(name, "must be greater than zero"));
            }
        }

        Ok(IndexConfig {
            dictionary_filename,
            word_vector_filename,
            buffer_size: d.buffer_size,
            max_header_size: d.max_header_size,
            max_word_length: d.max_word_length,
        })
    }

    /// Generate a default configuration file content.
    #[must_use]
    pub fn default_config_content() -> String {
        let mut config = Self::default();
        config.dictionary.dictionary_filename = Some(PathBuf::from("data/dictionary.txt"));
        config.dictionary.word_vector_filename = Some(PathBuf::from("data/vectors.bin"));
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}
