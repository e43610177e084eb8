//! Custom error types for semvec.
//!
//! Startup failures (configuration, header, truncation, record count) abort
//! index construction. Lookup failures are local to the lookup that hit
//! them. A word missing from the index is never an error: lookups return
//! `None` for it.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for semvec operations.
#[derive(Error, Debug)]
pub enum SemvecError {
    // =========================================================================
    // Startup Errors
    // =========================================================================
    /// A required input is missing, unreadable, or a setting is invalid.
    #[error("Configuration error for '{path}': {reason}")]
    Config { path: PathBuf, reason: String },

    /// Header fields missing or non-numeric, or a malformed record.
    #[error("Malformed word vector file at byte {offset}: {reason}")]
    Format { offset: u64, reason: String },

    /// A record's word or vector bytes end before completion.
    #[error("Word vector file truncated at byte {offset}: {reason}")]
    Truncation { offset: u64, reason: String },

    /// Parsed record count disagrees with the declared vocabulary size.
    #[error("Word vector file declares {declared} records but contains {found}")]
    Consistency { declared: u64, found: u64 },

    // =========================================================================
    // Lookup Errors
    // =========================================================================
    /// A vector read returned fewer bytes than the dimension requires.
    #[error(
        "Partial read for word vector '{word}' at byte {offset}: expected {expected} bytes, got {actual}"
    )]
    PartialRead {
        word: String,
        offset: u64,
        expected: usize,
        actual: usize,
    },

    /// A persisted neighbour list could not be decoded.
    #[error("Similarity cache entry '{path}' is corrupted: {reason}")]
    CacheCorrupted { path: PathBuf, reason: String },

    // =========================================================================
    // IO Errors
    // =========================================================================
    /// File read/write error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Path-specific IO error with context.
    #[error("Failed to {operation} '{path}': {source}")]
    Path {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cache payload serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    /// Invalid command-line or API argument.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Catch-all for other errors with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type alias for semvec operations.
pub type Result<T> = std::result::Result<T, SemvecError>;

impl SemvecError {
    /// Create a configuration error.
    pub fn config(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a format error at the given byte offset.
    pub fn format(offset: u64, reason: impl Into<String>) -> Self {
        Self::Format {
            offset,
            reason: reason.into(),
        }
    }

    /// Create a truncation error at the given byte offset.
    pub fn truncation(offset: u64, reason: impl Into<String>) -> Self {
        Self::Truncation {
            offset,
            reason: reason.into(),
        }
    }

    /// Create a path error with context.
    pub fn path_error(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Path {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Wrap an error with additional context.
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Check if this error aborts index construction.
    #[must_use]
    pub const fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::Format { .. }
                | Self::Truncation { .. }
                | Self::Consistency { .. }
        )
    }

    /// Check if this error is a lookup-time internal failure, as opposed to
    /// bad input or a startup failure.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        !matches!(self, Self::InvalidArgument { .. }) && !self.is_startup_fatal()
    }

    /// Get a suggestion for how to fix this error, if applicable.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Config { .. } => Some(
                "Check the [dictionary] section of the config file or the SEMVEC_* environment variables.",
            ),
            Self::Format { .. } | Self::Consistency { .. } => {
                Some("Verify the word vector file is in word2vec binary format.")
            }
            Self::Truncation { .. } | Self::PartialRead { .. } => {
                Some("The word vector file looks truncated. Re-download or restore it.")
            }
            Self::CacheCorrupted { .. } => {
                Some("Delete the similarity cache directory to force recomputation.")
            }
            _ => None,
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped with additional context.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily (only evaluated on error).
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped with additional context.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| SemvecError::with_context(context, e))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| SemvecError::with_context(f(), e))
    }
}

// =============================================================================
// CLI Error Formatting
// =============================================================================

use colored::Colorize;

/// Format a structured CLI error with explanation and suggestions.
#[must_use]
pub fn format_error(title: &str, explanation: &str, suggestions: &[&str]) -> String {
    use std::fmt::Write;

    let mut output = format!("{} {}", "✗".red().bold(), title.bold());

    if !explanation.is_empty() {
        let _ = write!(output, "\n\n   {explanation}");
    }

    if !suggestions.is_empty() {
        output.push_str("\n\n   ");
        if suggestions.len() == 1 {
            let _ = write!(output, "{} {}", "Hint:".cyan(), suggestions[0]);
        } else {
            let _ = write!(output, "{}:", "Try".cyan());
            for suggestion in suggestions {
                let _ = write!(output, "\n     {} {}", "•".dimmed(), suggestion);
            }
        }
    }

    output
}
