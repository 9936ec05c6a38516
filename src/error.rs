//! Typed errors for failures callers may want to match on
//!
//! Everything else travels as `anyhow::Error` with context attached.

use thiserror::Error;

/// Problems with the tabular input itself
#[derive(Debug, Error)]
pub enum InputError {
    #[error("column '{column}' not found in {source_name} (available: {available})")]
    MissingColumn {
        column: String,
        source_name: String,
        available: String,
    },

    #[error("invalid id hash key '{0}' (expected 'content' or 'meta')")]
    InvalidHashKey(String),

    #[error("malformed CSV in {source_name}: {message}")]
    MalformedCsv { source_name: String, message: String },

    #[error("duplicate document id {0}")]
    DuplicateDocument(String),
}

/// Invalid command-line usage detected before any I/O
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("No metadata columns or queries specified! Pass at least one -m or -q.")]
    NothingToExtract,

    #[error("chunk size must be at least 1")]
    ZeroChunkSize,

    #[error("{0} top_k must be at least 1")]
    ZeroTopK(&'static str),
}
