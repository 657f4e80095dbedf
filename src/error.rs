//! Error types shared across the indexing, repacking, search and retrieve paths.

use thiserror::Error;

/// The abstract error kinds named by the system's error-handling design.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed compressed payload: {0}")]
    Decode(String),

    #[error("malformed index entry: {0}")]
    MalformedIndex(String),

    #[error("record has no value for the configured key: {0}")]
    MissingKey(String),

    #[error("key not found in index")]
    KeyNotFound,

    #[error("unsupported compression kind (expected gzip or zstd magic bytes)")]
    UnsupportedCompression,

    #[error("index is not sorted by key in byte-lexicographic order")]
    UnsortedIndex,
}

pub type Result<T> = std::result::Result<T, Error>;
