use std::string::FromUtf8Error;

use thiserror::Error;

/// Error type for rokv.
#[derive(Error, Debug)]
pub enum RokvError {
    /// IO error
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Serialization or deserialization error.
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
    /// Command argument is not valid UTF-8
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] FromUtf8Error),
    /// Lookup miss in the store index.
    #[error("no such key")]
    KeyNotFound,
    /// Bytes at an indexed range (or a records-file line) do not decode.
    #[error("corrupt record: {0}")]
    CorruptRecord(String),
    /// Timed out waiting for a reader from the pool.
    #[error("timeout securing reader from the pool")]
    PoolTimeout,
    /// The pool has been drained; no readers will become available.
    #[error("pool is drained, no readers available")]
    PoolDrained,
    /// A per-handle wait elapsed while draining the pool.
    #[error("timed out draining pool")]
    DrainTimeout,
    /// Invalid glob pattern in SCAN/HSCAN.
    #[error("parsing pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    /// Integer or cursor parse failure in a command argument.
    #[error("parsing {0}")]
    Parse(String),
    /// Error with a string message
    #[error("{0}")]
    StringError(String),
}

/// Custom result type for RokvError
pub type Result<T> = std::result::Result<T, RokvError>;
