// Typed errors for the sampler, record validation and the on-disk repo.

use std::path::PathBuf;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("invalid feed url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to connect to feed: {0}")]
    Connect(#[source] Box<tungstenite::Error>),

    #[error("feed transport error: {0}")]
    Feed(#[source] Box<tungstenite::Error>),

    /// A frame that is not JSON means the feed speaks something we don't.
    #[error("malformed feed message: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("ts is not an RFC 3339 timestamp: {0}")]
    Timestamp(String),

    #[error("duration_sec must be finite, got {0}")]
    Duration(f64),

    #[error("total {total} does not match sum of counts {sum}")]
    TotalMismatch { total: u64, sum: u64 },

    #[error("sum of counts overflows u64")]
    Overflow,
}

#[derive(Debug, Error, PartialEq)]
pub enum MergeError {
    #[error("sample {index} ({ts}) is invalid: {source}")]
    Invalid {
        index: usize,
        ts: String,
        #[source]
        source: RecordError,
    },

    #[error("total_events overflows u64 at sample {index}")]
    TotalOverflow { index: usize },

    #[error("cumulative count for {label} overflows u64 at sample {index}")]
    CountOverflow { index: usize, label: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed json in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid sample record {}: {source}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: RecordError,
    },

    #[error("{} already exists", path.display())]
    Exists { path: PathBuf },

    #[error("failed to encode json: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("aggregation failed: {0}")]
    Merge(#[from] MergeError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
