use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading a snapshot capture. All of them are retryable from
/// the session with a reload.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed snapshot array: {0}")]
    Array(#[source] serde_json::Error),
}
