//! Error types for the bandwidth sweep.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a sweep.
///
/// Integrity mismatches are not errors: they are reported and the sweep
/// continues. Everything here is fatal for the whole group.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Configuration rejected before any worker started.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// This worker could not open the shared file.
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another worker could not open the shared file, so the collective open failed.
    #[error("collective open of {} failed on another worker", .path.display())]
    PeerOpen { path: PathBuf },

    /// Closing (flushing) the shared file failed on at least one worker.
    #[error("collective close of {} failed", .path.display())]
    Close { path: PathBuf },

    /// A positioned read or write returned an error.
    #[error("i/o error at offset {offset}: {source}")]
    Io {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// A positioned read or write failed on another worker.
    #[error("i/o on {} failed on another worker", .path.display())]
    PeerIo { path: PathBuf },

    /// A worker thread panicked; the group cannot make progress.
    #[error("worker {rank} panicked")]
    WorkerPanicked { rank: usize },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BenchError>;
