//! Error types for the tree watcher.

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur in the tree watcher.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Root directory not found or not a directory.
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The dispatch task panicked or was aborted.
    #[error("watch worker failed: {0}")]
    Worker(String),
}
