//! Error types for chatlens-core

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the chatlens-core library
#[derive(Error, Debug)]
pub enum Error {
    /// The message archive does not exist at the expected path
    #[error("message archive not found at {}", .0.display())]
    ArchiveNotFound(PathBuf),

    /// The archive exists but could not be opened (permissions, corruption)
    #[error("message archive at {} is unreadable: {reason}", path.display())]
    ArchiveUnreadable { path: PathBuf, reason: String },

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A single row could not be decoded. Never fatal to a load.
    #[error("row decode error: {0}")]
    RowDecode(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Contacts source error
    #[error("contacts error: {0}")]
    Contacts(String),
}

impl Error {
    /// Whether this error aborts a whole load (as opposed to a single row).
    pub fn is_fatal_to_load(&self) -> bool {
        !matches!(self, Error::RowDecode(_))
    }
}

/// Result type alias for chatlens-core
pub type Result<T> = std::result::Result<T, Error>;
