use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by music library collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    /// The zone player backing the library could not be reached
    #[error("Music library unavailable: {0}")]
    Unavailable(String),

    /// No playlist carries the requested title
    #[error("Playlist not found: {0}")]
    PlaylistNotFound(String),
}

/// Errors that can occur while loading, materializing or activating page sets
#[derive(Error, Debug)]
pub enum PageSetError {
    /// The configuration file could not be read
    #[error("Failed to read page-set configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration document is not valid JSON for the expected schema
    #[error("Invalid page-set configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document parsed but a page set or section is inconsistent
    #[error("Invalid page set '{tag}': {reason}")]
    Invalid { tag: String, reason: String },

    /// No page set is configured for an RFID tag payload
    #[error("Unknown page-set tag: {0}")]
    UnknownTag(String),

    /// The configuration holds no page sets at all
    #[error("Page-set configuration is empty")]
    Empty,

    /// The music library failed while materializing a page set
    #[error("Failed to materialize page set '{tag}': {source}")]
    Library {
        tag: String,
        #[source]
        source: LibraryError,
    },
}

/// Result type for page-set operations
pub type Result<T> = std::result::Result<T, PageSetError>;
