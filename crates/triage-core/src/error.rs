//! Error types for inbox triage.

use thiserror::Error;

/// Result type alias using triage's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for triage operations.
///
/// Every variant is recoverable: the overlay stays usable after any single
/// failure and the action that produced it leaves state as it was.
#[derive(Error, Debug)]
pub enum Error {
    /// Tag query against the host datastore failed
    #[error("Query error: {0}")]
    Query(String),

    /// Block-tree retrieval failed (or returned malformed blocks) for a page
    #[error("Fetch error for page {page}: {message}")]
    Fetch { page: String, message: String },

    /// Host refused or failed to delete a page
    #[error("Delete error: {0}")]
    Delete(String),

    /// Host refused or failed to create a page
    #[error("Create error: {0}")]
    Create(String),

    /// Inference server unreachable or returned a non-2xx status
    #[error("Inference HTTP error{}: {message}", .status.map(|s| format!(" (status {})", s)).unwrap_or_default())]
    InferenceHttp {
        status: Option<u16>,
        message: String,
    },

    /// Inference response body or streamed fragment could not be parsed
    #[error("Inference parse error: {0}")]
    InferenceParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation needs a current page but the inbox is empty
    #[error("Inbox is empty")]
    EmptyInbox,

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Build a fetch error for the named page.
    pub fn fetch(page: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Fetch {
            page: page.into(),
            message: message.into(),
        }
    }

    /// HTTP status attached to an inference failure, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::InferenceHttp { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
