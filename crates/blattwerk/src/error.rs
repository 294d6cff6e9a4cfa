//! Error types for Blattwerk.
//!
//! All fallible operations in the crate return [`Result`]. Per-page and
//! per-entry conversion failures are deliberately *not* represented here:
//! they are absorbed into a job's failure-reason map so that one bad page
//! never sinks a job. Only contract violations (duplicate insert, missing
//! job, closed worker queue) and I/O-level problems surface as errors.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using [`BlattwerkError`].
pub type Result<T> = std::result::Result<T, BlattwerkError>;

/// Main error type for all Blattwerk operations.
#[derive(Debug, Error)]
pub enum BlattwerkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("No job found for id {0}")]
    JobNotFound(Uuid),

    #[error("A job with id {0} already exists")]
    DuplicateJob(Uuid),

    #[error("Worker queue is closed")]
    QueueClosed,

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for BlattwerkError {
    fn from(err: serde_json::Error) -> Self {
        BlattwerkError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl BlattwerkError {
    /// Create a Validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// Create a Serialization error.
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
            source: None,
        }
    }
}
