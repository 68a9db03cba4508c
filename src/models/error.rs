//! Error types for mimesis.
//!
//! Generation failures fall into two camps: constraint failures the caller
//! can relax, and data failures (bad archive, bad dataset) the caller must
//! fix before anything can run.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for mimesis.
#[derive(Debug, Error)]
pub enum MimesisError {
    /// No consistent sample exists and no further relaxation is allowed.
    #[error(
        "no headers can be generated with the given constraints; relax or change some of the requirements"
    )]
    OverConstrained,

    /// The fingerprint body came back empty on every attempt even though the
    /// header side kept succeeding.
    #[error("failed to generate a consistent fingerprint after {attempts} attempts")]
    RetriesExhausted { attempts: usize },

    /// Network definition archive is missing, empty, or unparseable.
    #[error("malformed network definition at {path:?}: {reason}")]
    MalformedNetwork { path: PathBuf, reason: String },

    /// The input dataset could not be parsed.
    #[error("malformed dataset: {0}")]
    MalformedDataset(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl MimesisError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a malformed-network error.
    pub fn network(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedNetwork {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for mimesis.
pub type Result<T> = std::result::Result<T, MimesisError>;
