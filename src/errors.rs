/*!
 * Error types for the epubtrans application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use thiserror::Error;

/// Errors observable through the translation session surface.
///
/// Every error a session backend can produce must classify into one of these
/// variants so the request client can decide between retrying, halting the
/// run, or surfacing the failure.
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    /// Transient service problem, eligible for retry with backoff
    #[error("Transient session error: {0}")]
    Transient(String),

    /// The session surface changed shape (selector/UI drift). Retried like a
    /// transient error but logged distinctly.
    #[error("Structural session error: {0}")]
    Structural(String),

    /// The service's usage quota is exhausted; terminal for the whole run
    #[error("Usage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The session is not authenticated and cannot accept a payload
    #[error("Session not authenticated: {0}")]
    NotAuthenticated(String),
}

impl SessionError {
    /// Whether another attempt against the same session can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Structural(_) | Self::NotAuthenticated(_))
    }
}

/// Failure modes of one logical request after the client has exhausted
/// its own recovery options
#[derive(Error, Debug, Clone)]
pub enum RequestError {
    /// No authentication was detected within the allowed wait; fatal for the run
    #[error("Authentication was not detected within {0} seconds")]
    AuthenticationTimeout(u64),

    /// All retry attempts failed; carries the last observed error
    #[error("All attempts failed, last error: {0}")]
    Exhausted(String),
}

/// Errors raised while driving the per-item pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Translated chunk split into a different number of segments than submitted
    #[error("Alignment failure in item '{item_id}': expected {expected} segments, got {actual}")]
    Alignment {
        /// Identifier of the offending content item
        item_id: String,
        /// Number of segments submitted in the chunk
        expected: usize,
        /// Number of segments parsed from the translated chunk
        actual: usize,
    },

    /// A checkpoint write failed; degrades resumability for that line only
    #[error("Checkpoint persistence failed: {0}")]
    Persistence(String),

    /// A leaf replacement failed; the original-language leaf is kept
    #[error("Reconstruction failed for leaf {leaf_index}: {message}")]
    Reconstruction {
        /// Positional index of the leaf within its item
        leaf_index: usize,
        /// Underlying failure description
        message: String,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the translation session
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Error from a logical translation request
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Error from the translation pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
