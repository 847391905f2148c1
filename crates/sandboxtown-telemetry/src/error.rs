//! Error types for the telemetry layer.
//!
//! All errors are propagated via [`TelemetryError`] which wraps the
//! underlying I/O and [`serde_json`] errors with context about which
//! operation failed.

use std::path::PathBuf;

/// Errors that can occur while writing or reading telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A line in a JSON Lines file could not be decoded.
    #[error("Malformed record at {path}:{line}: {source}")]
    MalformedLine {
        /// File being read.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// The decoding error.
        source: serde_json::Error,
    },

    /// A batch aggregation was requested over zero run summaries.
    #[error("Cannot aggregate an empty batch of run summaries")]
    EmptyBatch,

    /// The pause speed threshold is negative or not finite.
    #[error("Invalid pause speed threshold: {0}")]
    InvalidThreshold(f64),
}
