//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and run execution.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: sandboxtown_core::ConfigError,
    },

    /// Zone catalogue construction failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: sandboxtown_world::WorldError,
    },

    /// The run loop failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: sandboxtown_core::RunnerError,
    },

    /// Writing or summarising telemetry failed.
    #[error("telemetry error: {source}")]
    Telemetry {
        /// The underlying telemetry error.
        #[from]
        source: sandboxtown_telemetry::TelemetryError,
    },

    /// The drift source configuration is invalid.
    #[error("drift source error: {message}")]
    Drift {
        /// Description of the drift source failure.
        message: String,
    },
}
