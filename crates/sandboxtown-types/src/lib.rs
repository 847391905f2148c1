//! Shared type definitions for the SandboxTown simulation.
//!
//! This crate is the single source of truth for the data that flows between
//! the status machine, the environment controller, the run orchestrator, and
//! the telemetry layer. It contains no behavior beyond small helpers.
//!
//! # Modules
//!
//! - [`ids`] -- Agent and run identifiers
//! - [`enums`] -- Status, density, transition events, run mode, help routes
//! - [`structs`] -- Signal vectors, zones, and per-step telemetry records

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{AgentStatus, Density, HelpRoute, RunMode, TransitionEvent};
pub use ids::{AgentId, RunId};
pub use structs::{
    SIGNAL_MAX, SIGNAL_MIN, SignalReading, SignalVector, StepRecord, Zone, in_signal_domain,
};
