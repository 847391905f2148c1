//! Per-agent logic for the SandboxTown simulation.
//!
//! Everything in this crate is pure: no I/O, no randomness, no global
//! state. It sits between `sandboxtown-types` (data) and `sandboxtown-core`
//! (orchestration).
//!
//! # Modules
//!
//! - [`agent`] -- Agent state, counters, and the per-run roster ([`AgentRoster`])
//! - [`config`] -- Hysteresis thresholds ([`Thresholds`])
//! - [`contagion`] -- Population-field modulation of the stability input
//! - [`error`] -- Error types for all agent operations ([`AgentError`])
//! - [`help_router`] -- Routing of help requests
//! - [`mode_gate`] -- `Visual` / `Headless` presentation gate
//! - [`status`] -- The hysteresis status evaluator

pub mod agent;
pub mod config;
pub mod contagion;
pub mod error;
pub mod help_router;
pub mod mode_gate;
pub mod status;

// Re-export primary types at crate root for convenience.
pub use agent::{Agent, AgentRoster, AgentUpdate, StepChange};
pub use config::Thresholds;
pub use contagion::{ContagionConfig, FieldRule, apply_contagion, population_field};
pub use error::AgentError;
pub use help_router::{HelpAvailability, HelpDecision, route_help};
pub use mode_gate::{ModeDecision, enforce_mode};
pub use status::{TransitionOutcome, next_status};

/// Reject a signal vector with any field outside `[0, 1]`.
pub fn validate_signals(signals: &sandboxtown_types::SignalVector) -> Result<(), AgentError> {
    match signals.out_of_range() {
        Some((field, value)) => Err(AgentError::Domain { field, value }),
        None => Ok(()),
    }
}
