//! Shared environment density controller.
//!
//! The environment starts `Dense`. After every agent's status for a step is
//! final, the controller runs exactly once:
//!
//! - `Dense` and any agent `HelpSeeking` or `Rest` => `Calm` (downshift).
//! - Otherwise the density is unchanged. The controller never upshifts.
//!
//! Moving back from `Calm` to `Dense` is a separate, opt-in policy
//! ([`upshift_if_all_stable`]) that only runs when the downshift did not fire
//! in the same step.

use serde::{Deserialize, Serialize};
use tracing::info;

use sandboxtown_types::{AgentStatus, Density, TransitionEvent};

/// Downshift the density when any agent is unstable.
///
/// Pure function of the current step's statuses and the current density.
pub fn update_environment(statuses: &[AgentStatus], current: Density) -> Density {
    if current == Density::Dense && statuses.iter().any(|s| s.is_unstable()) {
        Density::Calm
    } else {
        current
    }
}

/// Upshift a `Calm` environment back to `Dense` once every agent is `Stable`.
pub fn upshift_if_all_stable(statuses: &[AgentStatus], current: Density) -> Density {
    if current == Density::Calm && statuses.iter().all(|&s| s == AgentStatus::Stable) {
        Density::Dense
    } else {
        current
    }
}

/// Which optional environment policies are active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentPolicy {
    /// Allow `Calm -> Dense` when all agents are `Stable` (default: off).
    pub upshift_when_all_stable: bool,
}

/// The shared environment, threaded explicitly through each step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentState {
    /// Current density.
    pub density: Density,
}

impl EnvironmentState {
    /// Environment starting at `density`.
    pub const fn new(density: Density) -> Self {
        Self { density }
    }

    /// Run the controller once for a step's committed statuses.
    ///
    /// Returns the event describing the density change, if any.
    pub fn apply(
        &mut self,
        statuses: &[AgentStatus],
        policy: EnvironmentPolicy,
    ) -> Option<TransitionEvent> {
        let before = self.density;

        let downshifted = update_environment(statuses, before);
        if downshifted != before {
            self.density = downshifted;
            info!(from = %before, to = %downshifted, "environment downshift");
            return Some(TransitionEvent::EnvDownshift);
        }

        if policy.upshift_when_all_stable {
            let upshifted = upshift_if_all_stable(statuses, before);
            if upshifted != before {
                self.density = upshifted;
                info!(from = %before, to = %upshifted, "environment upshift");
                return Some(TransitionEvent::EnvUpshift);
            }
        }

        None
    }
}
