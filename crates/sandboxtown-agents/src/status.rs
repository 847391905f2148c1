//! Hysteresis-gated status machine.
//!
//! Maps `(current status, modulated stability)` to the next status using the
//! asymmetric thresholds in [`Thresholds`]. The evaluator is a pure function:
//! it has no state of its own beyond the status value the caller passes in.
//!
//! # Rules (evaluated in order)
//!
//! 1. `input < rest_enter` -- enter `Rest` from any state. Rest takes
//!    precedence over help when both entry thresholds are crossed.
//! 2. Current `Rest` -- leave only once `input >= rest_exit`, otherwise hold.
//! 3. Current `HelpSeeking` -- leave for `Stable` only once
//!    `input >= help_exit`, otherwise hold.
//! 4. Current `Stable` -- enter `HelpSeeking` when `input < help_enter`.
//!
//! An agent leaving `Rest` lands in whichever state the help band dictates
//! for the same input: `HelpSeeking` below `help_enter`, `Stable` otherwise.
//!
//! Inputs outside `[0, 1]` are rejected with [`AgentError::Domain`]; the
//! evaluator never clamps.

use sandboxtown_types::{AgentStatus, TransitionEvent, in_signal_domain};

use crate::config::Thresholds;
use crate::error::AgentError;

/// Result of evaluating one agent for one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// Status before the evaluation.
    pub previous: AgentStatus,
    /// Status after the evaluation.
    pub next: AgentStatus,
    /// Events describing the change (empty when the status held).
    pub events: Vec<TransitionEvent>,
}

impl TransitionOutcome {
    /// Whether the status changed.
    pub fn changed(&self) -> bool {
        self.previous != self.next
    }
}

/// Compute the next status using the default thresholds.
///
/// `modulated` must be the post-contagion stability input.
pub fn next_status(current: AgentStatus, modulated: f64) -> Result<AgentStatus, AgentError> {
    Thresholds::default().next_status(current, modulated)
}

impl Thresholds {
    /// Compute the next status for `current` given the modulated input.
    pub fn next_status(&self, current: AgentStatus, input: f64) -> Result<AgentStatus, AgentError> {
        check_domain(input)?;
        Ok(self.target(current, input))
    }

    /// Compute the next status together with the transition events.
    pub fn evaluate(
        &self,
        current: AgentStatus,
        input: f64,
    ) -> Result<TransitionOutcome, AgentError> {
        check_domain(input)?;
        let next = self.target(current, input);
        Ok(TransitionOutcome {
            previous: current,
            next,
            events: transition_events(current, next),
        })
    }

    fn target(&self, current: AgentStatus, input: f64) -> AgentStatus {
        if input < self.rest_enter {
            return AgentStatus::Rest;
        }

        match current {
            AgentStatus::Rest => {
                if input >= self.rest_exit {
                    self.recovering(input)
                } else {
                    AgentStatus::Rest
                }
            }
            AgentStatus::HelpSeeking => {
                if self.help_enabled && input < self.help_exit {
                    AgentStatus::HelpSeeking
                } else {
                    AgentStatus::Stable
                }
            }
            AgentStatus::Stable => self.recovering(input),
        }
    }

    /// The non-Rest state the help band assigns to `input`.
    fn recovering(&self, input: f64) -> AgentStatus {
        if self.help_enabled && input < self.help_enter {
            AgentStatus::HelpSeeking
        } else {
            AgentStatus::Stable
        }
    }
}

fn check_domain(input: f64) -> Result<(), AgentError> {
    if in_signal_domain(input) {
        Ok(())
    } else {
        Err(AgentError::Domain {
            field: "stability",
            value: input,
        })
    }
}

fn transition_events(previous: AgentStatus, next: AgentStatus) -> Vec<TransitionEvent> {
    use AgentStatus::{HelpSeeking, Rest, Stable};

    match (previous, next) {
        (Stable, HelpSeeking) => vec![TransitionEvent::EnterHelp],
        (HelpSeeking, Stable) => vec![TransitionEvent::ExitHelp],
        (Stable | HelpSeeking, Rest) => vec![TransitionEvent::EnterRest],
        (Rest, Stable) => vec![TransitionEvent::ExitRest],
        (Rest, HelpSeeking) => vec![TransitionEvent::ExitRest, TransitionEvent::EnterHelp],
        _ => Vec::new(),
    }
}
