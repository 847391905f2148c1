//! Presentation mode gate.
//!
//! `Visual` mode is a privilege of comfortably stable agents. The gate
//! demotes an agent to `Headless` as soon as it is no longer `Stable` or its
//! stability drops below [`Thresholds::visual_min_stable`]. It never promotes.

use sandboxtown_types::{AgentStatus, RunMode, TransitionEvent};

use crate::config::Thresholds;

/// Outcome of [`enforce_mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeDecision {
    /// Mode the agent runs in after the check.
    pub mode: RunMode,
    /// [`TransitionEvent::ExitVisualToHeadless`] when the gate demoted the agent.
    pub event: Option<TransitionEvent>,
}

/// Check `current` against the agent's status and stability.
pub fn enforce_mode(
    current: RunMode,
    status: AgentStatus,
    stability: f64,
    thresholds: &Thresholds,
) -> ModeDecision {
    let visual_allowed =
        status == AgentStatus::Stable && stability >= thresholds.visual_min_stable;

    if current == RunMode::Visual && !visual_allowed {
        return ModeDecision {
            mode: RunMode::Headless,
            event: Some(TransitionEvent::ExitVisualToHeadless),
        };
    }

    ModeDecision {
        mode: current,
        event: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds(min_stable: f64) -> Thresholds {
        Thresholds {
            visual_min_stable: min_stable,
            ..Thresholds::default()
        }
    }

    #[test]
    fn visual_forced_to_headless_when_unstable() {
        let out = enforce_mode(RunMode::Visual, AgentStatus::HelpSeeking, 0.9, &thresholds(0.5));
        assert_eq!(out.mode, RunMode::Headless);
        assert_eq!(out.event, Some(TransitionEvent::ExitVisualToHeadless));

        let out = enforce_mode(RunMode::Visual, AgentStatus::Rest, 0.9, &thresholds(0.5));
        assert_eq!(out.mode, RunMode::Headless);
    }

    #[test]
    fn visual_forced_when_stability_too_low() {
        let out = enforce_mode(RunMode::Visual, AgentStatus::Stable, 0.2, &thresholds(0.5));
        assert_eq!(out.mode, RunMode::Headless);
        assert_eq!(out.event, Some(TransitionEvent::ExitVisualToHeadless));
    }

    #[test]
    fn visual_kept_at_threshold() {
        let out = enforce_mode(RunMode::Visual, AgentStatus::Stable, 0.75, &Thresholds::default());
        assert_eq!(out.mode, RunMode::Visual);
        assert_eq!(out.event, None);
    }

    #[test]
    fn headless_is_never_promoted() {
        let out = enforce_mode(RunMode::Headless, AgentStatus::Stable, 1.0, &thresholds(0.5));
        assert_eq!(out.mode, RunMode::Headless);
        assert_eq!(out.event, None);
    }
}
