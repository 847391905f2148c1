//! Help request routing.
//!
//! A help-seeking agent is routed to the first available helper in a fixed,
//! non-dominating order: the environment, then a peer, then a supervisor.
//! The supervisor is a circuit breaker and only used when nothing else is.

use sandboxtown_types::{AgentStatus, HelpRoute, TransitionEvent};

/// Which helpers can currently take a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpAvailability {
    /// The shared environment can absorb the request (default: true).
    pub environment: bool,
    /// A peer agent is available (default: false).
    pub peer: bool,
    /// A supervisor is available (default: false).
    pub supervisor: bool,
}

impl Default for HelpAvailability {
    fn default() -> Self {
        Self {
            environment: true,
            peer: false,
            supervisor: false,
        }
    }
}

/// Outcome of [`route_help`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpDecision {
    /// Chosen route, [`HelpRoute::None`] if none.
    pub route: HelpRoute,
    /// Whether any help was available for a help-seeking agent.
    pub help_available: bool,
    /// Event emitted for the chosen route, if any.
    pub event: Option<TransitionEvent>,
}

impl HelpDecision {
    const fn unrouted() -> Self {
        Self {
            route: HelpRoute::None,
            help_available: false,
            event: None,
        }
    }
}

/// Route a help request for an agent in `status`.
///
/// Agents that are not `HelpSeeking` are never routed.
pub fn route_help(status: AgentStatus, availability: HelpAvailability) -> HelpDecision {
    if status != AgentStatus::HelpSeeking {
        return HelpDecision::unrouted();
    }

    if availability.environment {
        HelpDecision {
            route: HelpRoute::Environment,
            help_available: true,
            event: Some(TransitionEvent::HelpRoutedEnv),
        }
    } else if availability.peer {
        HelpDecision {
            route: HelpRoute::Peer,
            help_available: true,
            event: None,
        }
    } else if availability.supervisor {
        HelpDecision {
            route: HelpRoute::Supervisor,
            help_available: true,
            event: None,
        }
    } else {
        HelpDecision::unrouted()
    }
}
