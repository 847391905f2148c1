//! Enumeration types for the SandboxTown simulation.
//!
//! All variants serialize in `snake_case` so that configuration files and
//! telemetry output share one spelling (`help_seeking`, `dense`, ...).

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Agent status
// ---------------------------------------------------------------------------

/// The hysteresis-governed status of an agent.
///
/// Every agent starts [`Stable`](Self::Stable). There is no terminal state:
/// the status machine runs every step for the life of the agent.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Coherent and productive; the default state.
    #[default]
    Stable,
    /// Stability dropped below the help entry threshold.
    HelpSeeking,
    /// Stability dropped below the rest entry threshold (most severe).
    Rest,
}

impl AgentStatus {
    /// All statuses in declaration order.
    pub const ALL: [Self; 3] = [Self::Stable, Self::HelpSeeking, Self::Rest];

    /// Whether this status counts as unstable for the environment and
    /// contagion (`HelpSeeking` or `Rest`).
    pub const fn is_unstable(self) -> bool {
        matches!(self, Self::HelpSeeking | Self::Rest)
    }

    /// Stable lowercase label used in telemetry and logs.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::HelpSeeking => "help_seeking",
            Self::Rest => "rest",
        }
    }
}

impl core::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Environment density
// ---------------------------------------------------------------------------

/// Shared environment mode reflecting overall population stress.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Density {
    /// Full-intensity environment; the starting mode.
    #[default]
    Dense,
    /// Reduced-intensity environment after a downshift.
    Calm,
}

impl core::fmt::Display for Density {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Dense => f.write_str("dense"),
            Self::Calm => f.write_str("calm"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transition events
// ---------------------------------------------------------------------------

/// A notable change emitted alongside a step's results.
///
/// Events are informational: they are copied into telemetry records and
/// never drive simulation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionEvent {
    /// Agent entered `HelpSeeking`.
    EnterHelp,
    /// Agent left `HelpSeeking` for `Stable`.
    ExitHelp,
    /// Agent entered `Rest`.
    EnterRest,
    /// Agent left `Rest`.
    ExitRest,
    /// Environment moved from `Dense` to `Calm`.
    EnvDownshift,
    /// Environment moved from `Calm` back to `Dense`.
    EnvUpshift,
    /// The mode gate forced an agent out of `Visual` mode.
    ExitVisualToHeadless,
    /// A help request was routed to the environment.
    HelpRoutedEnv,
}

// ---------------------------------------------------------------------------
// Run mode and help routing
// ---------------------------------------------------------------------------

/// Presentation mode of an agent.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// No rendering; the default.
    #[default]
    Headless,
    /// Rendered; only allowed while the agent is comfortably stable.
    Visual,
}

/// Where a help-seeking agent's request is routed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HelpRoute {
    /// The shared environment absorbs the request (calmer surroundings).
    Environment,
    /// A peer agent.
    Peer,
    /// A supervisor, used as a circuit breaker only.
    Supervisor,
    /// No route: the agent is not seeking help, or nothing is available.
    #[default]
    None,
}
