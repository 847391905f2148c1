//! Core data structs: signals, zones, and per-step telemetry records.

use serde::{Deserialize, Serialize};

use crate::enums::{AgentStatus, Density, RunMode, TransitionEvent};
use crate::ids::{AgentId, RunId};

/// Lower bound of the signal domain.
pub const SIGNAL_MIN: f64 = 0.0;

/// Upper bound of the signal domain.
pub const SIGNAL_MAX: f64 = 1.0;

/// Whether `value` lies in the closed signal domain `[0, 1]`.
///
/// `NaN` is never in range.
pub fn in_signal_domain(value: f64) -> bool {
    (SIGNAL_MIN..=SIGNAL_MAX).contains(&value)
}

// ---------------------------------------------------------------------------
// Zone
// ---------------------------------------------------------------------------

/// A categorical work context an agent occupies (e.g. `Library`, `Park`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Zone(pub String);

impl Zone {
    /// Create a zone from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The zone name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Zone {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Zone {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Raw per-agent, per-step readings. Every field is declared in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalVector {
    /// Available energy.
    pub energy: f64,
    /// Current work load.
    pub load: f64,
    /// Drive to explore.
    pub curiosity: f64,
    /// Coherence/stability input consumed by the status evaluator.
    pub stability: f64,
}

impl SignalVector {
    /// Build a vector where only `stability` matters and the other readings
    /// are neutral (0.5).
    pub const fn from_stability(stability: f64) -> Self {
        Self {
            energy: 0.5,
            load: 0.5,
            curiosity: 0.5,
            stability,
        }
    }

    /// Return the name and value of the first field outside `[0, 1]`, if any.
    pub fn out_of_range(&self) -> Option<(&'static str, f64)> {
        [
            ("energy", self.energy),
            ("load", self.load),
            ("curiosity", self.curiosity),
            ("stability", self.stability),
        ]
        .into_iter()
        .find(|&(_, value)| !in_signal_domain(value))
    }
}

impl Default for SignalVector {
    fn default() -> Self {
        Self::from_stability(1.0)
    }
}

/// One agent's reading for one step, as delivered by a signal source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReading {
    /// The raw signal vector.
    pub signals: SignalVector,
    /// Zone occupied during this step, if the source tracks zones.
    pub zone: Option<Zone>,
    /// Locomotion proxy (e.g. px/s), if the source supplies one.
    pub speed: Option<f64>,
}

impl SignalReading {
    /// A reading carrying only a stability value.
    pub const fn stability_only(stability: f64) -> Self {
        Self {
            signals: SignalVector::from_stability(stability),
            zone: None,
            speed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Telemetry record
// ---------------------------------------------------------------------------

/// One immutable per-agent, per-step observation.
///
/// Records are append-only: the step pipeline creates exactly one per agent
/// per step and nothing mutates them afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Run this record belongs to.
    pub run_id: RunId,
    /// Step index (1-based; step 0 is the initial condition).
    pub step: u64,
    /// The agent observed.
    pub agent_id: AgentId,
    /// Status after this step.
    pub status: AgentStatus,
    /// Status before this step.
    pub previous_status: AgentStatus,
    /// Zone occupied during this step.
    pub zone: Option<Zone>,
    /// Whether status or zone changed this step.
    pub transition: bool,
    /// Whether the status changed this step.
    pub status_changed: bool,
    /// Whether the zone changed this step.
    pub zone_changed: bool,
    /// Stability input as read from the signal source.
    pub raw_stability: f64,
    /// Stability input after contagion modulation.
    pub modulated_stability: f64,
    /// Environment density after this step.
    pub density: Density,
    /// Presentation mode after the mode gate ran.
    #[serde(default)]
    pub mode: RunMode,
    /// Locomotion proxy, if supplied.
    pub speed: Option<f64>,
    /// Events emitted for this agent (and environment events, on every
    /// record of the step that produced them).
    pub events: Vec<TransitionEvent>,
}
