//! Agent state and the per-run roster.
//!
//! The [`AgentRoster`] creates every agent once at simulation start with a
//! sequential [`AgentId`], status `Stable`, zeroed counters and no zone. The
//! step pipeline evaluates all agents against their previous statuses first
//! and then hands the buffered results to [`AgentRoster::commit`], so no
//! agent ever observes another agent's updated status within a step.

use std::collections::BTreeMap;

use sandboxtown_types::{AgentId, AgentStatus, RunMode, SignalReading, SignalVector, Zone};

use crate::error::AgentError;
use crate::status::TransitionOutcome;

/// Mutable per-agent simulation state.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    /// Stable identifier (roster index).
    pub id: AgentId,
    /// Current hysteresis status.
    pub status: AgentStatus,
    /// Presentation mode (see [`crate::mode_gate`]).
    pub mode: RunMode,
    /// Most recent raw signals.
    pub signals: SignalVector,
    /// Zone currently occupied, if the signal source tracks zones.
    pub zone: Option<Zone>,
    /// Steps in which the status or the zone changed.
    pub transitions: u64,
    /// Status changes.
    pub status_transitions: u64,
    /// Zone changes.
    pub zone_transitions: u64,
    /// Steps spent in each zone.
    pub steps_in_zone: BTreeMap<Zone, u64>,
    /// Steps spent in each status (counted after the step's evaluation).
    pub steps_by_status: BTreeMap<AgentStatus, u64>,
}

/// What changed for one agent when a step was committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepChange {
    /// The status changed.
    pub status_changed: bool,
    /// The zone changed.
    pub zone_changed: bool,
}

impl StepChange {
    /// Whether anything changed.
    pub const fn any(self) -> bool {
        self.status_changed || self.zone_changed
    }
}

/// A buffered per-agent result waiting to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentUpdate {
    /// The reading the agent was evaluated on.
    pub reading: SignalReading,
    /// The evaluator's result.
    pub outcome: TransitionOutcome,
}

impl Agent {
    /// A fresh agent: `Stable`, `Headless`, neutral signals, no zone.
    pub fn new(id: AgentId) -> Self {
        Self {
            id,
            status: AgentStatus::Stable,
            mode: RunMode::Headless,
            signals: SignalVector::default(),
            zone: None,
            transitions: 0,
            status_transitions: 0,
            zone_transitions: 0,
            steps_in_zone: BTreeMap::new(),
            steps_by_status: BTreeMap::new(),
        }
    }

    /// Apply one step's reading and evaluation result.
    ///
    /// A reading without a zone keeps the previous zone. Moving into the
    /// first zone is not counted as a zone change.
    pub fn apply(
        &mut self,
        reading: &SignalReading,
        outcome: &TransitionOutcome,
    ) -> Result<StepChange, AgentError> {
        let zone_changed = match (&self.zone, &reading.zone) {
            (Some(old), Some(new)) => old != new,
            _ => false,
        };
        let status_changed = self.status != outcome.next;

        self.signals = reading.signals;
        if let Some(zone) = &reading.zone {
            self.zone = Some(zone.clone());
        }
        self.status = outcome.next;

        let change = StepChange {
            status_changed,
            zone_changed,
        };

        if change.status_changed {
            self.status_transitions = increment(self.status_transitions, "status_transitions")?;
        }
        if change.zone_changed {
            self.zone_transitions = increment(self.zone_transitions, "zone_transitions")?;
        }
        if change.any() {
            self.transitions = increment(self.transitions, "transitions")?;
        }

        let by_status = self.steps_by_status.entry(self.status).or_insert(0);
        *by_status = increment(*by_status, "steps_by_status")?;

        if let Some(zone) = &self.zone {
            let in_zone = self.steps_in_zone.entry(zone.clone()).or_insert(0);
            *in_zone = increment(*in_zone, "steps_in_zone")?;
        }

        Ok(change)
    }
}

fn increment(value: u64, counter: &str) -> Result<u64, AgentError> {
    value
        .checked_add(1)
        .ok_or_else(|| AgentError::ArithmeticOverflow {
            context: format!("{counter} counter overflow"),
        })
}

/// All agents of a run, in ascending [`AgentId`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRoster {
    agents: Vec<Agent>,
}

impl AgentRoster {
    /// Create `count` headless agents with ids `0..count`.
    pub fn new(count: u32) -> Self {
        Self::with_mode(count, RunMode::Headless)
    }

    /// Create `count` agents with ids `0..count`, all starting in `mode`.
    pub fn with_mode(count: u32, mode: RunMode) -> Self {
        let agents = (0..count)
            .map(|index| Agent {
                mode,
                ..Agent::new(AgentId::new(index))
            })
            .collect();
        Self { agents }
    }

    /// Number of agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the roster has no agents.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Iterate agents in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    /// Agent ids in ascending order.
    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.iter().map(|a| a.id).collect()
    }

    /// Current statuses in ascending id order.
    pub fn statuses(&self) -> Vec<AgentStatus> {
        self.agents.iter().map(|a| a.status).collect()
    }

    /// Look up an agent.
    pub fn get(&self, id: AgentId) -> Result<&Agent, AgentError> {
        self.agents
            .iter()
            .find(|a| a.id == id)
            .ok_or(AgentError::AgentNotFound(id))
    }

    /// Look up an agent mutably.
    pub fn get_mut(&mut self, id: AgentId) -> Result<&mut Agent, AgentError> {
        self.agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AgentError::AgentNotFound(id))
    }

    /// Commit one step's buffered updates, one per agent in id order.
    ///
    /// A length mismatch is rejected before anything is touched. Counter
    /// overflow is checked for every agent before the first one is updated,
    /// so a failed commit leaves the whole roster unchanged.
    pub fn commit(&mut self, updates: &[AgentUpdate]) -> Result<Vec<StepChange>, AgentError> {
        if updates.len() != self.agents.len() {
            return Err(AgentError::RosterMismatch {
                expected: self.agents.len(),
                actual: updates.len(),
            });
        }

        let mut staged = self.agents.clone();
        let changes = staged
            .iter_mut()
            .zip(updates)
            .map(|(agent, update)| agent.apply(&update.reading, &update.outcome))
            .collect::<Result<Vec<_>, _>>()?;
        self.agents = staged;
        Ok(changes)
    }
}
