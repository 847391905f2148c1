//! Signal source trait and a scripted implementation.
//!
//! At the start of every step the pipeline asks a [`SignalSource`] for one
//! [`SignalReading`] per agent. The trait abstracts where readings come
//! from: a synthetic zone-drift generator, a recorded trace, or a test
//! script. The core never generates signals itself.

use sandboxtown_types::{AgentId, SignalReading};

/// Errors a signal source can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The source has no readings for this step. Ends a run normally.
    #[error("signal source exhausted at step {step}")]
    Exhausted {
        /// The step that could not be served.
        step: u64,
    },

    /// The source returned the wrong number of readings.
    #[error("signal source returned {actual} readings for {expected} agents")]
    AgentCount {
        /// Number of agents asked for.
        expected: usize,
        /// Number of readings returned.
        actual: usize,
    },

    /// Any other failure inside the source.
    #[error("signal source error: {message}")]
    Internal {
        /// Description of the error.
        message: String,
    },
}

/// A per-step provider of raw agent readings.
pub trait SignalSource {
    /// Produce one reading per agent for `step`, in the order of `agents`
    /// (ascending id).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Exhausted`] when no more data is available,
    /// or another [`SourceError`] if the source fails.
    fn readings(
        &mut self,
        step: u64,
        agents: &[AgentId],
    ) -> Result<Vec<SignalReading>, SourceError>;
}

/// Replays fixed per-agent reading sequences.
///
/// Step `n` (1-based) serves index `n - 1` of every agent's sequence. The
/// source is exhausted once any sequence runs out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptedSignalSource {
    sequences: Vec<Vec<SignalReading>>,
}

impl ScriptedSignalSource {
    /// One stability sequence per agent; other signals stay neutral.
    pub fn new(stabilities: Vec<Vec<f64>>) -> Self {
        let sequences = stabilities
            .into_iter()
            .map(|seq| seq.into_iter().map(SignalReading::stability_only).collect())
            .collect();
        Self { sequences }
    }

    /// One full reading sequence per agent.
    pub const fn from_readings(sequences: Vec<Vec<SignalReading>>) -> Self {
        Self { sequences }
    }

    /// Number of steps every agent has data for.
    pub fn len(&self) -> usize {
        self.sequences.iter().map(Vec::len).min().unwrap_or(0)
    }

    /// Whether no step can be served.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SignalSource for ScriptedSignalSource {
    fn readings(
        &mut self,
        step: u64,
        agents: &[AgentId],
    ) -> Result<Vec<SignalReading>, SourceError> {
        if agents.len() != self.sequences.len() {
            return Err(SourceError::AgentCount {
                expected: agents.len(),
                actual: self.sequences.len(),
            });
        }

        let index = step
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .ok_or(SourceError::Exhausted { step })?;

        self.sequences
            .iter()
            .map(|seq| seq.get(index).cloned().ok_or(SourceError::Exhausted { step }))
            .collect()
    }
}
