//! Bounded simulation loop.
//!
//! [`run_simulation`] drives [`run_step`] until one of the termination
//! conditions is met:
//!
//! - **Step bound**: `max_steps` steps have completed.
//! - **Source exhausted**: the signal source has no more readings.
//!
//! Any other step error aborts the run.

use tracing::{info, warn};

use sandboxtown_types::StepRecord;

use crate::signal_source::SignalSource;
use crate::step::{self, SimulationState, StepError, StepSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A step execution failed.
    #[error("step error: {source}")]
    Step {
        /// The underlying step error.
        #[from]
        source: StepError,
    },
}

/// Why a simulation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The configured number of steps completed.
    MaxStepsReached,
    /// The signal source ran out of readings.
    SourceExhausted,
}

/// Result of the simulation run.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: EndReason,
    /// The last step summary, if any step completed.
    pub final_summary: Option<StepSummary>,
    /// Total number of steps executed.
    pub total_steps: u64,
}

/// Callback invoked after each step completes.
///
/// Telemetry sinks hook into the run through this trait. The callback only
/// observes; it cannot influence the simulation.
pub trait StepCallback {
    /// Called after a step completes successfully.
    fn on_step(&mut self, summary: &StepSummary, state: &SimulationState);
}

/// A no-op step callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl StepCallback for NoOpCallback {
    fn on_step(&mut self, _summary: &StepSummary, _state: &SimulationState) {}
}

/// Collects every emitted record in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordCollector {
    /// Records in emission order.
    pub records: Vec<StepRecord>,
}

impl StepCallback for RecordCollector {
    fn on_step(&mut self, summary: &StepSummary, _state: &SimulationState) {
        self.records.extend(summary.records.iter().cloned());
    }
}

/// Run the simulation loop until a termination condition is met.
///
/// # Errors
///
/// Returns [`RunnerError`] if a step fails for any reason other than the
/// source running out of data.
pub fn run_simulation(
    state: &mut SimulationState,
    source: &mut dyn SignalSource,
    max_steps: u64,
    callback: &mut dyn StepCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut last_summary: Option<StepSummary> = None;
    let mut total_steps: u64 = 0;

    info!(
        run_id = %state.run_id,
        agents = state.roster.len(),
        max_steps,
        contagion = state.contagion.enabled,
        density = %state.environment.density,
        "Simulation starting"
    );

    loop {
        if total_steps >= max_steps {
            info!(total_steps, max_steps, "Step limit reached");
            return Ok(SimulationResult {
                end_reason: EndReason::MaxStepsReached,
                final_summary: last_summary,
                total_steps,
            });
        }

        let summary = match step::run_step(state, source) {
            Ok(summary) => summary,
            Err(err) if err.is_source_exhausted() => {
                info!(total_steps, "Signal source exhausted");
                return Ok(SimulationResult {
                    end_reason: EndReason::SourceExhausted,
                    final_summary: last_summary,
                    total_steps,
                });
            }
            Err(err) => return Err(err.into()),
        };

        total_steps = total_steps.saturating_add(1);
        callback.on_step(&summary, state);
        last_summary = Some(summary);
    }
}

/// Log the simulation end.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_steps = result.total_steps,
        final_step = result.final_summary.as_ref().map(|s| s.step),
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            step = summary.step,
            density = %summary.density,
            unstable_agents = summary.unstable_agents,
            "Final step summary"
        );
    } else {
        warn!("Simulation ended with no steps executed");
    }
}
