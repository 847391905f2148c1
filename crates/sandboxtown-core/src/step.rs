//! The per-step pipeline.
//!
//! Each call to [`run_step`] runs these phases, strictly in order:
//!
//! 1. **Read** -- ask the [`SignalSource`] for one reading per agent
//!    (ascending id) and reject any reading outside the signal domain.
//! 2. **Field** -- when contagion is enabled, derive each agent's population
//!    field from the frozen snapshot of this step's raw stability values.
//! 3. **Evaluate** -- per agent: modulate, then run the status evaluator
//!    against the agent's *previous* status. Results are buffered.
//! 4. **Commit** -- apply every buffered result at once (the barrier), then
//!    advance the clock.
//! 5. **Environment** -- run the density controller exactly once on the
//!    committed statuses.
//! 6. **Emit** -- run the mode gate and the help router on the committed
//!    status, then build one [`StepRecord`] per agent.
//!
//! A failing phase aborts the step before the commit, leaving the state
//! untouched.

use tracing::debug;

use sandboxtown_agents::{
    AgentError, AgentRoster, AgentUpdate, ContagionConfig, HelpAvailability, Thresholds,
    apply_contagion, enforce_mode, population_field, route_help, validate_signals,
};
use sandboxtown_types::{
    AgentId, AgentStatus, Density, RunId, SignalReading, StepRecord, TransitionEvent,
};
use sandboxtown_world::{EnvironmentPolicy, EnvironmentState};

use crate::clock::{ClockError, StepClock};
use crate::config::{ConfigError, SimulationConfig};
use crate::signal_source::{SignalSource, SourceError};

/// Errors that can occur during step execution.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// The signal source failed or ran out of data.
    #[error("source error: {source}")]
    Source {
        /// The underlying source error.
        #[from]
        source: SourceError,
    },

    /// Modulation or evaluation failed for one agent.
    #[error("agent error for {agent_id}: {source}")]
    Agent {
        /// The agent that caused the error.
        agent_id: AgentId,
        /// The underlying agent error.
        source: AgentError,
    },

    /// Committing the step to the roster failed.
    #[error("roster error: {source}")]
    Roster {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },
}

impl StepError {
    /// Whether this error means the source simply ran out of data.
    pub const fn is_source_exhausted(&self) -> bool {
        matches!(
            self,
            Self::Source {
                source: SourceError::Exhausted { .. }
            }
        )
    }
}

/// Summary of a single step's execution.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSummary {
    /// The step number that was executed.
    pub step: u64,
    /// Density after the environment controller ran.
    pub density: Density,
    /// Density change event, if any.
    pub environment_event: Option<TransitionEvent>,
    /// Agents whose status or zone changed.
    pub transitions: usize,
    /// Agents in `HelpSeeking` or `Rest` after the step.
    pub unstable_agents: usize,
    /// One record per agent, ascending id.
    pub records: Vec<StepRecord>,
}

/// The mutable simulation state carried from step to step.
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Run tag copied into every record.
    pub run_id: RunId,
    /// The step clock.
    pub clock: StepClock,
    /// All agents.
    pub roster: AgentRoster,
    /// Shared environment.
    pub environment: EnvironmentState,
    /// Optional environment policies.
    pub policy: EnvironmentPolicy,
    /// Hysteresis thresholds.
    pub thresholds: Thresholds,
    /// Contagion parameters.
    pub contagion: ContagionConfig,
    /// Helpers available to help-seeking agents.
    pub help: HelpAvailability,
}

impl SimulationState {
    /// Fresh state with `agent_count` stable agents at step 0.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if the thresholds, or the contagion
    /// parameters of an enabled modulator, are invalid.
    pub fn new(
        run_id: RunId,
        agent_count: u32,
        thresholds: Thresholds,
        contagion: ContagionConfig,
    ) -> Result<Self, AgentError> {
        thresholds.validate()?;
        if contagion.enabled {
            contagion.validate()?;
        }
        Ok(Self {
            run_id,
            clock: StepClock::new(),
            roster: AgentRoster::new(agent_count),
            environment: EnvironmentState::default(),
            policy: EnvironmentPolicy::default(),
            thresholds,
            contagion,
            help: HelpAvailability::default(),
        })
    }

    /// Build the initial state described by a configuration.
    pub fn from_config(run_id: RunId, config: &SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut state = Self::new(
            run_id,
            config.run.agent_count,
            config.thresholds,
            config.contagion,
        )?;
        state.roster = AgentRoster::with_mode(config.run.agent_count, config.run.start_mode);
        state.environment = EnvironmentState::new(config.environment.start_density);
        state.policy = config.environment_policy();
        Ok(state)
    }
}

/// Execute one step of the pipeline.
///
/// # Errors
///
/// Returns [`StepError`] if the source fails, a reading is out of domain,
/// or an internal invariant is violated. The state is unchanged on error.
pub fn run_step(
    state: &mut SimulationState,
    source: &mut dyn SignalSource,
) -> Result<StepSummary, StepError> {
    // --- Read ---
    let step = state.clock.peek_next()?;
    let ids = state.roster.ids();
    let readings = source.readings(step, &ids)?;
    if readings.len() != ids.len() {
        return Err(SourceError::AgentCount {
            expected: ids.len(),
            actual: readings.len(),
        }
        .into());
    }
    for (&agent_id, reading) in ids.iter().zip(&readings) {
        validate_reading(reading).map_err(|source| StepError::Agent { agent_id, source })?;
    }

    // --- Field + Evaluate (against the frozen snapshot) ---
    let raw: Vec<f64> = readings.iter().map(|r| r.signals.stability).collect();
    let previous = state.roster.statuses();
    let mut updates = Vec::with_capacity(ids.len());
    let mut modulated = Vec::with_capacity(ids.len());

    for (index, ((&agent_id, reading), &prev)) in
        ids.iter().zip(&readings).zip(&previous).enumerate()
    {
        let input = modulate(&raw, index, reading, &state.contagion)
            .map_err(|source| StepError::Agent { agent_id, source })?;
        let outcome = state
            .thresholds
            .evaluate(prev, input)
            .map_err(|source| StepError::Agent { agent_id, source })?;

        if outcome.changed() {
            debug!(
                step,
                agent = %agent_id,
                from = %outcome.previous,
                to = %outcome.next,
                input,
                "status transition"
            );
        }

        modulated.push(input);
        updates.push(AgentUpdate {
            reading: reading.clone(),
            outcome,
        });
    }

    // --- Commit ---
    let changes = state.roster.commit(&updates)?;
    state.clock.advance()?;

    // --- Environment ---
    let statuses = state.roster.statuses();
    let environment_event = state.environment.apply(&statuses, state.policy);
    let density = state.environment.density;

    // --- Emit ---
    let mut records = Vec::with_capacity(ids.len());
    for (((update, change), &input), &agent_id) in
        updates.iter().zip(&changes).zip(&modulated).zip(&ids)
    {
        let mut events = update.outcome.events.clone();

        let agent = state.roster.get_mut(agent_id)?;
        let mode = enforce_mode(agent.mode, agent.status, input, &state.thresholds);
        agent.mode = mode.mode;
        events.extend(mode.event);
        events.extend(route_help(agent.status, state.help).event);
        events.extend(environment_event);

        records.push(StepRecord {
            run_id: state.run_id,
            step,
            agent_id,
            status: update.outcome.next,
            previous_status: update.outcome.previous,
            zone: agent.zone.clone(),
            transition: change.any(),
            status_changed: change.status_changed,
            zone_changed: change.zone_changed,
            raw_stability: update.reading.signals.stability,
            modulated_stability: input,
            density,
            mode: agent.mode,
            speed: update.reading.speed,
            events,
        });
    }

    let transitions = changes.iter().filter(|c| c.any()).count();
    let unstable_agents = statuses.iter().filter(|s| s.is_unstable()).count();

    Ok(StepSummary {
        step,
        density,
        environment_event,
        transitions,
        unstable_agents,
        records,
    })
}

fn validate_reading(reading: &SignalReading) -> Result<(), AgentError> {
    validate_signals(&reading.signals)?;
    match reading.speed {
        Some(speed) if !speed.is_finite() || speed < 0.0 => Err(AgentError::Domain {
            field: "speed",
            value: speed,
        }),
        _ => Ok(()),
    }
}

fn modulate(
    raw: &[f64],
    index: usize,
    reading: &SignalReading,
    contagion: &ContagionConfig,
) -> Result<f64, AgentError> {
    let signal = reading.signals.stability;
    if !contagion.enabled {
        return Ok(signal);
    }
    let field = population_field(raw, contagion.field, index);
    apply_contagion(signal, field, contagion)
}

/// Statuses of a summary's records, ascending id.
pub fn statuses_of(summary: &StepSummary) -> Vec<AgentStatus> {
    summary.records.iter().map(|r| r.status).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sandboxtown_agents::FieldRule;
    use sandboxtown_types::{RunMode, SignalVector, Zone};
    use uuid::Uuid;

    use super::*;
    use crate::signal_source::ScriptedSignalSource;

    fn make_state(agent_count: u32, contagion: ContagionConfig) -> SimulationState {
        SimulationState::new(
            RunId::from(Uuid::nil()),
            agent_count,
            Thresholds::default(),
            contagion,
        )
        .unwrap()
    }

    #[test]
    fn three_agent_scenario() {
        let mut state = make_state(3, ContagionConfig::disabled());
        let mut source = ScriptedSignalSource::new(vec![vec![0.80], vec![0.55], vec![0.20]]);

        let summary = run_step(&mut state, &mut source).unwrap();

        assert_eq!(summary.step, 1);
        assert_eq!(
            statuses_of(&summary),
            vec![AgentStatus::Stable, AgentStatus::HelpSeeking, AgentStatus::Rest]
        );
        assert_eq!(summary.density, Density::Calm);
        assert_eq!(summary.environment_event, Some(TransitionEvent::EnvDownshift));
        assert_eq!(summary.transitions, 2);
        assert_eq!(summary.unstable_agents, 2);
        assert_eq!(summary.records.len(), 3);
        assert_eq!(state.clock.step(), 1);
    }

    #[test]
    fn records_carry_events() {
        let mut state = make_state(2, ContagionConfig::disabled());
        let mut source = ScriptedSignalSource::new(vec![vec![0.55], vec![0.9]]);
        let summary = run_step(&mut state, &mut source).unwrap();

        let help = summary.records.first().unwrap();
        assert_eq!(
            help.events,
            vec![
                TransitionEvent::EnterHelp,
                TransitionEvent::HelpRoutedEnv,
                TransitionEvent::EnvDownshift
            ]
        );
        let stable = summary.records.get(1).unwrap();
        assert!(!stable.transition);
        assert_eq!(stable.events, vec![TransitionEvent::EnvDownshift]);
    }

    #[test]
    fn evaluation_uses_previous_statuses_only() {
        // Agent 1's input depends on agent 0 only through the raw field,
        // never through agent 0's freshly computed status.
        let contagion = ContagionConfig::new(true, 0.5, FieldRule::MeanOfPeers).unwrap();
        let mut state = make_state(2, contagion);
        let mut source = ScriptedSignalSource::new(vec![vec![0.1], vec![0.9]]);
        let summary = run_step(&mut state, &mut source).unwrap();

        let first = summary.records.first().unwrap();
        let second = summary.records.get(1).unwrap();
        assert!((first.modulated_stability - 0.5).abs() < 1e-12);
        assert!((second.modulated_stability - 0.5).abs() < 1e-12);
        assert_eq!(first.status, AgentStatus::HelpSeeking);
        assert_eq!(second.status, AgentStatus::HelpSeeking);
    }

    #[test]
    fn out_of_domain_reading_leaves_state_untouched() {
        let mut state = make_state(2, ContagionConfig::disabled());
        let mut source = ScriptedSignalSource::new(vec![vec![0.5], vec![1.2]]);
        let before = state.roster.clone();

        let err = run_step(&mut state, &mut source).unwrap_err();
        assert!(matches!(
            err,
            StepError::Agent {
                agent_id: AgentId(1),
                source: AgentError::Domain { field: "stability", .. }
            }
        ));
        assert_eq!(state.roster, before);
        assert_eq!(state.clock.step(), 0);
        assert_eq!(state.environment.density, Density::Dense);
    }

    #[test]
    fn negative_speed_is_rejected() {
        let mut state = make_state(1, ContagionConfig::disabled());
        let reading = SignalReading {
            signals: SignalVector::from_stability(0.9),
            zone: None,
            speed: Some(-1.0),
        };
        let mut source = ScriptedSignalSource::from_readings(vec![vec![reading]]);
        let err = run_step(&mut state, &mut source).unwrap_err();
        assert!(matches!(
            err,
            StepError::Agent {
                source: AgentError::Domain { field: "speed", .. },
                ..
            }
        ));
    }

    #[test]
    fn exhausted_source_is_flagged() {
        let mut state = make_state(1, ContagionConfig::disabled());
        let mut source = ScriptedSignalSource::new(vec![vec![]]);
        let err = run_step(&mut state, &mut source).unwrap_err();
        assert!(err.is_source_exhausted());
        assert_eq!(state.clock.step(), 0);
    }

    #[test]
    fn zone_changes_mark_transitions() {
        let mut state = make_state(1, ContagionConfig::disabled());
        let zoned = |zone: &str| SignalReading {
            signals: SignalVector::from_stability(0.9),
            zone: Some(Zone::from(zone)),
            speed: Some(10.0),
        };
        let mut source =
            ScriptedSignalSource::from_readings(vec![vec![zoned("Library"), zoned("Park")]]);

        let first = run_step(&mut state, &mut source).unwrap();
        assert!(!first.records.first().unwrap().transition);

        let second = run_step(&mut state, &mut source).unwrap();
        let record = second.records.first().unwrap();
        assert!(record.transition);
        assert!(record.zone_changed);
        assert!(!record.status_changed);
        assert_eq!(record.zone, Some(Zone::from("Park")));
        assert_eq!(second.transitions, 1);
    }

    #[test]
    fn visual_agent_is_demoted_when_stability_drops() {
        let config =
            SimulationConfig::parse("run:\n  agent_count: 2\n  start_mode: visual\n").unwrap();
        let mut state = SimulationState::from_config(RunId::from(Uuid::nil()), &config).unwrap();
        assert!(state.roster.iter().all(|a| a.mode == RunMode::Visual));

        // Agent 0 stays comfortably stable; agent 1 is still Stable at 0.7
        // but below visual_min_stable (0.75), then falls into Rest.
        let mut source =
            ScriptedSignalSource::new(vec![vec![0.9, 0.9, 0.9], vec![0.9, 0.7, 0.1]]);

        let first = run_step(&mut state, &mut source).unwrap();
        assert!(first.records.iter().all(|r| r.mode == RunMode::Visual));
        assert!(
            first
                .records
                .iter()
                .all(|r| !r.events.contains(&TransitionEvent::ExitVisualToHeadless))
        );

        let second = run_step(&mut state, &mut source).unwrap();
        let steady = second.records.first().unwrap();
        let demoted = second.records.get(1).unwrap();
        assert_eq!(steady.mode, RunMode::Visual);
        assert_eq!(demoted.status, AgentStatus::Stable);
        assert_eq!(demoted.mode, RunMode::Headless);
        assert_eq!(demoted.events, vec![TransitionEvent::ExitVisualToHeadless]);

        // Demotion is one-way and fires once.
        let third = run_step(&mut state, &mut source).unwrap();
        let later = third.records.get(1).unwrap();
        assert_eq!(later.status, AgentStatus::Rest);
        assert_eq!(later.mode, RunMode::Headless);
        assert!(!later.events.contains(&TransitionEvent::ExitVisualToHeadless));
        assert_eq!(state.roster.get(AgentId::new(0)).unwrap().mode, RunMode::Visual);
    }

    #[test]
    fn headless_start_never_emits_mode_events() {
        let mut state = make_state(1, ContagionConfig::disabled());
        let mut source = ScriptedSignalSource::new(vec![vec![0.9, 0.1]]);
        for _ in 0..2 {
            let summary = run_step(&mut state, &mut source).unwrap();
            let record = summary.records.first().unwrap();
            assert_eq!(record.mode, RunMode::Headless);
            assert!(!record.events.contains(&TransitionEvent::ExitVisualToHeadless));
        }
    }

    #[test]
    fn invalid_enabled_contagion_is_rejected_at_construction() {
        let contagion = ContagionConfig {
            enabled: true,
            weight: 3.0,
            field: FieldRule::Mean,
        };
        let result =
            SimulationState::new(RunId::from(Uuid::nil()), 1, Thresholds::default(), contagion);
        assert!(matches!(result, Err(AgentError::Config { .. })));
    }
}
