//! End-to-end scenarios for the step pipeline and run loop.
//!
//! These drive the public API only: configuration, state construction,
//! scripted signal sources, and the bounded runner.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc
)]

use sandboxtown_agents::{ContagionConfig, FieldRule, Thresholds, apply_contagion, next_status};
use sandboxtown_core::{
    EndReason, NoOpCallback, RecordCollector, ScriptedSignalSource, SimulationConfig,
    SimulationState, create_contagion_pair, run_simulation, run_step,
};
use sandboxtown_types::{AgentStatus, Density, RunId, StepRecord, TransitionEvent};
use sandboxtown_world::update_environment;
use uuid::Uuid;

// =============================================================================
// Helpers
// =============================================================================

fn fixed_run_id() -> RunId {
    RunId::from(Uuid::nil())
}

fn state_with(agent_count: u32, contagion: ContagionConfig) -> SimulationState {
    SimulationState::new(fixed_run_id(), agent_count, Thresholds::default(), contagion)
        .expect("valid state")
}

fn wave(agent: usize, steps: usize) -> Vec<f64> {
    // Deterministic per-agent stability traces sweeping through every band.
    (0..steps)
        .map(|t| {
            let phase = (t + agent * 3) % 12;
            [0.90, 0.80, 0.70, 0.62, 0.58, 0.50, 0.42, 0.35, 0.28, 0.20, 0.45, 0.66][phase]
        })
        .collect()
}

fn run_records(contagion: ContagionConfig, agents: usize, steps: usize) -> Vec<StepRecord> {
    let mut state = state_with(u32::try_from(agents).unwrap(), contagion);
    let mut source =
        ScriptedSignalSource::new((0..agents).map(|agent| wave(agent, steps)).collect());
    let mut collector = RecordCollector::default();
    run_simulation(&mut state, &mut source, steps as u64, &mut collector).unwrap();
    collector.records
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn identical_inputs_produce_identical_streams() {
    let contagion = ContagionConfig::new(true, 0.3, FieldRule::MeanOfPeers).unwrap();
    let first = run_records(contagion, 4, 36);
    let second = run_records(contagion, 4, 36);

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

// =============================================================================
// Contagion
// =============================================================================

#[test]
fn disabled_contagion_leaves_inputs_untouched() {
    let records = run_records(ContagionConfig::disabled(), 3, 24);
    for record in &records {
        assert!((record.raw_stability - record.modulated_stability).abs() < f64::EPSILON);
    }
}

#[test]
fn disabled_contagion_matches_plain_evaluator() {
    // With contagion off, each agent's status sequence is exactly what the
    // bare evaluator produces from its raw trace.
    let records = run_records(ContagionConfig::disabled(), 2, 24);
    for agent in 0..2_usize {
        let mut status = AgentStatus::Stable;
        let expected: Vec<AgentStatus> = wave(agent, 24)
            .into_iter()
            .map(|x| {
                status = next_status(status, x).unwrap();
                status
            })
            .collect();
        let actual: Vec<AgentStatus> = records
            .iter()
            .filter(|r| r.agent_id.into_inner() as usize == agent)
            .map(|r| r.status)
            .collect();
        assert_eq!(actual, expected);
    }
}

#[test]
fn modulated_input_does_not_depend_on_previous_status() {
    let cfg = ContagionConfig::new(true, 0.5, FieldRule::Mean).unwrap();
    // Same raw signal and field, agents in different statuses.
    let from_stable = apply_contagion(0.5, 0.3, &cfg).unwrap();
    let from_rest = apply_contagion(0.5, 0.3, &cfg).unwrap();
    assert!((from_stable - from_rest).abs() < f64::EPSILON);

    // In the pipeline: two agents with identical raw traces but different
    // histories see identical modulated inputs at the step they share.
    let mut state = state_with(2, cfg);
    let mut source = ScriptedSignalSource::new(vec![vec![0.0, 0.5], vec![0.9, 0.5]]);
    run_step(&mut state, &mut source).unwrap();
    let second = run_step(&mut state, &mut source).unwrap();
    assert_eq!(second.records[0].previous_status, AgentStatus::Rest);
    assert_eq!(second.records[1].previous_status, AgentStatus::Stable);
    assert!(
        (second.records[0].modulated_stability - second.records[1].modulated_stability).abs()
            < f64::EPSILON
    );
}

// =============================================================================
// Hysteresis
// =============================================================================

#[test]
fn help_seeking_holds_inside_band() {
    assert_eq!(
        next_status(AgentStatus::HelpSeeking, 0.62).unwrap(),
        AgentStatus::HelpSeeking
    );
}

#[test]
fn rest_entry_takes_precedence() {
    assert_eq!(next_status(AgentStatus::Stable, 0.25).unwrap(), AgentStatus::Rest);
}

#[test]
fn rest_exit_boundary() {
    assert_ne!(next_status(AgentStatus::Rest, 0.40).unwrap(), AgentStatus::Rest);
    assert_eq!(next_status(AgentStatus::Rest, 0.399_999).unwrap(), AgentStatus::Rest);
}

// =============================================================================
// Environment
// =============================================================================

#[test]
fn environment_is_monotonic_without_upshift() {
    let records = run_records(ContagionConfig::disabled(), 3, 36);
    let mut seen_calm = false;
    for record in &records {
        if seen_calm {
            assert_eq!(record.density, Density::Calm);
        }
        seen_calm |= record.density == Density::Calm;
    }
    assert!(seen_calm);

    let all_stable = [AgentStatus::Stable; 3];
    assert_eq!(update_environment(&all_stable, Density::Calm), Density::Calm);
}

#[test]
fn upshift_policy_restores_density_from_config() {
    let config = SimulationConfig::parse(
        "run:\n  agent_count: 2\nenvironment:\n  start_density: calm\n  upshift_when_all_stable: true\n",
    )
    .unwrap();
    let mut state = SimulationState::from_config(fixed_run_id(), &config).unwrap();
    let mut source = ScriptedSignalSource::new(vec![vec![0.9], vec![0.9]]);
    let summary = run_step(&mut state, &mut source).unwrap();
    assert_eq!(summary.density, Density::Dense);
    assert_eq!(summary.environment_event, Some(TransitionEvent::EnvUpshift));
}

// =============================================================================
// End-to-end
// =============================================================================

#[test]
fn three_agent_single_step() {
    let mut state = state_with(3, ContagionConfig::disabled());
    let mut source = ScriptedSignalSource::new(vec![vec![0.80], vec![0.55], vec![0.20]]);
    let summary = run_step(&mut state, &mut source).unwrap();

    let statuses: Vec<AgentStatus> = summary.records.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![AgentStatus::Stable, AgentStatus::HelpSeeking, AgentStatus::Rest]
    );
    assert_eq!(summary.density, Density::Calm);
    assert_eq!(summary.records.iter().filter(|r| r.transition).count(), 2);
    assert!(summary.records.iter().all(|r| r.density == Density::Calm));
}

#[test]
fn contagion_pair_runs_both_arms() {
    let mut base = SimulationConfig::default();
    base.run.agent_count = 3;
    base.contagion.weight = 0.5;
    let pair = create_contagion_pair(&base);

    let mut control = SimulationState::from_config(fixed_run_id(), &pair.control).unwrap();
    let mut treatment = SimulationState::from_config(fixed_run_id(), &pair.treatment).unwrap();
    let traces: Vec<Vec<f64>> = (0..3).map(|agent| wave(agent, 12)).collect();

    let control_result = run_simulation(
        &mut control,
        &mut ScriptedSignalSource::new(traces.clone()),
        12,
        &mut NoOpCallback,
    )
    .unwrap();
    let treatment_result = run_simulation(
        &mut treatment,
        &mut ScriptedSignalSource::new(traces),
        12,
        &mut NoOpCallback,
    )
    .unwrap();

    assert_eq!(control_result.end_reason, EndReason::MaxStepsReached);
    assert_eq!(treatment_result.total_steps, 12);
    let final_control = control_result.final_summary.unwrap();
    let final_treatment = treatment_result.final_summary.unwrap();
    assert!(final_control.records.iter().all(|r| {
        (r.raw_stability - r.modulated_stability).abs() < f64::EPSILON
    }));
    assert!(final_treatment.records.iter().any(|r| {
        (r.raw_stability - r.modulated_stability).abs() > f64::EPSILON
    }));
}
