//! Integration tests: drive real runs through the telemetry sinks.
//!
//! Each test builds a small simulation, runs it with a [`SinkCallback`],
//! and checks what lands on disk and in the summaries.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing
)]

use sandboxtown_agents::{ContagionConfig, Thresholds};
use sandboxtown_core::{
    ScriptedSignalSource, SimulationConfig, SimulationState, create_contagion_pair,
    run_simulation,
};
use sandboxtown_telemetry::{
    DEFAULT_PAUSE_SPEED_THRESHOLD, JsonlSink, MemorySink, RunSummary, SinkCallback,
    aggregate_batch, compare_summaries, read_jsonl, read_summary_json, summarize, summary_path,
    transition_matrix, write_summary_json,
};
use sandboxtown_types::{AgentId, AgentStatus, RunId, SignalReading, SignalVector, Zone};
use uuid::Uuid;

// =============================================================================
// Helpers
// =============================================================================

fn state(agent_count: u32) -> SimulationState {
    SimulationState::new(
        RunId::from(Uuid::nil()),
        agent_count,
        Thresholds::default(),
        ContagionConfig::disabled(),
    )
    .unwrap()
}

fn reading(stability: f64, zone: &str, speed: f64) -> SignalReading {
    SignalReading {
        signals: SignalVector::from_stability(stability),
        zone: Some(Zone::new(zone)),
        speed: Some(speed),
    }
}

fn summarize_arm(config: &SimulationConfig, stabilities: Vec<Vec<f64>>) -> RunSummary {
    let run_id = RunId::new();
    let mut sim = SimulationState::from_config(run_id, config).unwrap();
    let mut source = ScriptedSignalSource::new(stabilities);
    let mut callback = SinkCallback::new(MemorySink::new());
    run_simulation(&mut sim, &mut source, config.run.max_steps, &mut callback).unwrap();
    let records = callback.finish().unwrap().into_records();
    summarize(run_id, &records, config.telemetry.pause_speed_threshold).unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn jsonl_sink_captures_every_record() {
    let dir = tempfile::tempdir().unwrap();
    let mut sim = state(2);
    let mut source = ScriptedSignalSource::new(vec![vec![0.9, 0.5, 0.2], vec![0.8, 0.8, 0.8]]);

    let sinks = (
        MemorySink::new(),
        JsonlSink::create(dir.path(), sim.run_id).unwrap(),
    );
    let mut callback = SinkCallback::new(sinks);
    run_simulation(&mut sim, &mut source, 10, &mut callback).unwrap();
    assert_eq!(callback.failures(), 0);

    let (memory, jsonl) = callback.finish().unwrap();
    let from_disk = read_jsonl(jsonl.path()).unwrap();
    assert_eq!(from_disk.len(), 6);
    assert_eq!(from_disk, memory.into_records());
}

#[test]
fn summary_reflects_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut sim = state(1);
    let mut source = ScriptedSignalSource::from_readings(vec![vec![
        reading(0.9, "Library", 12.0),
        reading(0.9, "Library", 11.0),
        reading(0.2, "Rest", 0.0),
        reading(0.9, "Park", 14.0),
    ]]);
    let mut callback = SinkCallback::new(MemorySink::new());
    run_simulation(&mut sim, &mut source, 10, &mut callback).unwrap();
    let records = callback.finish().unwrap().into_records();

    let summary = summarize(sim.run_id, &records, DEFAULT_PAUSE_SPEED_THRESHOLD).unwrap();
    let agent = summary.agent(AgentId::new(0)).unwrap();
    assert_eq!(agent.rows, 4);
    assert_eq!(agent.zone_transitions, 2);
    assert_eq!(agent.status_transitions, 2);
    assert!((agent.pause_ratio - 0.25).abs() < 1e-9);
    assert_eq!(agent.final_status, AgentStatus::Stable);

    let matrix = transition_matrix(&records);
    assert_eq!(
        matrix.count(AgentId::new(0), &Zone::new("Library"), &Zone::new("Rest")),
        1
    );

    let path = summary_path(dir.path(), sim.run_id);
    write_summary_json(&summary, &path).unwrap();
    let back = read_summary_json(&path).unwrap();
    assert_eq!(back.agents, summary.agents);

    let batch = aggregate_batch(&[summary, back]).unwrap();
    assert_eq!(batch.runs, 2);
    assert_eq!(batch.agents[0].runs, 2);
}

#[test]
fn contagion_pair_comparison_shows_the_treatment_effect() {
    let base = SimulationConfig::parse("run:\n  agent_count: 2\n  max_steps: 3\n").unwrap();
    let pair = create_contagion_pair(&base);
    let inputs = vec![vec![0.9, 0.9, 0.9], vec![0.58, 0.58, 0.58]];

    let control = summarize_arm(&pair.control, inputs.clone());
    let treatment = summarize_arm(&pair.treatment, inputs);
    let cmp = compare_summaries(&control, &treatment);

    // Control: 0.58 is below help_enter, so agent 1 starts seeking help.
    // Treatment: the 0.74 population mean lifts it to 0.62 and it stays stable.
    let helped = cmp.agent(AgentId::new(1)).unwrap();
    assert_eq!(helped.transitions.control, Some(1.0));
    assert_eq!(helped.transitions.treatment, Some(0.0));
    assert_eq!(helped.transitions.delta, Some(-1.0));
    assert_eq!(helped.transitions.pct_delta, Some(-100.0));

    let steady = cmp.agent(AgentId::new(0)).unwrap();
    assert_eq!(steady.transitions.delta, Some(0.0));
    assert!(steady.transitions.pct_delta.is_none());
}
