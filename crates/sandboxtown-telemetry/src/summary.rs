//! Per-run aggregation of the step record stream.
//!
//! [`summarize`] folds the records of one run into a [`RunSummary`] with one
//! [`AgentSummary`] per agent, ordered by agent id. Summaries are written as
//! pretty JSON next to the record file (`<run_id>.summary.json`).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sandboxtown_types::{AgentId, AgentStatus, Density, RunId, StepRecord, TransitionEvent, Zone};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::TelemetryError;

/// Speeds strictly below this count as paused (units of the signal source).
pub const DEFAULT_PAUSE_SPEED_THRESHOLD: f64 = 2.0;

/// Aggregated metrics for one agent over one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    /// The agent.
    pub agent_id: AgentId,
    /// Number of records (steps observed).
    pub rows: u64,
    /// Records flagged as a transition (status or zone change).
    pub transitions: u64,
    /// Records where the status changed.
    pub status_transitions: u64,
    /// Records where the zone changed.
    pub zone_transitions: u64,
    /// Fraction of records in which the agent was paused: resting, or moving
    /// slower than the pause threshold.
    pub pause_ratio: f64,
    /// Percentage of records spent in each zone (0-100). Records with no
    /// zone yet are counted in `rows` but not listed here.
    pub zone_pct: BTreeMap<Zone, f64>,
    /// Percentage of records spent in each status (0-100), keyed by label.
    pub status_pct: BTreeMap<String, f64>,
    /// Mean reported speed, if any record carried one.
    pub avg_speed: Option<f64>,
    /// Population standard deviation of reported speed.
    pub std_speed: Option<f64>,
    /// Mean raw stability.
    pub avg_raw_stability: f64,
    /// Mean stability after contagion.
    pub avg_modulated_stability: f64,
    /// Status at the last record.
    pub final_status: AgentStatus,
    /// Zone at the last record.
    pub final_zone: Option<Zone>,
}

/// Aggregated metrics for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// The run these records belong to.
    pub run_id: RunId,
    /// When the summary was produced.
    pub generated_at: DateTime<Utc>,
    /// Highest step number seen.
    pub steps: u64,
    /// Total records summarised.
    pub records: u64,
    /// Threshold used for `pause_ratio`.
    pub pause_speed_threshold: f64,
    /// Density at the last step, if any.
    pub final_density: Option<Density>,
    /// Steps at which the environment downshifted.
    pub env_downshifts: u64,
    /// Steps at which the environment upshifted.
    pub env_upshifts: u64,
    /// Per-agent metrics, ascending id.
    pub agents: Vec<AgentSummary>,
}

impl RunSummary {
    /// Look up one agent's summary.
    pub fn agent(&self, agent_id: AgentId) -> Option<&AgentSummary> {
        self.agents.iter().find(|a| a.agent_id == agent_id)
    }
}

/// Summarise the records of one run.
///
/// Records may arrive in any order; they are grouped by agent and ordered
/// by step before counting.
pub fn summarize(
    run_id: RunId,
    records: &[StepRecord],
    pause_speed_threshold: f64,
) -> Result<RunSummary, TelemetryError> {
    if !pause_speed_threshold.is_finite() || pause_speed_threshold < 0.0 {
        return Err(TelemetryError::InvalidThreshold(pause_speed_threshold));
    }

    let mut by_agent: BTreeMap<AgentId, Vec<&StepRecord>> = BTreeMap::new();
    for record in records {
        by_agent.entry(record.agent_id).or_default().push(record);
    }

    let mut agents = Vec::with_capacity(by_agent.len());
    for (agent_id, mut rows) in by_agent {
        rows.sort_by_key(|r| r.step);
        if let Some(summary) = summarize_agent(agent_id, &rows, pause_speed_threshold) {
            agents.push(summary);
        }
    }

    // One density per step; take it from the first record of each step.
    let mut by_step: BTreeMap<u64, &StepRecord> = BTreeMap::new();
    for record in records {
        by_step.entry(record.step).or_insert(record);
    }
    let env_downshifts = count_event(by_step.values().copied(), TransitionEvent::EnvDownshift);
    let env_upshifts = count_event(by_step.values().copied(), TransitionEvent::EnvUpshift);
    let last = by_step.last_key_value();

    let summary = RunSummary {
        run_id,
        generated_at: Utc::now(),
        steps: last.map_or(0, |(step, _)| *step),
        records: len_u64(records.len()),
        pause_speed_threshold,
        final_density: last.map(|(_, record)| record.density),
        env_downshifts,
        env_upshifts,
        agents,
    };

    info!(
        run_id = %summary.run_id,
        steps = summary.steps,
        agents = summary.agents.len(),
        records = summary.records,
        "Run summarised"
    );

    Ok(summary)
}

fn summarize_agent(
    agent_id: AgentId,
    rows: &[&StepRecord],
    pause_speed_threshold: f64,
) -> Option<AgentSummary> {
    let last = rows.last()?;
    let row_count = len_u64(rows.len());

    let mut transitions: u64 = 0;
    let mut status_transitions: u64 = 0;
    let mut zone_transitions: u64 = 0;
    let mut paused: u64 = 0;
    let mut zone_counts: BTreeMap<Zone, u64> = BTreeMap::new();
    let mut status_counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut speeds = Vec::new();
    let mut raw_sum = 0.0;
    let mut modulated_sum = 0.0;

    for row in rows {
        transitions = transitions.saturating_add(u64::from(row.transition));
        status_transitions = status_transitions.saturating_add(u64::from(row.status_changed));
        zone_transitions = zone_transitions.saturating_add(u64::from(row.zone_changed));

        let slow = row.speed.is_some_and(|s| s < pause_speed_threshold);
        if row.status == AgentStatus::Rest || slow {
            paused = paused.saturating_add(1);
        }

        if let Some(zone) = &row.zone {
            let count = zone_counts.entry(zone.clone()).or_insert(0);
            *count = count.saturating_add(1);
        }
        let count = status_counts
            .entry(row.status.label().to_owned())
            .or_insert(0);
        *count = count.saturating_add(1);

        speeds.extend(row.speed);
        raw_sum += row.raw_stability;
        modulated_sum += row.modulated_stability;
    }

    let (avg_speed, std_speed) = match mean_and_std(&speeds) {
        Some((mean, std)) => (Some(mean), Some(std)),
        None => (None, None),
    };

    Some(AgentSummary {
        agent_id,
        rows: row_count,
        transitions,
        status_transitions,
        zone_transitions,
        pause_ratio: ratio(paused, row_count),
        zone_pct: percentages(zone_counts, row_count),
        status_pct: percentages(status_counts, row_count),
        avg_speed,
        std_speed,
        avg_raw_stability: raw_sum / as_f64(row_count),
        avg_modulated_stability: modulated_sum / as_f64(row_count),
        final_status: last.status,
        final_zone: last.zone.clone(),
    })
}

fn count_event<'a>(records: impl Iterator<Item = &'a StepRecord>, event: TransitionEvent) -> u64 {
    let count = records.filter(|r| r.events.contains(&event)).count();
    len_u64(count)
}

fn percentages<K: Ord>(counts: BTreeMap<K, u64>, total: u64) -> BTreeMap<K, f64> {
    counts
        .into_iter()
        .map(|(key, count)| (key, ratio(count, total) * 100.0))
        .collect()
}

/// Mean and population standard deviation. `None` for an empty slice.
pub(crate) fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let count_f = as_f64(len_u64(values.len()));
    let mean = values.iter().sum::<f64>() / count_f;
    let variance_sum: f64 = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum();
    Some((mean, (variance_sum / count_f).sqrt()))
}

pub(crate) fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        as_f64(part) / as_f64(total)
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) const fn as_f64(value: u64) -> f64 {
    value as f64
}

pub(crate) fn len_u64(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Path of the summary file for a run inside `output_dir`.
pub fn summary_path(output_dir: &Path, run_id: RunId) -> PathBuf {
    output_dir.join(format!("{run_id}.summary.json"))
}

/// Write a summary as pretty JSON, creating parent directories as needed.
pub fn write_summary_json(summary: &RunSummary, path: &Path) -> Result<(), TelemetryError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json)?;
    info!(path = %path.display(), "Summary written");
    Ok(())
}

/// Read a summary written by [`write_summary_json`].
pub fn read_summary_json(path: &Path) -> Result<RunSummary, TelemetryError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
