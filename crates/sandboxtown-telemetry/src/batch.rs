//! Cross-run aggregation.
//!
//! [`aggregate_batch`] averages each agent's metrics over many
//! [`RunSummary`] values, typically one per seed.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use sandboxtown_types::{AgentId, Zone};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::TelemetryError;
use crate::summary::{RunSummary, as_f64, len_u64, mean_and_std};

/// Mean metrics for one agent across a batch of runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAgentSummary {
    /// The agent.
    pub agent_id: AgentId,
    /// Runs in which the agent appeared.
    pub runs: u64,
    /// Mean record count.
    pub mean_rows: f64,
    /// Mean transitions (status or zone).
    pub mean_transitions: f64,
    /// Mean status transitions.
    pub mean_status_transitions: f64,
    /// Mean zone transitions.
    pub mean_zone_transitions: f64,
    /// Mean pause ratio.
    pub mean_pause_ratio: f64,
    /// Spread of the pause ratio across runs (population).
    pub std_pause_ratio: f64,
    /// Mean of per-run average speed, over runs that reported speed.
    pub mean_avg_speed: Option<f64>,
    /// Mean of per-run speed spread, over runs that reported speed.
    pub mean_std_speed: Option<f64>,
    /// Mean zone percentage over every run the agent appears in. A run in
    /// which the agent never entered a zone contributes 0.
    pub mean_zone_pct: BTreeMap<Zone, f64>,
}

/// Mean metrics across a batch of runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Number of run summaries aggregated.
    pub runs: u64,
    /// Mean final step across runs.
    pub mean_steps: f64,
    /// Per-agent means, ascending id.
    pub agents: Vec<BatchAgentSummary>,
}

#[derive(Default)]
struct Accumulator {
    rows: Vec<f64>,
    transitions: Vec<f64>,
    status_transitions: Vec<f64>,
    zone_transitions: Vec<f64>,
    pause_ratio: Vec<f64>,
    avg_speed: Vec<f64>,
    std_speed: Vec<f64>,
    zone_pct: BTreeMap<Zone, Vec<f64>>,
}

/// Average per-agent metrics over a batch of run summaries.
pub fn aggregate_batch(summaries: &[RunSummary]) -> Result<BatchSummary, TelemetryError> {
    if summaries.is_empty() {
        return Err(TelemetryError::EmptyBatch);
    }

    let mut by_agent: BTreeMap<AgentId, Accumulator> = BTreeMap::new();
    for run in summaries {
        for agent in &run.agents {
            let acc = by_agent.entry(agent.agent_id).or_default();
            acc.rows.push(as_f64(agent.rows));
            acc.transitions.push(as_f64(agent.transitions));
            acc.status_transitions.push(as_f64(agent.status_transitions));
            acc.zone_transitions.push(as_f64(agent.zone_transitions));
            acc.pause_ratio.push(agent.pause_ratio);
            acc.avg_speed.extend(agent.avg_speed);
            acc.std_speed.extend(agent.std_speed);
            for (zone, pct) in &agent.zone_pct {
                acc.zone_pct.entry(zone.clone()).or_default().push(*pct);
            }
        }
    }

    let agents = by_agent
        .into_iter()
        .map(|(agent_id, acc)| {
            let (mean_pause_ratio, std_pause_ratio) =
                mean_and_std(&acc.pause_ratio).unwrap_or((0.0, 0.0));
            let runs = as_f64(len_u64(acc.rows.len()));
            BatchAgentSummary {
                agent_id,
                runs: len_u64(acc.rows.len()),
                mean_rows: mean(&acc.rows),
                mean_transitions: mean(&acc.transitions),
                mean_status_transitions: mean(&acc.status_transitions),
                mean_zone_transitions: mean(&acc.zone_transitions),
                mean_pause_ratio,
                std_pause_ratio,
                mean_avg_speed: mean_and_std(&acc.avg_speed).map(|(m, _)| m),
                mean_std_speed: mean_and_std(&acc.std_speed).map(|(m, _)| m),
                mean_zone_pct: acc
                    .zone_pct
                    .iter()
                    .map(|(zone, values)| (zone.clone(), values.iter().sum::<f64>() / runs))
                    .collect(),
            }
        })
        .collect();

    let steps: Vec<f64> = summaries.iter().map(|s| as_f64(s.steps)).collect();

    Ok(BatchSummary {
        runs: len_u64(summaries.len()),
        mean_steps: mean(&steps),
        agents,
    })
}

/// Write a batch summary as pretty JSON, creating parent directories as
/// needed.
pub fn write_batch_json(batch: &BatchSummary, path: &Path) -> Result<(), TelemetryError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(batch)?)?;
    info!(path = %path.display(), runs = batch.runs, "Batch summary written");
    Ok(())
}

fn mean(values: &[f64]) -> f64 {
    mean_and_std(values).map_or(0.0, |(m, _)| m)
}
