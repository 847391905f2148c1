//! Per-agent comparison of two run summaries.
//!
//! [`compare_summaries`] lines up a control and a treatment summary agent by
//! agent and reports, for every metric, `treatment - control` and the change
//! relative to `|control|` in percent. Agents present in only one run are
//! kept, with the missing side left empty.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use sandboxtown_types::{AgentId, RunId, Zone};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::TelemetryError;
use crate::summary::{AgentSummary, RunSummary, as_f64};

/// One metric on both sides of a comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    /// Control value, if the control run has it.
    pub control: Option<f64>,
    /// Treatment value, if the treatment run has it.
    pub treatment: Option<f64>,
    /// `treatment - control`, when both sides are present.
    pub delta: Option<f64>,
    /// `delta / |control| * 100`. Undefined (empty) when control is 0.
    pub pct_delta: Option<f64>,
}

impl MetricDelta {
    /// Compare two optional values.
    pub fn between(control: Option<f64>, treatment: Option<f64>) -> Self {
        let delta = control.zip(treatment).map(|(a, b)| b - a);
        let pct_delta = control
            .zip(delta)
            .filter(|&(a, _)| a != 0.0)
            .map(|(a, d)| d / a.abs() * 100.0);
        Self {
            control,
            treatment,
            delta,
            pct_delta,
        }
    }
}

/// All compared metrics for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentComparison {
    /// The agent.
    pub agent_id: AgentId,
    /// Status or zone transitions.
    pub transitions: MetricDelta,
    /// Status transitions.
    pub status_transitions: MetricDelta,
    /// Zone transitions.
    pub zone_transitions: MetricDelta,
    /// Pause ratio.
    pub pause_ratio: MetricDelta,
    /// Average speed.
    pub avg_speed: MetricDelta,
    /// Speed spread.
    pub std_speed: MetricDelta,
    /// Modulated stability average.
    pub avg_modulated_stability: MetricDelta,
    /// Zone percentages over the union of zones either side visited. A zone
    /// the agent never entered in one run counts as 0 on that side.
    pub zone_pct: BTreeMap<Zone, MetricDelta>,
}

/// Control versus treatment, per agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryComparison {
    /// The baseline run.
    pub control_run: RunId,
    /// The variant run.
    pub treatment_run: RunId,
    /// One entry per agent in either run, ascending id.
    pub agents: Vec<AgentComparison>,
}

impl SummaryComparison {
    /// Look up one agent's comparison.
    pub fn agent(&self, agent_id: AgentId) -> Option<&AgentComparison> {
        self.agents.iter().find(|a| a.agent_id == agent_id)
    }
}

/// Build the per-agent delta table `treatment - control`.
pub fn compare_summaries(control: &RunSummary, treatment: &RunSummary) -> SummaryComparison {
    let ids: BTreeSet<AgentId> = control
        .agents
        .iter()
        .chain(&treatment.agents)
        .map(|a| a.agent_id)
        .collect();

    let agents = ids
        .into_iter()
        .map(|agent_id| {
            compare_agent(agent_id, control.agent(agent_id), treatment.agent(agent_id))
        })
        .collect();

    SummaryComparison {
        control_run: control.run_id,
        treatment_run: treatment.run_id,
        agents,
    }
}

fn compare_agent(
    agent_id: AgentId,
    a: Option<&AgentSummary>,
    b: Option<&AgentSummary>,
) -> AgentComparison {
    let metric = |get: fn(&AgentSummary) -> Option<f64>| {
        MetricDelta::between(a.and_then(get), b.and_then(get))
    };

    let zones: BTreeSet<&Zone> = a
        .into_iter()
        .chain(b)
        .flat_map(|s| s.zone_pct.keys())
        .collect();
    let share = |side: Option<&AgentSummary>, zone: &Zone| {
        side.map(|s| s.zone_pct.get(zone).copied().unwrap_or(0.0))
    };
    let zone_pct = zones
        .into_iter()
        .map(|zone| {
            (
                zone.clone(),
                MetricDelta::between(share(a, zone), share(b, zone)),
            )
        })
        .collect();

    AgentComparison {
        agent_id,
        transitions: metric(|s| Some(as_f64(s.transitions))),
        status_transitions: metric(|s| Some(as_f64(s.status_transitions))),
        zone_transitions: metric(|s| Some(as_f64(s.zone_transitions))),
        pause_ratio: metric(|s| Some(s.pause_ratio)),
        avg_speed: metric(|s| s.avg_speed),
        std_speed: metric(|s| s.std_speed),
        avg_modulated_stability: metric(|s| Some(s.avg_modulated_stability)),
        zone_pct,
    }
}

/// Write a comparison as pretty JSON, creating parent directories as needed.
pub fn write_comparison_json(
    comparison: &SummaryComparison,
    path: &Path,
) -> Result<(), TelemetryError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(comparison)?)?;
    info!(
        path = %path.display(),
        control = %comparison.control_run,
        treatment = %comparison.treatment_run,
        "Comparison written"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use sandboxtown_types::AgentStatus;

    use super::*;

    fn agent(id: u32, transitions: u64, pause_ratio: f64, zones: &[(&str, f64)]) -> AgentSummary {
        AgentSummary {
            agent_id: AgentId::new(id),
            rows: 10,
            transitions,
            status_transitions: transitions,
            zone_transitions: 0,
            pause_ratio,
            zone_pct: zones.iter().map(|&(z, p)| (Zone::new(z), p)).collect(),
            status_pct: BTreeMap::new(),
            avg_speed: Some(20.0),
            std_speed: None,
            avg_raw_stability: 0.7,
            avg_modulated_stability: 0.7,
            final_status: AgentStatus::Stable,
            final_zone: None,
        }
    }

    fn run(agents: Vec<AgentSummary>) -> RunSummary {
        RunSummary {
            run_id: RunId::new(),
            generated_at: Utc::now(),
            steps: 10,
            records: 0,
            pause_speed_threshold: 2.0,
            final_density: None,
            env_downshifts: 0,
            env_upshifts: 0,
            agents,
        }
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn delta_and_percent_are_relative_to_control() {
        let m = MetricDelta::between(Some(4.0), Some(5.0));
        assert!(close(m.delta, 1.0));
        assert!(close(m.pct_delta, 25.0));

        let negative = MetricDelta::between(Some(-2.0), Some(-3.0));
        assert!(close(negative.delta, -1.0));
        assert!(close(negative.pct_delta, -50.0));
    }

    #[test]
    fn zero_control_has_no_percent() {
        let m = MetricDelta::between(Some(0.0), Some(3.0));
        assert!(close(m.delta, 3.0));
        assert!(m.pct_delta.is_none());
    }

    #[test]
    fn missing_side_has_no_delta() {
        let m = MetricDelta::between(None, Some(3.0));
        assert!(m.delta.is_none());
        assert!(m.pct_delta.is_none());
    }

    #[test]
    fn compares_agents_across_runs() {
        let control = run(vec![
            agent(0, 4, 0.2, &[("Library", 100.0)]),
            agent(1, 0, 0.0, &[]),
        ]);
        let treatment = run(vec![
            agent(0, 2, 0.3, &[("Park", 100.0)]),
            agent(1, 3, 0.0, &[]),
            agent(2, 1, 0.5, &[]),
        ]);

        let cmp = compare_summaries(&control, &treatment);
        assert_eq!(cmp.control_run, control.run_id);
        assert_eq!(cmp.agents.len(), 3);

        let first = cmp.agent(AgentId::new(0)).unwrap();
        assert!(close(first.transitions.delta, -2.0));
        assert!(close(first.transitions.pct_delta, -50.0));
        assert!(close(first.pause_ratio.delta, 0.1));
        assert!(close(first.avg_speed.delta, 0.0));
        assert!(first.std_speed.delta.is_none());
        assert!(close(first.zone_pct[&Zone::new("Library")].delta, -100.0));
        assert!(close(first.zone_pct[&Zone::new("Park")].treatment, 100.0));
        assert!(close(first.zone_pct[&Zone::new("Park")].control, 0.0));
        assert!(first.zone_pct[&Zone::new("Park")].pct_delta.is_none());

        let second = cmp.agent(AgentId::new(1)).unwrap();
        assert!(close(second.transitions.delta, 3.0));
        assert!(second.transitions.pct_delta.is_none());

        let third = cmp.agent(AgentId::new(2)).unwrap();
        assert!(third.transitions.control.is_none());
        assert!(third.transitions.delta.is_none());
    }

    #[test]
    fn comparison_file_written() {
        let dir = tempfile::tempdir().unwrap();
        let control = run(vec![agent(0, 1, 0.0, &[])]);
        let treatment = run(vec![agent(0, 2, 0.0, &[])]);
        let path = dir.path().join("ab.compare.json");

        write_comparison_json(&compare_summaries(&control, &treatment), &path).unwrap();

        let back: SummaryComparison =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(close(back.agents[0].transitions.pct_delta, 100.0));
    }
}
