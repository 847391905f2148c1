//! Zone transition matrices.
//!
//! Counts `from -> to` zone changes per agent across a record stream. Only
//! changes between two known zones count; the first zone an agent reports
//! is its starting point, not a transition.

use std::collections::BTreeMap;

use sandboxtown_types::{AgentId, StepRecord, Zone};
use serde::{Deserialize, Serialize};

/// One cell of a transition matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneTransition {
    /// Zone the agent left.
    pub from: Zone,
    /// Zone the agent entered.
    pub to: Zone,
    /// How often this move happened.
    pub count: u64,
}

/// Per-agent zone transition counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionMatrix {
    cells: BTreeMap<AgentId, BTreeMap<(Zone, Zone), u64>>,
}

impl TransitionMatrix {
    /// Count of `from -> to` moves for one agent.
    pub fn count(&self, agent_id: AgentId, from: &Zone, to: &Zone) -> u64 {
        self.cells
            .get(&agent_id)
            .and_then(|cells| cells.get(&(from.clone(), to.clone())))
            .copied()
            .unwrap_or(0)
    }

    /// Total zone changes for one agent.
    pub fn total(&self, agent_id: AgentId) -> u64 {
        self.cells
            .get(&agent_id)
            .map_or(0, |cells| cells.values().fold(0_u64, |acc, n| acc.saturating_add(*n)))
    }

    /// Agents with at least one recorded transition, ascending.
    pub fn agents(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.cells.keys().copied()
    }

    /// One agent's transitions, most common first. Ties keep `(from, to)`
    /// order so the listing is stable.
    pub fn ranked(&self, agent_id: AgentId) -> Vec<ZoneTransition> {
        let mut list: Vec<ZoneTransition> = self
            .cells
            .get(&agent_id)
            .into_iter()
            .flatten()
            .map(|((from, to), count)| ZoneTransition {
                from: from.clone(),
                to: to.clone(),
                count: *count,
            })
            .collect();
        list.sort_by(|a, b| b.count.cmp(&a.count));
        list
    }
}

/// Build the zone transition matrix for a record stream.
///
/// Records are ordered by step within each agent before counting.
pub fn transition_matrix(records: &[StepRecord]) -> TransitionMatrix {
    let mut by_agent: BTreeMap<AgentId, Vec<&StepRecord>> = BTreeMap::new();
    for record in records {
        by_agent.entry(record.agent_id).or_default().push(record);
    }

    let mut matrix = TransitionMatrix::default();
    for (agent_id, mut rows) in by_agent {
        rows.sort_by_key(|r| r.step);
        let mut previous: Option<&Zone> = None;
        for row in rows {
            let Some(zone) = row.zone.as_ref() else {
                continue;
            };
            if let Some(from) = previous
                && from != zone
            {
                let count = matrix
                    .cells
                    .entry(agent_id)
                    .or_default()
                    .entry((from.clone(), zone.clone()))
                    .or_insert(0);
                *count = count.saturating_add(1);
            }
            previous = Some(zone);
        }
    }
    matrix
}
