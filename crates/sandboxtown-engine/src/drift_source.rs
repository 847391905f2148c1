//! Synthetic zone-drift signal source.
//!
//! Each agent carries an internal state (energy, load, coherence,
//! curiosity) that drifts according to the zone it occupies. Agents commit
//! to a zone for a random number of steps, then re-pick the zone that best
//! fits their state plus a small seeded jitter. Stability is derived from
//! coherence and load, and speed from energy.
//!
//! The generator is deterministic per seed: one [`StdRng`] drives every
//! agent in ascending id order.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sandboxtown_core::{SignalSource, SourceError};
use sandboxtown_types::{AgentId, SignalReading, SignalVector, Zone};
use sandboxtown_world::ZoneCatalogue;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// Tuning for the drift source, loaded from the `drift` section of
/// `sandboxtown-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DriftConfig {
    /// Speed scale; actual speed is `base_speed * (0.35 + 1.05 * energy)`.
    #[serde(default = "default_base_speed")]
    pub base_speed: f64,

    /// Half-width of the uniform jitter added to each zone score.
    #[serde(default = "default_score_jitter")]
    pub score_jitter: f64,

    /// Half-width of the uniform noise added to the stability signal.
    #[serde(default = "default_stability_noise")]
    pub stability_noise: f64,

    /// Minimum steps an agent stays committed to a chosen zone.
    #[serde(default = "default_commit_min")]
    pub commit_min: u32,

    /// Maximum steps an agent stays committed to a chosen zone.
    #[serde(default = "default_commit_max")]
    pub commit_max: u32,

    /// An agent only switches zone when the best score beats its current
    /// zone's score by at least this margin.
    #[serde(default = "default_switch_margin")]
    pub switch_margin: f64,
}

const fn default_base_speed() -> f64 {
    60.0
}

const fn default_score_jitter() -> f64 {
    0.08
}

const fn default_stability_noise() -> f64 {
    0.03
}

const fn default_commit_min() -> u32 {
    4
}

const fn default_commit_max() -> u32 {
    12
}

const fn default_switch_margin() -> f64 {
    0.05
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            base_speed: default_base_speed(),
            score_jitter: default_score_jitter(),
            stability_noise: default_stability_noise(),
            commit_min: default_commit_min(),
            commit_max: default_commit_max(),
            switch_margin: default_switch_margin(),
        }
    }
}

impl DriftConfig {
    /// Reject non-finite or negative scales and an inverted commit range.
    pub fn validate(&self) -> Result<(), EngineError> {
        let scales = [
            ("base_speed", self.base_speed),
            ("score_jitter", self.score_jitter),
            ("stability_noise", self.stability_noise),
            ("switch_margin", self.switch_margin),
        ];
        for (name, value) in scales {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::Drift {
                    message: format!("drift.{name} must be finite and >= 0, got {value}"),
                });
            }
        }
        if self.commit_min == 0 || self.commit_min > self.commit_max {
            return Err(EngineError::Drift {
                message: format!(
                    "drift commit range must satisfy 1 <= commit_min <= commit_max, got {}..={}",
                    self.commit_min, self.commit_max
                ),
            });
        }
        Ok(())
    }
}

/// Load the `drift` section from a YAML config file.
///
/// A missing file or a file without a `drift` key yields the defaults.
pub fn load_drift_config(path: &Path) -> Result<DriftConfig, EngineError> {
    if !path.exists() {
        return Ok(DriftConfig::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| EngineError::Drift {
        message: format!("failed to read config file: {e}"),
    })?;
    parse_drift_config(&contents)
}

/// Parse the `drift` section out of a full YAML config document.
pub fn parse_drift_config(yaml: &str) -> Result<DriftConfig, EngineError> {
    if yaml.trim().is_empty() {
        return Ok(DriftConfig::default());
    }
    let raw: serde_yml::Value = serde_yml::from_str(yaml).map_err(|e| EngineError::Drift {
        message: format!("failed to parse config YAML: {e}"),
    })?;
    let config = match raw.get("drift") {
        Some(section) => {
            serde_yml::from_value(section.clone()).map_err(|e| EngineError::Drift {
                message: format!("failed to parse drift config: {e}"),
            })?
        }
        None => DriftConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

// -----------------------------------------------------------------------
// Zone dynamics
// -----------------------------------------------------------------------

/// Internal agent state, and also the per-step change a zone applies to it.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DriftState {
    energy: f64,
    load: f64,
    coherence: f64,
    curiosity: f64,
}

impl DriftState {
    const START: Self = Self {
        energy: 0.70,
        load: 0.20,
        coherence: 0.60,
        curiosity: 0.70,
    };

    const fn apply(&mut self, delta: Self) {
        self.energy = clamp01(self.energy + delta.energy);
        self.load = clamp01(self.load + delta.load);
        self.coherence = clamp01(self.coherence + delta.coherence);
        self.curiosity = clamp01(self.curiosity + delta.curiosity);
    }

    /// Stability falls as load rises against the agent's coherence.
    fn stability(&self) -> f64 {
        self.coherence * self.load.mul_add(-0.5, 1.0)
    }
}

/// How a zone acts on agents. Zones outside the default town drift like
/// open ground and score neutrally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZoneKind {
    Library,
    Park,
    Transition,
    Rest,
    Open,
}

impl ZoneKind {
    fn of(zone: &Zone) -> Self {
        match zone.as_str() {
            "Library" => Self::Library,
            "Park" => Self::Park,
            "Transition" => Self::Transition,
            "Rest" => Self::Rest,
            _ => Self::Open,
        }
    }

    const fn delta(self) -> DriftState {
        match self {
            Self::Library => DriftState {
                energy: -0.030,
                load: 0.020,
                coherence: 0.015,
                curiosity: 0.020,
            },
            Self::Park => DriftState {
                energy: 0.050,
                load: -0.020,
                coherence: 0.012,
                curiosity: -0.005,
            },
            Self::Transition => DriftState {
                energy: -0.010,
                load: -0.010,
                coherence: 0.006,
                curiosity: 0.002,
            },
            Self::Rest => DriftState {
                energy: 0.012,
                load: -0.018,
                coherence: 0.020,
                curiosity: -0.004,
            },
            Self::Open => DriftState {
                energy: -0.006,
                load: -0.004,
                coherence: 0.002,
                curiosity: 0.001,
            },
        }
    }

    /// How strongly an agent in state `s` is drawn to this zone.
    fn score(self, s: &DriftState) -> f64 {
        let tired = 1.0 - s.energy;
        let scattered = 1.0 - s.coherence;
        match self {
            Self::Library => s
                .curiosity
                .mul_add(1.10, s.coherence.mul_add(0.75, -s.load * 0.30)),
            Self::Park => tired.mul_add(1.25, s.load.mul_add(1.20, scattered * 0.15)),
            Self::Transition => scattered.mul_add(1.25, s.load * 0.35),
            Self::Rest => tired.mul_add(0.55, s.load.mul_add(0.85, scattered * 0.25)),
            Self::Open => 0.25,
        }
    }
}

const fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

// -----------------------------------------------------------------------
// Source
// -----------------------------------------------------------------------

#[derive(Debug, Clone)]
struct AgentDrift {
    state: DriftState,
    zone: usize,
    commit_left: u32,
}

/// Deterministic-per-seed synthetic signal generator.
#[derive(Debug)]
pub struct ZoneDriftSource {
    zones: Vec<(Zone, ZoneKind)>,
    agents: Vec<AgentDrift>,
    config: DriftConfig,
    rng: StdRng,
}

impl ZoneDriftSource {
    /// Build a source for `agent_count` agents over the catalogue's zones.
    ///
    /// Agents start in the first zone with the default internal state,
    /// nudged slightly per agent so they do not move in lockstep.
    pub fn new(
        catalogue: &ZoneCatalogue,
        agent_count: u32,
        seed: u64,
        config: DriftConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let zones: Vec<(Zone, ZoneKind)> = catalogue
            .iter()
            .map(|zone| (zone.clone(), ZoneKind::of(zone)))
            .collect();
        if zones.is_empty() {
            return Err(EngineError::Drift {
                message: "zone catalogue is empty".to_owned(),
            });
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let agents = (0..agent_count)
            .map(|_| {
                let mut state = DriftState::START;
                state.apply(DriftState {
                    energy: rng.random_range(-0.05..=0.05),
                    load: rng.random_range(-0.05..=0.05),
                    coherence: rng.random_range(-0.05..=0.05),
                    curiosity: rng.random_range(-0.05..=0.05),
                });
                AgentDrift {
                    state,
                    zone: 0,
                    commit_left: rng.random_range(config.commit_min..=config.commit_max),
                }
            })
            .collect();

        info!(
            seed,
            agents = agent_count,
            zones = zones.len(),
            base_speed = config.base_speed,
            "Zone drift source ready"
        );

        Ok(Self {
            zones,
            agents,
            config,
            rng,
        })
    }

    fn choose_zone(&mut self, current: usize, state: &DriftState) -> usize {
        let jitter = self.config.score_jitter;
        let mut best = current;
        let mut best_score = f64::NEG_INFINITY;
        let mut current_score = f64::NEG_INFINITY;
        for (index, (_, kind)) in self.zones.iter().enumerate() {
            let noise = if jitter > 0.0 {
                self.rng.random_range(-jitter..=jitter)
            } else {
                0.0
            };
            let score = kind.score(state) + noise;
            if index == current {
                current_score = score;
            }
            if score > best_score {
                best = index;
                best_score = score;
            }
        }
        if best_score - current_score < self.config.switch_margin {
            current
        } else {
            best
        }
    }

    fn step_agent(&mut self, index: usize, step: u64) -> Result<SignalReading, SourceError> {
        let mut agent = self
            .agents
            .get(index)
            .cloned()
            .ok_or_else(|| SourceError::Internal {
                message: format!("no drift state for agent index {index}"),
            })?;

        if agent.commit_left == 0 {
            let next = self.choose_zone(agent.zone, &agent.state);
            if next != agent.zone {
                debug!(step, agent = index, from = agent.zone, to = next, "zone switch");
            }
            agent.zone = next;
            agent.commit_left = self
                .rng
                .random_range(self.config.commit_min..=self.config.commit_max);
        }
        agent.commit_left = agent.commit_left.saturating_sub(1);

        let (zone, kind) = self
            .zones
            .get(agent.zone)
            .cloned()
            .ok_or_else(|| SourceError::Internal {
                message: format!("zone index {} out of range", agent.zone),
            })?;
        agent.state.apply(kind.delta());

        let noise = if self.config.stability_noise > 0.0 {
            let half = self.config.stability_noise;
            self.rng.random_range(-half..=half)
        } else {
            0.0
        };
        let stability = clamp01(agent.state.stability() + noise);
        let speed = if kind == ZoneKind::Rest {
            0.0
        } else {
            self.config.base_speed * agent.state.energy.mul_add(1.05, 0.35)
        };

        let reading = SignalReading {
            signals: SignalVector {
                energy: agent.state.energy,
                load: agent.state.load,
                curiosity: agent.state.curiosity,
                stability,
            },
            zone: Some(zone),
            speed: Some(speed),
        };

        if let Some(slot) = self.agents.get_mut(index) {
            *slot = agent;
        }
        Ok(reading)
    }
}

impl SignalSource for ZoneDriftSource {
    fn readings(
        &mut self,
        step: u64,
        agents: &[AgentId],
    ) -> Result<Vec<SignalReading>, SourceError> {
        if agents.len() != self.agents.len() {
            return Err(SourceError::AgentCount {
                expected: self.agents.len(),
                actual: agents.len(),
            });
        }
        (0..agents.len())
            .map(|index| self.step_agent(index, step))
            .collect()
    }
}
