//! Contagion modulator.
//!
//! Optionally blends an agent's raw stability input with a population
//! field before the status evaluator sees it:
//!
//! ```text
//! modulated = clamp01(raw * (1 - w) + field * w)
//! ```
//!
//! The modulator only ever changes evaluator *inputs*. It never reads or
//! writes a status, and a disabled modulator is the identity function.

use serde::{Deserialize, Serialize};

use sandboxtown_types::{SIGNAL_MAX, SIGNAL_MIN, in_signal_domain};

use crate::error::AgentError;

/// How the population field is derived from a step's raw stability values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRule {
    /// Arithmetic mean over every agent, including the target.
    #[default]
    Mean,
    /// Arithmetic mean over every agent except the target.
    MeanOfPeers,
}

/// Contagion parameters. Immutable for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContagionConfig {
    /// When false the modulator returns its input unchanged.
    pub enabled: bool,
    /// Blend weight of the population field, in `[0, 1]`.
    pub weight: f64,
    /// Field derivation rule.
    pub field: FieldRule,
}

impl Default for ContagionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            weight: 0.25,
            field: FieldRule::Mean,
        }
    }
}

impl ContagionConfig {
    /// Build a validated config.
    pub fn new(enabled: bool, weight: f64, field: FieldRule) -> Result<Self, AgentError> {
        let config = Self {
            enabled,
            weight,
            field,
        };
        config.validate()?;
        Ok(config)
    }

    /// A disabled config (identity modulator).
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Fail with [`AgentError::Config`] if the weight is outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), AgentError> {
        if in_signal_domain(self.weight) {
            Ok(())
        } else {
            Err(AgentError::Config {
                reason: format!("contagion weight must be within [0, 1], got {}", self.weight),
            })
        }
    }
}

/// Modulate one agent's stability input with the population field.
///
/// Disabled configs return `signal` unchanged without looking at the
/// weight. Enabled configs reject weights outside `[0, 1]` and clamp the
/// blend to the signal domain; a result that is still out of range after
/// clamping (NaN input) is an [`AgentError::InternalInvariant`].
pub fn apply_contagion(
    signal: f64,
    field: f64,
    config: &ContagionConfig,
) -> Result<f64, AgentError> {
    if !config.enabled {
        return Ok(signal);
    }
    config.validate()?;

    let w = config.weight;
    let blended = signal.mul_add(1.0 - w, field * w);
    let clamped = blended.clamp(SIGNAL_MIN, SIGNAL_MAX);

    if in_signal_domain(clamped) {
        Ok(clamped)
    } else {
        Err(AgentError::InternalInvariant {
            context: format!(
                "contagion result {clamped} outside [0, 1] (signal {signal}, field {field}, weight {w})"
            ),
        })
    }
}

/// Population field for the agent at `target` given every agent's raw
/// stability for the current step.
///
/// `raw` is the frozen snapshot, one value per agent in roster order. An
/// empty population (or a peer set with nobody else in it) yields the
/// target's own raw value, which makes the blend a no-op for that agent.
pub fn population_field(raw: &[f64], rule: FieldRule, target: usize) -> f64 {
    let own = raw.get(target).copied();

    let (sum, count) = raw
        .iter()
        .enumerate()
        .filter(|&(index, _)| rule == FieldRule::Mean || index != target)
        .fold((0.0_f64, 0_u32), |(sum, count), (_, &value)| {
            (sum + value, count.saturating_add(1))
        });

    if count == 0 {
        return own.unwrap_or(SIGNAL_MAX);
    }
    sum / f64::from(count)
}
