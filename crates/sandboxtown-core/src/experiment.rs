//! Contagion A/B experiments.
//!
//! An experiment pair runs the same population, seed, and step bound twice:
//! once with the contagion modulator off (control) and once with it on
//! (treatment). Because the core is deterministic, any difference between
//! the two record streams is caused by contagion alone.

use sandboxtown_agents::{ContagionConfig, FieldRule};

use crate::config::SimulationConfig;

/// An experiment pair for A/B testing contagion.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentPair {
    /// Contagion disabled (group A).
    pub control: SimulationConfig,
    /// Contagion enabled (group B).
    pub treatment: SimulationConfig,
}

/// Derive a control/treatment pair from a base configuration.
///
/// Both configs keep the base seed, agent count, step bound, thresholds,
/// and environment settings. The treatment enables contagion with the base
/// weight and field rule.
pub fn create_contagion_pair(base: &SimulationConfig) -> ExperimentPair {
    let mut control = base.clone();
    control.run.name = format!("{} (control)", base.run.name);
    control.contagion = ContagionConfig {
        enabled: false,
        ..base.contagion
    };

    let mut treatment = base.clone();
    treatment.run.name = format!("{} (treatment)", base.run.name);
    treatment.contagion = ContagionConfig {
        enabled: true,
        ..base.contagion
    };

    ExperimentPair { control, treatment }
}

/// Like [`create_contagion_pair`] with an explicit treatment weight and rule.
pub fn create_contagion_pair_with(
    base: &SimulationConfig,
    weight: f64,
    field: FieldRule,
) -> ExperimentPair {
    let mut pair = create_contagion_pair(base);
    pair.treatment.contagion.weight = weight;
    pair.treatment.contagion.field = field;
    pair
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.run.name = "test".to_owned();
        config.run.seed = 42;
        config.run.agent_count = 10;
        config.run.max_steps = 100;
        config
    }

    #[test]
    fn pair_toggles_contagion() {
        let pair = create_contagion_pair(&base());
        assert!(!pair.control.contagion.enabled);
        assert!(pair.treatment.contagion.enabled);
    }

    #[test]
    fn pair_shares_run_parameters() {
        let pair = create_contagion_pair(&base());
        assert_eq!(pair.control.run.seed, 42);
        assert_eq!(pair.treatment.run.seed, 42);
        assert_eq!(pair.control.run.agent_count, pair.treatment.run.agent_count);
        assert_eq!(pair.control.run.max_steps, pair.treatment.run.max_steps);
        assert_eq!(pair.control.thresholds, pair.treatment.thresholds);
    }

    #[test]
    fn pair_names_are_distinct() {
        let pair = create_contagion_pair(&base());
        assert_eq!(pair.control.run.name, "test (control)");
        assert_eq!(pair.treatment.run.name, "test (treatment)");
    }

    #[test]
    fn explicit_treatment_parameters() {
        let pair = create_contagion_pair_with(&base(), 0.6, FieldRule::MeanOfPeers);
        assert!((pair.treatment.contagion.weight - 0.6).abs() < f64::EPSILON);
        assert_eq!(pair.treatment.contagion.field, FieldRule::MeanOfPeers);
        assert!(pair.treatment.validate().is_ok());
    }
}
