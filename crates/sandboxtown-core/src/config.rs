//! Configuration loading and typed config structures for SandboxTown.
//!
//! The canonical configuration lives in `sandboxtown-config.yaml` at the
//! project root. Every section is optional; missing fields fall back to the
//! defaults below.
//!
//! ```yaml
//! run:
//!   name: "baseline"
//!   seed: 7
//!   max_steps: 1800
//!   agent_count: 3
//!   zones: [Library, Park, Transition, Rest]
//!   start_mode: headless
//! thresholds:
//!   help_enter: 0.60
//!   help_exit: 0.65
//! contagion:
//!   enabled: true
//!   weight: 0.25
//!   field: mean_of_peers
//! environment:
//!   start_density: dense
//!   upshift_when_all_stable: false
//! telemetry:
//!   output_dir: "runs"
//! logging:
//!   level: "info"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use sandboxtown_agents::{AgentError, ContagionConfig, Thresholds};
use sandboxtown_types::{Density, RunMode};
use sandboxtown_world::{EnvironmentPolicy, WorldError, ZoneCatalogue};

/// Environment variable overriding `telemetry.output_dir`.
pub const OUTPUT_DIR_ENV: &str = "SANDBOXTOWN_OUTPUT_DIR";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// Thresholds or contagion parameters are invalid.
    #[error("invalid agent configuration: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },

    /// The zone list is invalid.
    #[error("invalid zone configuration: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// Any other invalid value.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `sandboxtown-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Run-level settings (name, seed, bounds, population).
    #[serde(default)]
    pub run: RunConfig,

    /// Hysteresis thresholds.
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Contagion modulator parameters.
    #[serde(default)]
    pub contagion: ContagionConfig,

    /// Environment controller settings.
    #[serde(default)]
    pub environment: EnvironmentConfig,

    /// Telemetry output settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `SANDBOXTOWN_OUTPUT_DIR` overrides `telemetry.output_dir` when set.
    /// The result is validated before it is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or a
    /// validation error.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.telemetry.apply_env_overrides();
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// Environment overrides are not applied here; see [`Self::from_file`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or a
    /// validation error.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every section.
    ///
    /// Contagion parameters are only checked when contagion is enabled: a
    /// disabled modulator never reads its weight.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run.agent_count == 0 {
            return Err(ConfigError::Invalid {
                reason: "run.agent_count must be at least 1".to_owned(),
            });
        }
        self.thresholds.validate()?;
        if self.contagion.enabled {
            self.contagion.validate()?;
        }
        self.zone_catalogue()?;

        let pause = self.telemetry.pause_speed_threshold;
        if !pause.is_finite() || pause < 0.0 {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "telemetry.pause_speed_threshold must be a non-negative number, got {pause}"
                ),
            });
        }
        Ok(())
    }

    /// The validated zone catalogue for this run.
    pub fn zone_catalogue(&self) -> Result<ZoneCatalogue, WorldError> {
        ZoneCatalogue::new(self.run.zones.iter().map(String::as_str))
    }

    /// Environment policy switches.
    pub const fn environment_policy(&self) -> EnvironmentPolicy {
        EnvironmentPolicy {
            upshift_when_all_stable: self.environment.upshift_when_all_stable,
        }
    }
}

/// Run-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Human-readable run name.
    #[serde(default = "default_run_name")]
    pub name: String,

    /// Seed for external signal generators. The core never reads it.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of steps to execute.
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,

    /// Population size.
    #[serde(default = "default_agent_count")]
    pub agent_count: u32,

    /// Zone names, in display order.
    #[serde(default = "default_zones")]
    pub zones: Vec<String>,

    /// Presentation mode every agent starts in. The mode gate can only
    /// demote it.
    #[serde(default)]
    pub start_mode: RunMode,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            name: default_run_name(),
            seed: default_seed(),
            max_steps: default_max_steps(),
            agent_count: default_agent_count(),
            zones: default_zones(),
            start_mode: RunMode::Headless,
        }
    }
}

/// Environment controller configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EnvironmentConfig {
    /// Density at step 0.
    #[serde(default)]
    pub start_density: Density,

    /// Enable the `Calm -> Dense` upshift when every agent is stable.
    #[serde(default)]
    pub upshift_when_all_stable: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            start_density: Density::Dense,
            upshift_when_all_stable: false,
        }
    }
}

/// Telemetry output configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TelemetryConfig {
    /// Directory receiving record streams and summaries.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Speed below which a step counts as paused.
    #[serde(default = "default_pause_speed_threshold")]
    pub pause_speed_threshold: f64,

    /// Write the per-step record stream (`<run_id>.jsonl`).
    #[serde(default = "default_true")]
    pub write_records: bool,

    /// Write the aggregated run summary (`<run_id>.summary.json`).
    #[serde(default = "default_true")]
    pub write_summary: bool,
}

impl TelemetryConfig {
    /// Override the output directory from `SANDBOXTOWN_OUTPUT_DIR` when set.
    pub fn apply_env_overrides(&mut self) {
        self.override_output_dir(std::env::var(OUTPUT_DIR_ENV).ok());
    }

    /// Replace the output directory when `value` is set and non-empty.
    pub fn override_output_dir(&mut self, value: Option<String>) {
        if let Some(val) = value.filter(|v| !v.trim().is_empty()) {
            self.output_dir = PathBuf::from(val);
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            pause_speed_threshold: default_pause_speed_threshold(),
            write_records: true,
            write_summary: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_run_name() -> String {
    "sandboxtown".to_owned()
}

const fn default_seed() -> u64 {
    7
}

const fn default_max_steps() -> u64 {
    1800
}

const fn default_agent_count() -> u32 {
    3
}

fn default_zones() -> Vec<String> {
    sandboxtown_world::DEFAULT_ZONES
        .iter()
        .map(|&zone| zone.to_owned())
        .collect()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("runs")
}

const fn default_pause_speed_threshold() -> f64 {
    2.0
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
