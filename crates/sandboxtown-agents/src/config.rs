//! Threshold configuration for the status machine.
//!
//! The [`Thresholds`] struct bundles every tunable boundary of the
//! hysteresis band so that callers (step pipeline, tests) can override the
//! defaults. It mirrors the `thresholds` section of `sandboxtown-config.yaml`.

use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Default stability below which an agent enters `HelpSeeking`.
pub const DEFAULT_HELP_ENTER: f64 = 0.60;

/// Default stability at or above which an agent leaves `HelpSeeking`.
pub const DEFAULT_HELP_EXIT: f64 = 0.65;

/// Default stability below which an agent enters `Rest`.
pub const DEFAULT_REST_ENTER: f64 = 0.30;

/// Default stability at or above which an agent leaves `Rest`.
pub const DEFAULT_REST_EXIT: f64 = 0.40;

/// Default minimum stability for `Visual` mode.
pub const DEFAULT_VISUAL_MIN_STABLE: f64 = 0.75;

/// Asymmetric enter/exit thresholds of the status machine.
///
/// Entry comparisons are strict (`input < enter`), exit comparisons are
/// inclusive (`input >= exit`). The gap between the two is the hysteresis
/// band in which the current status holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Enter `HelpSeeking` below this value (default: 0.60).
    pub help_enter: f64,

    /// Leave `HelpSeeking` at or above this value (default: 0.65).
    pub help_exit: f64,

    /// Enter `Rest` below this value (default: 0.30).
    pub rest_enter: f64,

    /// Leave `Rest` at or above this value (default: 0.40).
    pub rest_exit: f64,

    /// Minimum stability for an agent to stay in `Visual` mode (default: 0.75).
    pub visual_min_stable: f64,

    /// When false the help band is skipped entirely: agents only move
    /// between `Stable` and `Rest` (default: true).
    pub help_enabled: bool,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            help_enter: DEFAULT_HELP_ENTER,
            help_exit: DEFAULT_HELP_EXIT,
            rest_enter: DEFAULT_REST_ENTER,
            rest_exit: DEFAULT_REST_EXIT,
            visual_min_stable: DEFAULT_VISUAL_MIN_STABLE,
            help_enabled: true,
        }
    }
}

impl Thresholds {
    /// Check that the thresholds describe a well-formed hysteresis band.
    ///
    /// All values must lie in `[0, 1]`, each exit must be strictly above its
    /// entry, and rest entry may not exceed help entry (rest is the more
    /// severe state).
    pub fn validate(&self) -> Result<(), AgentError> {
        let named = [
            ("help_enter", self.help_enter),
            ("help_exit", self.help_exit),
            ("rest_enter", self.rest_enter),
            ("rest_exit", self.rest_exit),
            ("visual_min_stable", self.visual_min_stable),
        ];
        for (name, value) in named {
            if !(0.0..=1.0).contains(&value) {
                return Err(AgentError::Config {
                    reason: format!("threshold {name} must be within [0, 1], got {value}"),
                });
            }
        }

        if self.rest_enter >= self.rest_exit {
            return Err(AgentError::Config {
                reason: format!(
                    "rest_enter ({}) must be below rest_exit ({})",
                    self.rest_enter, self.rest_exit
                ),
            });
        }

        if self.help_enabled {
            if self.help_enter >= self.help_exit {
                return Err(AgentError::Config {
                    reason: format!(
                        "help_enter ({}) must be below help_exit ({})",
                        self.help_enter, self.help_exit
                    ),
                });
            }
            if self.rest_enter > self.help_enter {
                return Err(AgentError::Config {
                    reason: format!(
                        "rest_enter ({}) may not exceed help_enter ({})",
                        self.rest_enter, self.help_enter
                    ),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds() {
        let th = Thresholds::default();
        assert!((th.help_enter - 0.60).abs() < f64::EPSILON);
        assert!((th.help_exit - 0.65).abs() < f64::EPSILON);
        assert!((th.rest_enter - 0.30).abs() < f64::EPSILON);
        assert!((th.rest_exit - 0.40).abs() < f64::EPSILON);
        assert!(th.help_enabled);
        assert!(th.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_value() {
        let th = Thresholds {
            rest_exit: 1.2,
            ..Thresholds::default()
        };
        assert!(matches!(th.validate(), Err(AgentError::Config { .. })));
    }

    #[test]
    fn rejects_inverted_help_band() {
        let th = Thresholds {
            help_enter: 0.70,
            help_exit: 0.65,
            ..Thresholds::default()
        };
        assert!(th.validate().is_err());
    }

    #[test]
    fn rejects_inverted_rest_band() {
        let th = Thresholds {
            rest_enter: 0.40,
            rest_exit: 0.40,
            ..Thresholds::default()
        };
        assert!(th.validate().is_err());
    }

    #[test]
    fn rejects_rest_entry_above_help_entry() {
        let th = Thresholds {
            help_enter: 0.25,
            help_exit: 0.35,
            ..Thresholds::default()
        };
        assert!(th.validate().is_err());
    }

    #[test]
    fn help_band_ignored_when_disabled() {
        let th = Thresholds {
            help_enter: 0.9,
            help_exit: 0.1,
            help_enabled: false,
            ..Thresholds::default()
        };
        assert!(th.validate().is_ok());
    }

    #[test]
    fn partial_yaml_style_input_uses_defaults() {
        let th: Thresholds =
            serde_json::from_str(r#"{"help_exit": 0.7}"#).unwrap_or_default();
        assert!((th.help_exit - 0.7).abs() < f64::EPSILON);
        assert!((th.help_enter - DEFAULT_HELP_ENTER).abs() < f64::EPSILON);
    }
}
