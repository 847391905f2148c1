//! Step clock, configuration, and orchestration for the SandboxTown simulation.
//!
//! This crate owns the per-step pipeline that drives the simulation:
//! Read, Field, Evaluate, Commit, Environment, and Emit.
//!
//! # Modules
//!
//! - [`clock`] -- Step counter with checked advance.
//! - [`config`] -- Configuration loading from `sandboxtown-config.yaml` into
//!   strongly-typed structs.
//! - [`experiment`] -- Contagion A/B experiment pairs.
//! - [`runner`] -- Bounded run loop, step callbacks, end reasons.
//! - [`signal_source`] -- [`SignalSource`] trait and [`ScriptedSignalSource`].
//! - [`step`] -- The per-step pipeline.
//!
//! [`SignalSource`]: signal_source::SignalSource
//! [`ScriptedSignalSource`]: signal_source::ScriptedSignalSource

pub mod clock;
pub mod config;
pub mod experiment;
pub mod runner;
pub mod signal_source;
pub mod step;

pub use config::{ConfigError, SimulationConfig};
pub use experiment::{ExperimentPair, create_contagion_pair};
pub use runner::{
    EndReason, NoOpCallback, RecordCollector, RunnerError, SimulationResult, StepCallback,
    run_simulation,
};
pub use signal_source::{ScriptedSignalSource, SignalSource, SourceError};
pub use step::{SimulationState, StepError, StepSummary, run_step};
