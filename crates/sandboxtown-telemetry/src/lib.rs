//! Telemetry for the SandboxTown simulation.
//!
//! Every step emits one [`StepRecord`](sandboxtown_types::StepRecord) per
//! agent. This crate writes those records out and folds them into run and
//! batch summaries. It is strictly downstream of the simulation.
//!
//! # Data flow
//!
//! ```text
//! run_simulation
//!     |
//!     +-- SinkCallback --> TelemetrySink
//!     |                      |-- MemorySink  (in-process)
//!     |                      +-- JsonlSink   (<run_id>.jsonl)
//!     |
//!     +-- records -------> summarize          (<run_id>.summary.json)
//!                          transition_matrix
//!                          aggregate_batch    (many runs)
//!                          compare_summaries  (control vs treatment)
//! ```
//!
//! # Modules
//!
//! - [`sink`] -- Sink trait, in-memory and JSON Lines sinks, run-loop adapter
//! - [`summary`] -- Per-run, per-agent metrics
//! - [`matrix`] -- Zone transition counts
//! - [`batch`] -- Cross-run means
//! - [`compare`] -- Per-agent deltas between two runs
//! - [`error`] -- Shared error types

pub mod batch;
pub mod compare;
pub mod error;
pub mod matrix;
pub mod sink;
pub mod summary;

// Re-export primary types for convenience.
pub use batch::{BatchAgentSummary, BatchSummary, aggregate_batch, write_batch_json};
pub use compare::{
    AgentComparison, MetricDelta, SummaryComparison, compare_summaries, write_comparison_json,
};
pub use error::TelemetryError;
pub use matrix::{TransitionMatrix, ZoneTransition, transition_matrix};
pub use sink::{
    JsonlSink, MemorySink, SinkCallback, TelemetrySink, read_jsonl, records_path,
};
pub use summary::{
    AgentSummary, DEFAULT_PAUSE_SPEED_THRESHOLD, RunSummary, read_summary_json, summarize,
    summary_path, write_summary_json,
};
