//! Telemetry sinks.
//!
//! A [`TelemetrySink`] receives every [`StepRecord`] the run emits. Sinks
//! are write-only: nothing they do can reach back into the simulation, and
//! a failing sink never aborts a run. [`SinkCallback`] adapts any sink to
//! the core's [`StepCallback`] so it can be handed to the run loop.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use sandboxtown_core::{SimulationState, StepCallback, StepSummary};
use sandboxtown_types::{RunId, StepRecord};
use tracing::{debug, warn};

use crate::error::TelemetryError;

/// A destination for emitted step records.
pub trait TelemetrySink {
    /// Accept one record.
    fn record(&mut self, record: &StepRecord) -> Result<(), TelemetryError>;

    /// Push any buffered output to its destination.
    fn flush(&mut self) -> Result<(), TelemetryError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory sink
// ---------------------------------------------------------------------------

/// Keeps every record in memory, in emission order.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Vec<StepRecord>,
}

impl MemorySink {
    /// Create an empty sink.
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Records received so far.
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Consume the sink and return its records.
    pub fn into_records(self) -> Vec<StepRecord> {
        self.records
    }
}

impl TelemetrySink for MemorySink {
    fn record(&mut self, record: &StepRecord) -> Result<(), TelemetryError> {
        self.records.push(record.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON Lines sink
// ---------------------------------------------------------------------------

/// Writes one JSON object per line to `<output_dir>/<run_id>.jsonl`.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    writer: BufWriter<File>,
    lines: u64,
}

impl JsonlSink {
    /// Create the output directory if needed and open a fresh record file
    /// for the given run. An existing file for the same run is truncated.
    pub fn create(output_dir: &Path, run_id: RunId) -> Result<Self, TelemetryError> {
        fs::create_dir_all(output_dir)?;
        let path = records_path(output_dir, run_id);
        let file = File::create(&path)?;
        debug!(path = %path.display(), "Opened record file");
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            lines: 0,
        })
    }

    /// Path of the file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records written so far.
    pub const fn lines(&self) -> u64 {
        self.lines
    }
}

impl TelemetrySink for JsonlSink {
    fn record(&mut self, record: &StepRecord) -> Result<(), TelemetryError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.lines = self.lines.saturating_add(1);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TelemetryError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Path of the record file for a run inside `output_dir`.
pub fn records_path(output_dir: &Path, run_id: RunId) -> PathBuf {
    output_dir.join(format!("{run_id}.jsonl"))
}

/// Read back a JSON Lines record file. Blank lines are skipped.
pub fn read_jsonl(path: &Path) -> Result<Vec<StepRecord>, TelemetryError> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| TelemetryError::MalformedLine {
            path: path.to_path_buf(),
            line: index.saturating_add(1),
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Combinators
// ---------------------------------------------------------------------------

/// Fan out to two sinks. Both always receive the record; the first error
/// is reported.
impl<A: TelemetrySink, B: TelemetrySink> TelemetrySink for (A, B) {
    fn record(&mut self, record: &StepRecord) -> Result<(), TelemetryError> {
        let first = self.0.record(record);
        let second = self.1.record(record);
        first.and(second)
    }

    fn flush(&mut self) -> Result<(), TelemetryError> {
        let first = self.0.flush();
        let second = self.1.flush();
        first.and(second)
    }
}

/// An absent sink discards everything.
impl<S: TelemetrySink> TelemetrySink for Option<S> {
    fn record(&mut self, record: &StepRecord) -> Result<(), TelemetryError> {
        match self {
            Some(sink) => sink.record(record),
            None => Ok(()),
        }
    }

    fn flush(&mut self) -> Result<(), TelemetryError> {
        match self {
            Some(sink) => sink.flush(),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Run-loop adapter
// ---------------------------------------------------------------------------

/// Step callback that forwards every record of every step to a sink.
///
/// Rejected records are logged and counted, never propagated.
#[derive(Debug)]
pub struct SinkCallback<S> {
    sink: S,
    failures: u64,
}

impl<S: TelemetrySink> SinkCallback<S> {
    /// Wrap a sink.
    pub const fn new(sink: S) -> Self {
        Self { sink, failures: 0 }
    }

    /// Number of records the sink rejected.
    pub const fn failures(&self) -> u64 {
        self.failures
    }

    /// Borrow the wrapped sink.
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Flush the sink and hand it back.
    pub fn finish(mut self) -> Result<S, TelemetryError> {
        self.sink.flush()?;
        Ok(self.sink)
    }
}

impl<S: TelemetrySink> StepCallback for SinkCallback<S> {
    fn on_step(&mut self, summary: &StepSummary, _state: &SimulationState) {
        for record in &summary.records {
            if let Err(err) = self.sink.record(record) {
                self.failures = self.failures.saturating_add(1);
                warn!(
                    step = record.step,
                    agent_id = %record.agent_id,
                    error = %err,
                    "Telemetry sink rejected record"
                );
            }
        }
    }
}
