//! Headless engine binary for the SandboxTown simulation.
//!
//! Wires the zone-drift signal source, the step pipeline, and the telemetry
//! sinks together. It loads configuration, applies command-line overrides,
//! runs one or more simulations, and writes records and summaries.
//!
//! # Startup Sequence
//!
//! 1. Parse the command line
//! 2. Load configuration from `sandboxtown-config.yaml`
//! 3. Initialize structured logging (tracing)
//! 4. Build the run plan (single arm, or control + treatment with `--ab`)
//! 5. For every arm and seed: run, write records, summarise
//! 6. With `--runs N > 1`, aggregate each arm into a batch summary
//! 7. With `--ab`, compare the first control and treatment runs

mod drift_source;
mod error;

use std::path::{Path, PathBuf};

use clap::Parser;
use sandboxtown_core::runner::log_simulation_end;
use sandboxtown_core::{SimulationConfig, SimulationState, create_contagion_pair, run_simulation};
use sandboxtown_telemetry::{
    JsonlSink, MemorySink, RunSummary, SinkCallback, aggregate_batch, compare_summaries,
    summarize, summary_path, transition_matrix, write_batch_json, write_comparison_json,
    write_summary_json,
};
use sandboxtown_types::RunId;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::drift_source::{DriftConfig, ZoneDriftSource, load_drift_config};
use crate::error::EngineError;

/// Command-line interface.
#[derive(Debug, Parser)]
#[command(
    name = "sandboxtown-engine",
    version,
    about = "Headless SandboxTown simulation runner"
)]
struct Cli {
    /// Path to the YAML configuration file. Defaults apply if it is missing.
    #[arg(short, long, default_value = "sandboxtown-config.yaml")]
    config: PathBuf,

    /// Override `run.max_steps`.
    #[arg(long)]
    steps: Option<u64>,

    /// Override `run.seed`.
    #[arg(long)]
    seed: Option<u64>,

    /// Override `run.agent_count`.
    #[arg(long)]
    agents: Option<u32>,

    /// Force contagion on.
    #[arg(long, conflicts_with = "no_contagion")]
    contagion: bool,

    /// Force contagion off.
    #[arg(long)]
    no_contagion: bool,

    /// Override `telemetry.output_dir`.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Run a contagion A/B pair (control and treatment) instead of one run.
    #[arg(long)]
    ab: bool,

    /// Number of consecutive seeds to run per arm, starting at the seed.
    #[arg(long, default_value_t = 1)]
    runs: u32,
}

impl Cli {
    fn apply(&self, config: &mut SimulationConfig) {
        if let Some(steps) = self.steps {
            config.run.max_steps = steps;
        }
        if let Some(seed) = self.seed {
            config.run.seed = seed;
        }
        if let Some(agents) = self.agents {
            config.run.agent_count = agents;
        }
        if self.contagion {
            config.contagion.enabled = true;
        }
        if self.no_contagion {
            config.contagion.enabled = false;
        }
        if let Some(ref out) = self.out {
            config.telemetry.output_dir.clone_from(out);
        }
    }
}

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, a run, or telemetry output fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Parse the command line.
    let cli = Cli::parse();

    // 2. Load configuration.
    let mut config = load_config(&cli.config)?;
    cli.apply(&mut config);
    config.validate()?;
    let drift = load_drift_config(&cli.config)?;

    // 3. Initialize structured logging.
    init_tracing(&config);
    if !cli.config.exists() {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
    }
    info!(
        run_name = config.run.name,
        seed = config.run.seed,
        max_steps = config.run.max_steps,
        agent_count = config.run.agent_count,
        contagion = config.contagion.enabled,
        output_dir = %config.telemetry.output_dir.display(),
        "Configuration loaded"
    );

    // 4. Build the run plan.
    let output_dir = config.telemetry.output_dir.clone();
    let arms: Vec<(&str, SimulationConfig)> = if cli.ab {
        let pair = create_contagion_pair(&config);
        vec![("control", pair.control), ("treatment", pair.treatment)]
    } else {
        vec![("run", config)]
    };
    let runs = cli.runs.max(1);

    // 5-6. Execute.
    let mut first_runs = Vec::with_capacity(arms.len());
    for (arm, arm_config) in &arms {
        let mut summaries = Vec::new();
        for offset in 0..runs {
            let mut seeded = arm_config.clone();
            seeded.run.seed = arm_config.run.seed.saturating_add(u64::from(offset));
            let summary = execute_run(&seeded, &drift)?;
            log_summary(arm, &summary);
            summaries.push(summary);
        }

        if let Some(first) = summaries.first() {
            first_runs.push(first.clone());
        }

        if summaries.len() > 1 {
            let batch = aggregate_batch(&summaries)?;
            let path = arm_config
                .telemetry
                .output_dir
                .join(format!("{arm}.batch.summary.json"));
            write_batch_json(&batch, &path)?;
            for agent in &batch.agents {
                info!(
                    arm,
                    agent = %agent.agent_id,
                    runs = agent.runs,
                    mean_transitions = agent.mean_transitions,
                    mean_pause_ratio = agent.mean_pause_ratio,
                    mean_avg_speed = agent.mean_avg_speed,
                    "Batch agent summary"
                );
            }
        }
    }

    // 7. Compare the A/B arms.
    if let [control, treatment] = first_runs.as_slice() {
        let comparison = compare_summaries(control, treatment);
        write_comparison_json(&comparison, &output_dir.join("ab.compare.json"))?;
        for agent in &comparison.agents {
            info!(
                agent = %agent.agent_id,
                transitions_delta = agent.transitions.delta,
                transitions_pct = agent.transitions.pct_delta,
                pause_ratio_delta = agent.pause_ratio.delta,
                avg_speed_delta = agent.avg_speed.delta,
                "A/B agent delta"
            );
        }
    }

    info!("sandboxtown-engine shutdown complete");
    Ok(())
}

/// Load the simulation configuration, falling back to defaults when the
/// file does not exist. Environment overrides apply either way.
fn load_config(path: &Path) -> Result<SimulationConfig, EngineError> {
    if path.exists() {
        Ok(SimulationConfig::from_file(path)?)
    } else {
        let mut config = SimulationConfig::default();
        config.telemetry.apply_env_overrides();
        Ok(config)
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins; otherwise `logging.level` from the config applies.
fn init_tracing(config: &SimulationConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Run one seeded simulation end to end and return its summary.
fn execute_run(config: &SimulationConfig, drift: &DriftConfig) -> Result<RunSummary, EngineError> {
    let run_id = RunId::new();
    let telemetry = &config.telemetry;
    let catalogue = config.zone_catalogue()?;

    let mut state = SimulationState::from_config(run_id, config)?;
    let mut source =
        ZoneDriftSource::new(&catalogue, config.run.agent_count, config.run.seed, drift.clone())?;

    let records_file = if telemetry.write_records {
        Some(JsonlSink::create(&telemetry.output_dir, run_id)?)
    } else {
        None
    };
    let mut callback = SinkCallback::new((MemorySink::new(), records_file));

    info!(run_id = %run_id, name = config.run.name, seed = config.run.seed, "Run starting");
    let result = run_simulation(&mut state, &mut source, config.run.max_steps, &mut callback)?;
    log_simulation_end(&result);

    if callback.failures() > 0 {
        warn!(
            run_id = %run_id,
            failures = callback.failures(),
            "Some records were not written"
        );
    }
    let (memory, records_file) = callback.finish()?;
    if let Some(file) = records_file {
        info!(path = %file.path().display(), lines = file.lines(), "Records written");
    }

    let records = memory.into_records();
    let summary = summarize(run_id, &records, telemetry.pause_speed_threshold)?;

    let matrix = transition_matrix(&records);
    for agent_id in matrix.agents() {
        for cell in matrix.ranked(agent_id) {
            debug!(
                agent = %agent_id,
                from = %cell.from,
                to = %cell.to,
                count = cell.count,
                "zone transition"
            );
        }
    }

    if telemetry.write_summary {
        write_summary_json(&summary, &summary_path(&telemetry.output_dir, run_id))?;
    }
    Ok(summary)
}

/// Log the per-agent lines of a run summary.
fn log_summary(arm: &str, summary: &RunSummary) {
    info!(
        arm,
        run_id = %summary.run_id,
        steps = summary.steps,
        final_density = ?summary.final_density,
        env_downshifts = summary.env_downshifts,
        "Run summary"
    );
    for agent in &summary.agents {
        info!(
            arm,
            agent = %agent.agent_id,
            rows = agent.rows,
            transitions = agent.transitions,
            status_transitions = agent.status_transitions,
            zone_transitions = agent.zone_transitions,
            pause_ratio = agent.pause_ratio,
            avg_speed = agent.avg_speed,
            std_speed = agent.std_speed,
            final_status = %agent.final_status,
            "Agent summary"
        );
    }
}
