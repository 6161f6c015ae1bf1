//! Aging simulator entry point: CLI wiring and config-driven scenario runs.

mod cli;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{error, info};

use ebus_aging_sim::config::ScenarioConfig;
use ebus_aging_sim::io::export::{export_evaluations_csv, export_history_csv, export_sweep_csv};
use ebus_aging_sim::runner::run_scenario;
use ebus_aging_sim::validation::{SweepConfig, run_lab_sweep};

use crate::cli::Args;

fn load_scenario(args: &Args) -> anyhow::Result<ScenarioConfig> {
    let mut scenario = match (&args.scenario, &args.preset) {
        (Some(path), _) => ScenarioConfig::from_toml_file(path)?,
        (None, Some(name)) => ScenarioConfig::from_preset(name)?,
        (None, None) => ScenarioConfig::baseline(),
    };
    if let Some(seed) = args.seed {
        scenario.simulation.seed = seed;
    }
    if let Some(days) = args.days {
        scenario.simulation.days = days;
    }
    Ok(scenario)
}

fn lab_sweep(args: &Args, path: &std::path::Path) -> anyhow::Result<()> {
    let mut sweep = SweepConfig::default();
    if let Some(days) = args.days {
        sweep.calendar_days = days;
    }
    let rows = run_lab_sweep(&sweep)?;
    for row in &rows {
        println!("{row}");
    }
    export_sweep_csv(&rows, path)
        .with_context(|| format!("failed to write sweep CSV to {}", path.display()))?;
    info!(path = %path.display(), rows = rows.len(), "lab sweep written");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .without_time()
        .compact()
        .with_max_level(args.log_level())
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = &args.lab_sweep {
        return lab_sweep(&args, path);
    }

    let scenario = load_scenario(&args)?;
    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("{e}");
        }
        bail!("scenario has {} invalid field(s)", errors.len());
    }

    let outcome = run_scenario(&scenario)?;
    if let Some(telemetry) = &outcome.telemetry {
        println!("{telemetry}\n");
    }
    println!("{}", outcome.summary);

    if let Some(path) = &args.history_out {
        export_history_csv(
            outcome.run.history(),
            scenario.simulation.save_interval_hours,
            path,
        )
        .with_context(|| format!("failed to write history CSV to {}", path.display()))?;
        info!(path = %path.display(), "history written");
    }
    if let Some(path) = &args.evaluations_out {
        export_evaluations_csv(outcome.run.evaluations(), path)
            .with_context(|| format!("failed to write evaluations CSV to {}", path.display()))?;
        info!(path = %path.display(), "evaluations written");
    }

    Ok(())
}
