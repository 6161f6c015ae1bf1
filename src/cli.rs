use std::path::PathBuf;

use clap::{ArgAction, Parser};
use tracing::Level;

/// Electric-bus traction battery aging simulator.
///
/// Runs one scenario (a TOML file or a built-in preset) and prints its aging
/// summary. With `--lab-sweep` it runs the lab validation matrices instead.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Scenario TOML file.
    #[clap(long, value_name = "PATH", conflicts_with = "preset")]
    pub scenario: Option<PathBuf>,

    /// Built-in preset (baseline, hot_climate, telemetry, lab_cyclic, lab_calendar).
    #[clap(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Override the scenario's random seed.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Override the simulated duration in days.
    #[clap(long)]
    pub days: Option<f64>,

    /// Write the down-sampled state history to this CSV file.
    #[clap(long, value_name = "PATH")]
    pub history_out: Option<PathBuf>,

    /// Write every aging evaluation to this CSV file.
    #[clap(long, value_name = "PATH")]
    pub evaluations_out: Option<PathBuf>,

    /// Run the lab validation sweep and write its rows to this CSV file.
    #[clap(long, value_name = "PATH", conflicts_with_all = ["scenario", "preset"])]
    pub lab_sweep: Option<PathBuf>,

    /// More logging (-v debug, -vv trace).
    #[clap(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[clap(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Maximum tracing level for the selected verbosity.
    pub fn log_level(&self) -> Level {
        if self.quiet {
            return Level::WARN;
        }
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}
