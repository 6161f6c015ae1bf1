//! Scenario orchestration: builds the bus, model, source, and strategy from a
//! [`ScenarioConfig`] and runs the engine.

use thiserror::Error;
use tracing::info;

use crate::aging::AgingModel;
use crate::conditions::{
    BusOperationGenerator, TelemetryError, TelemetrySummary, load_telemetry_csv,
};
use crate::config::{ConfigError, ScenarioConfig, SourceKind};
use crate::sim::engine::{Engine, SimulationRun};
use crate::sim::kpi::RunSummary;
use crate::sim::types::SimError;

/// Anything that can stop a configured scenario from producing a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid scenario: {}", join(.0))]
    InvalidConfig(Vec<ConfigError>),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error(transparent)]
    Simulation(#[from] SimError),
}

fn join(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result of one scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub run: SimulationRun,
    pub summary: RunSummary,
    /// Name of the power strategy that drove the run.
    pub power_model: &'static str,
    /// Present when the run replayed telemetry.
    pub telemetry: Option<TelemetrySummary>,
}

/// Validates `config`, builds its components, and runs the engine once.
///
/// # Errors
///
/// Returns [`RunError::InvalidConfig`] with every validation failure,
/// [`RunError::Telemetry`] if the trace cannot be loaded, or
/// [`RunError::Simulation`] if the engine rejects its inputs.
pub fn run_scenario(config: &ScenarioConfig) -> Result<ScenarioOutcome, RunError> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(RunError::InvalidConfig(errors));
    }

    let s = &config.simulation;
    let bus = config.bus.to_bus();
    let model = AgingModel::new(config.aging.preset.parameters());
    let power = config.power_model().build();
    let mut engine = Engine::new(bus, model, config.engine_settings(), power);

    info!(
        source = %s.source,
        aging = %config.aging.preset,
        seed = s.seed,
        "running scenario"
    );

    let mut telemetry = None;
    let run = match s.source {
        SourceKind::Synthetic => {
            let generator_config = config
                .operation
                .generator_config(s.days * 24.0, s.time_step_hours);
            let mut generator = BusOperationGenerator::new(generator_config, s.seed);
            engine.run_source(&mut generator)?
        }
        SourceKind::Telemetry => {
            let Some(path) = config.telemetry.path.as_deref() else {
                return Err(RunError::InvalidConfig(vec![ConfigError {
                    field: "telemetry.path".into(),
                    message: "missing".into(),
                }]));
            };
            let conditions = load_telemetry_csv(path, config.telemetry.time_order())?;
            telemetry = TelemetrySummary::from_conditions(&conditions);
            engine.run(conditions)?
        }
        SourceKind::LabCyclic => engine.run(config.lab.cyclic_profile().conditions())?,
        SourceKind::LabCalendar => engine.run(config.lab.calendar_profile(s.days).conditions())?,
    };

    Ok(ScenarioOutcome {
        summary: RunSummary::from_run(&run),
        run,
        power_model: engine.power_name(),
        telemetry,
    })
}
