//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::aging::AgingPreset;
use crate::battery::Bus;
use crate::conditions::generator::MAX_SAMPLES;
use crate::conditions::{CalendarProfile, CyclicProfile, GeneratorConfig, TimeOrder};
use crate::sim::power_source::{FixedCRate, NetPowerBalance, PowerModel, ProtocolTarget};
use crate::sim::types::{EngineSettings, SocWindow};
use crate::sim::window::DodMethod;

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run length, condition source, and engine cadence.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Vehicle and pack parameters.
    #[serde(default)]
    pub bus: BusConfig,
    /// Aging coefficient set.
    #[serde(default)]
    pub aging: AgingConfig,
    /// Synthetic operation parameters (`source = "synthetic"`).
    #[serde(default)]
    pub operation: OperationConfig,
    /// Recorded telemetry (`source = "telemetry"`).
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Lab protocol parameters (`source = "lab-cyclic"` / `"lab-calendar"`).
    #[serde(default)]
    pub lab: LabConfig,
}

/// Where operating conditions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Seeded synthetic trolleybus operation with SoC feedback.
    #[default]
    Synthetic,
    /// Recorded telemetry CSV.
    Telemetry,
    /// Cyclic lab-test protocol.
    LabCyclic,
    /// Calendar (storage) lab-test protocol.
    LabCalendar,
}

impl SourceKind {
    /// Power strategy used when none is configured explicitly.
    pub fn default_power_model(self) -> PowerModelKind {
        match self {
            Self::Synthetic => PowerModelKind::FixedCRate,
            Self::Telemetry => PowerModelKind::NetPowerBalance,
            Self::LabCyclic | Self::LabCalendar => PowerModelKind::ProtocolTarget,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Synthetic => "synthetic",
            Self::Telemetry => "telemetry",
            Self::LabCyclic => "lab-cyclic",
            Self::LabCalendar => "lab-calendar",
        })
    }
}

/// Config-level name of a fast-loop power strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerModelKind {
    FixedCRate,
    NetPowerBalance,
    ProtocolTarget,
}

impl PowerModelKind {
    pub fn build(self) -> PowerModel {
        match self {
            Self::FixedCRate => PowerModel::FixedCRate(FixedCRate),
            Self::NetPowerBalance => PowerModel::NetPowerBalance(NetPowerBalance),
            Self::ProtocolTarget => PowerModel::ProtocolTarget(ProtocolTarget),
        }
    }
}

/// Run length, condition source, and engine cadence.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Condition source.
    pub source: SourceKind,
    /// Power strategy; derived from `source` when omitted.
    pub power_model: Option<PowerModelKind>,
    /// Simulated days for the synthetic and lab-calendar sources.
    pub days: f64,
    /// Synthetic sample spacing (hours).
    pub time_step_hours: f64,
    /// Master random seed.
    pub seed: u64,
    /// Aging is re-evaluated every this many samples.
    pub evaluation_interval: usize,
    /// Trailing SoC window length (samples).
    pub averaging_window: usize,
    /// Depth-of-discharge extraction policy.
    pub dod_method: DodMethod,
    /// Upper bound on lifetime capacity loss (fraction of nominal).
    pub loss_ceiling: f64,
    /// Spacing of exported history rows (hours); 0 exports every state.
    pub save_interval_hours: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let engine = EngineSettings::default();
        Self {
            source: SourceKind::Synthetic,
            power_model: None,
            days: 30.0,
            time_step_hours: 0.1,
            seed: 42,
            evaluation_interval: engine.evaluation_interval,
            averaging_window: engine.averaging_window,
            dod_method: engine.dod_method,
            loss_ceiling: engine.loss_ceiling,
            save_interval_hours: 1.0,
        }
    }
}

/// Vehicle and pack parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusConfig {
    pub id: String,
    /// Nominal pack capacity (Ah).
    pub nominal_capacity_ah: f64,
    /// Initial state of charge (0.0 to 1.0).
    pub initial_soc: f64,
    pub charge_c_rate: f64,
    pub regen_c_rate: f64,
    pub discharge_c_rate: f64,
    /// Pack voltage at 0% SoC (V).
    pub voltage_empty_v: f64,
    /// Pack voltage at 100% SoC (V).
    pub voltage_full_v: f64,
    /// Lower bound of the operating SoC window.
    pub soc_min: f64,
    /// Upper bound of the operating SoC window.
    pub soc_max: f64,
}

impl Default for BusConfig {
    fn default() -> Self {
        let bus = Bus::default();
        let window = SocWindow::default();
        Self {
            id: bus.id,
            nominal_capacity_ah: bus.nominal_capacity_ah,
            initial_soc: bus.initial_soc,
            charge_c_rate: bus.charge_c_rate,
            regen_c_rate: bus.regen_c_rate,
            discharge_c_rate: bus.discharge_c_rate,
            voltage_empty_v: bus.voltage_empty_v,
            voltage_full_v: bus.voltage_full_v,
            soc_min: window.min,
            soc_max: window.max,
        }
    }
}

impl BusConfig {
    pub fn to_bus(&self) -> Bus {
        Bus {
            id: self.id.clone(),
            nominal_capacity_ah: self.nominal_capacity_ah,
            initial_soc: self.initial_soc,
            charge_c_rate: self.charge_c_rate,
            regen_c_rate: self.regen_c_rate,
            discharge_c_rate: self.discharge_c_rate,
            voltage_empty_v: self.voltage_empty_v,
            voltage_full_v: self.voltage_full_v,
        }
    }

    /// A 3.3 Ah lab cell cycled over the full SoC range.
    fn lab_cell(id: &str, initial_soc: f64) -> Self {
        Self {
            id: id.to_string(),
            nominal_capacity_ah: 3.3,
            initial_soc,
            voltage_empty_v: 3.0,
            voltage_full_v: 4.2,
            soc_min: 0.0,
            soc_max: 1.0,
            ..Self::default()
        }
    }
}

/// Aging coefficient set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgingConfig {
    /// SoC-dependence variant: `linear-soc`, `exponential-soc`, or `sigmoidal-soc`.
    pub preset: AgingPreset,
}

/// Synthetic trolleybus operation parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OperationConfig {
    /// Mean ambient temperature (°C).
    pub temperature_c: f64,
    /// Daily temperature amplitude (°C).
    pub temperature_swing_c: f64,
    /// Share of the route under overhead line (0.0 to 1.0).
    pub overhead_coverage: f64,
    pub regen_probability: f64,
    pub idle_probability: f64,
    pub charging_soc_threshold: f64,
    pub low_soc_charge_boost: f64,
    pub regen_soc_ceiling: f64,
}

impl Default for OperationConfig {
    fn default() -> Self {
        let g = GeneratorConfig::default();
        Self {
            temperature_c: g.temperature_c,
            temperature_swing_c: g.temperature_swing_c,
            overhead_coverage: g.overhead_coverage,
            regen_probability: g.regen_probability,
            idle_probability: g.idle_probability,
            charging_soc_threshold: g.charging_soc_threshold,
            low_soc_charge_boost: g.low_soc_charge_boost,
            regen_soc_ceiling: g.regen_soc_ceiling,
        }
    }
}

impl OperationConfig {
    pub fn generator_config(&self, duration_hours: f64, time_step_hours: f64) -> GeneratorConfig {
        GeneratorConfig {
            duration_hours,
            time_step_hours,
            temperature_c: self.temperature_c,
            temperature_swing_c: self.temperature_swing_c,
            overhead_coverage: self.overhead_coverage,
            regen_probability: self.regen_probability,
            idle_probability: self.idle_probability,
            charging_soc_threshold: self.charging_soc_threshold,
            low_soc_charge_boost: self.low_soc_charge_boost,
            regen_soc_ceiling: self.regen_soc_ceiling,
        }
    }
}

/// Recorded telemetry input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// CSV file with telemetry rows.
    pub path: Option<PathBuf>,
    /// Skip rows whose timestamp does not advance instead of failing.
    pub drop_out_of_order: bool,
}

impl TelemetryConfig {
    /// How the loader treats out-of-order rows.
    pub fn time_order(&self) -> TimeOrder {
        if self.drop_out_of_order {
            TimeOrder::DropOutOfOrder
        } else {
            TimeOrder::Strict
        }
    }
}

/// Lab protocol parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabConfig {
    /// Cyclic depth of discharge (0.0 to 1.0).
    pub dod: f64,
    /// Cyclic average SoC.
    pub soc_avg: f64,
    /// Cyclic C-rate.
    pub c_rate: f64,
    /// Cyclic test length in equivalent full cycles.
    pub target_efc: f64,
    /// Calendar storage SoC.
    pub storage_soc: f64,
    /// Chamber temperature (°C).
    pub temperature_c: f64,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            dod: 0.8,
            soc_avg: 0.5,
            c_rate: 0.5,
            target_efc: 200.0,
            storage_soc: 0.9,
            temperature_c: 23.0,
        }
    }
}

impl LabConfig {
    pub fn cyclic_profile(&self) -> CyclicProfile {
        CyclicProfile::new(
            self.dod,
            self.soc_avg,
            self.c_rate,
            self.temperature_c,
            self.target_efc,
        )
    }

    pub fn calendar_profile(&self, duration_days: f64) -> CalendarProfile {
        CalendarProfile::new(self.storage_soc, self.temperature_c, duration_days)
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"bus.initial_soc"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

fn check_fraction(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(ConfigError::new(field, "must be in [0.0, 1.0]"));
    }
}

fn check_positive(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !(value.is_finite() && value > 0.0) {
        errors.push(ConfigError::new(field, "must be > 0"));
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: a 300 Ah trolleybus pack in synthetic
    /// operation at 25 °C for 30 days.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the hot-climate preset: 90 days around 38 °C with a wide daily
    /// swing, sparse catenary, and the exponential SoC dependence.
    pub fn hot_climate() -> Self {
        Self {
            simulation: SimulationConfig {
                days: 90.0,
                ..SimulationConfig::default()
            },
            bus: BusConfig {
                id: "TrolleyBus_Hot".to_string(),
                initial_soc: 0.8,
                soc_max: 0.95,
                ..BusConfig::default()
            },
            aging: AgingConfig {
                preset: AgingPreset::ExponentialSoc,
            },
            operation: OperationConfig {
                temperature_c: 38.0,
                temperature_swing_c: 7.0,
                overhead_coverage: 0.2,
                ..OperationConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the telemetry preset: the bundled sample trace replayed
    /// through the net power balance.
    pub fn telemetry() -> Self {
        Self {
            simulation: SimulationConfig {
                source: SourceKind::Telemetry,
                evaluation_interval: 20,
                averaging_window: 200,
                save_interval_hours: 0.0,
                ..SimulationConfig::default()
            },
            telemetry: TelemetryConfig {
                path: Some(PathBuf::from("data/sample_telemetry.csv")),
                ..TelemetryConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the lab-cyclic preset: 80% DoD around 50% SoC at 0.5C, 23 °C.
    pub fn lab_cyclic() -> Self {
        let lab = LabConfig::default();
        let start_soc = lab.cyclic_profile().start_soc();
        Self {
            simulation: SimulationConfig {
                source: SourceKind::LabCyclic,
                dod_method: DodMethod::CycleDetection,
                ..SimulationConfig::default()
            },
            bus: BusConfig::lab_cell("Cell_Cyclic", start_soc),
            lab,
            ..Self::default()
        }
    }

    /// Returns the lab-calendar preset: 60 days of storage at 90% SoC, 40 °C.
    pub fn lab_calendar() -> Self {
        let lab = LabConfig {
            temperature_c: 40.0,
            ..LabConfig::default()
        };
        Self {
            simulation: SimulationConfig {
                source: SourceKind::LabCalendar,
                days: 60.0,
                dod_method: DodMethod::CycleDetection,
                ..SimulationConfig::default()
            },
            bus: BusConfig::lab_cell("Cell_Calendar", lab.storage_soc),
            lab,
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &[
        "baseline",
        "hot_climate",
        "telemetry",
        "lab_cyclic",
        "lab_calendar",
    ];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "hot_climate" => Ok(Self::hot_climate()),
            "telemetry" => Ok(Self::telemetry()),
            "lab_cyclic" => Ok(Self::lab_cyclic()),
            "lab_calendar" => Ok(Self::lab_calendar()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Power strategy for this scenario.
    pub fn power_model(&self) -> PowerModelKind {
        self.simulation
            .power_model
            .unwrap_or_else(|| self.simulation.source.default_power_model())
    }

    /// Engine settings assembled from the simulation and bus sections.
    pub fn engine_settings(&self) -> EngineSettings {
        let s = &self.simulation;
        EngineSettings {
            soc_window: SocWindow::new(self.bus.soc_min, self.bus.soc_max),
            evaluation_interval: s.evaluation_interval,
            averaging_window: s.averaging_window,
            dod_method: s.dod_method,
            loss_ceiling: s.loss_ceiling,
        }
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let s = &self.simulation;
        if matches!(s.source, SourceKind::Synthetic | SourceKind::LabCalendar) {
            check_positive(&mut errors, "simulation.days", s.days);
        }
        check_positive(&mut errors, "simulation.time_step_hours", s.time_step_hours);
        if s.evaluation_interval == 0 {
            errors.push(ConfigError::new("simulation.evaluation_interval", "must be > 0"));
        }
        if s.averaging_window == 0 {
            errors.push(ConfigError::new("simulation.averaging_window", "must be > 0"));
        }
        if !(0.0..1.0).contains(&s.loss_ceiling) {
            errors.push(ConfigError::new("simulation.loss_ceiling", "must be in [0.0, 1.0)"));
        }
        if s.source == SourceKind::Synthetic
            && s.days > 0.0
            && s.time_step_hours > 0.0
            && s.days * 24.0 / s.time_step_hours > MAX_SAMPLES as f64
        {
            errors.push(ConfigError::new(
                "simulation.days",
                format!("exceeds {MAX_SAMPLES} samples at the configured time step"),
            ));
        }
        if !(s.save_interval_hours >= 0.0) {
            errors.push(ConfigError::new("simulation.save_interval_hours", "must be >= 0"));
        }

        let b = &self.bus;
        check_positive(&mut errors, "bus.nominal_capacity_ah", b.nominal_capacity_ah);
        check_fraction(&mut errors, "bus.initial_soc", b.initial_soc);
        check_fraction(&mut errors, "bus.soc_min", b.soc_min);
        check_fraction(&mut errors, "bus.soc_max", b.soc_max);
        if b.soc_min >= b.soc_max {
            errors.push(ConfigError::new("bus.soc_min", "must be < bus.soc_max"));
        } else if (0.0..=1.0).contains(&b.initial_soc)
            && !(b.soc_min..=b.soc_max).contains(&b.initial_soc)
        {
            errors.push(ConfigError::new(
                "bus.initial_soc",
                "must lie within [bus.soc_min, bus.soc_max]",
            ));
        }
        for (field, rate) in [
            ("bus.charge_c_rate", b.charge_c_rate),
            ("bus.regen_c_rate", b.regen_c_rate),
            ("bus.discharge_c_rate", b.discharge_c_rate),
        ] {
            if !(rate >= 0.0) {
                errors.push(ConfigError::new(field, "must be >= 0"));
            }
        }
        if b.voltage_full_v <= b.voltage_empty_v {
            errors.push(ConfigError::new(
                "bus.voltage_full_v",
                "must be > bus.voltage_empty_v",
            ));
        }

        let o = &self.operation;
        check_fraction(&mut errors, "operation.overhead_coverage", o.overhead_coverage);
        check_fraction(&mut errors, "operation.regen_probability", o.regen_probability);
        check_fraction(&mut errors, "operation.idle_probability", o.idle_probability);
        check_fraction(&mut errors, "operation.charging_soc_threshold", o.charging_soc_threshold);
        check_fraction(&mut errors, "operation.regen_soc_ceiling", o.regen_soc_ceiling);
        if !(o.low_soc_charge_boost >= 1.0) {
            errors.push(ConfigError::new("operation.low_soc_charge_boost", "must be >= 1"));
        }

        if s.source == SourceKind::Telemetry && self.telemetry.path.is_none() {
            errors.push(ConfigError::new(
                "telemetry.path",
                "required when simulation.source = \"telemetry\"",
            ));
        }

        let l = &self.lab;
        match s.source {
            SourceKind::LabCyclic => {
                check_positive(&mut errors, "lab.dod", l.dod);
                check_fraction(&mut errors, "lab.dod", l.dod);
                check_fraction(&mut errors, "lab.soc_avg", l.soc_avg);
                check_positive(&mut errors, "lab.c_rate", l.c_rate);
                check_positive(&mut errors, "lab.target_efc", l.target_efc);
            }
            SourceKind::LabCalendar => {
                check_fraction(&mut errors, "lab.storage_soc", l.storage_soc);
            }
            SourceKind::Synthetic | SourceKind::Telemetry => {}
        }

        errors
    }
}
