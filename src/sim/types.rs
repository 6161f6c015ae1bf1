//! Core simulation types: operating conditions, engine settings, and errors.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use super::window::DodMethod;

/// What the pack is doing during one sample. Exactly one mode applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Catenary or depot charging.
    Charging,
    /// Regenerative braking feeds the pack.
    Regenerating,
    /// Traction drawn from the pack.
    Discharging,
    /// No current.
    Idle,
}

impl OperatingMode {
    /// Classifies a telemetry sample by its power balance.
    ///
    /// Negative demand is braking energy; a catenary that covers the full
    /// demand leaves headroom for charging; anything else drains the pack.
    pub fn from_power_balance(demand_kw: f64, available_kw: f64, has_catenary: bool) -> Self {
        if demand_kw < 0.0 {
            Self::Regenerating
        } else if has_catenary && available_kw >= demand_kw {
            Self::Charging
        } else {
            Self::Discharging
        }
    }

    pub fn is_charging(self) -> bool {
        self == Self::Charging
    }

    pub fn is_regenerating(self) -> bool {
        self == Self::Regenerating
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Charging => "charging",
            Self::Regenerating => "regenerating",
            Self::Discharging => "discharging",
            Self::Idle => "idle",
        };
        f.write_str(s)
    }
}

/// Measured power figures attached to a telemetry-derived sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerDemand {
    /// Total vehicle demand (kW; negative while braking).
    pub demand_kw: f64,
    /// Power the catenary can deliver at this point (kW).
    pub available_catenary_kw: f64,
    /// Whether the vehicle is under overhead line.
    pub has_catenary: bool,
}

/// Lab-protocol command attached to a generated test sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtocolSetpoint {
    /// SoC the cell is driven to during this sample.
    pub target_soc: f64,
    /// Commanded current as a multiple of nominal capacity (negative=charge).
    pub c_rate: f64,
    /// Test cycle this sample belongs to (-1 for preconditioning).
    pub cycle_number: i64,
}

/// One timestamped environmental/operational sample.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatingCondition {
    /// Hours since the first sample; strictly increasing within a sequence.
    pub time_hours: f64,
    /// Ambient temperature (°C).
    pub ambient_temp: f64,
    /// Operating mode for this sample.
    pub mode: OperatingMode,
    /// Measured power figures, when the sample comes from telemetry.
    pub power: Option<PowerDemand>,
    /// Protocol command, when the sample comes from a lab profile.
    pub protocol: Option<ProtocolSetpoint>,
}

impl OperatingCondition {
    pub fn new(time_hours: f64, ambient_temp: f64, mode: OperatingMode) -> Self {
        Self {
            time_hours,
            ambient_temp,
            mode,
            power: None,
            protocol: None,
        }
    }

    /// Builds a telemetry sample; the mode is derived from the power balance.
    pub fn from_power(time_hours: f64, ambient_temp: f64, power: PowerDemand) -> Self {
        let mode = OperatingMode::from_power_balance(
            power.demand_kw,
            power.available_catenary_kw,
            power.has_catenary,
        );
        Self {
            power: Some(power),
            ..Self::new(time_hours, ambient_temp, mode)
        }
    }

    /// Builds a lab-protocol sample.
    pub fn from_protocol(time_hours: f64, ambient_temp: f64, setpoint: ProtocolSetpoint) -> Self {
        let mode = if setpoint.c_rate < 0.0 {
            OperatingMode::Charging
        } else if setpoint.c_rate > 0.0 {
            OperatingMode::Discharging
        } else {
            OperatingMode::Idle
        };
        Self {
            protocol: Some(setpoint),
            ..Self::new(time_hours, ambient_temp, mode)
        }
    }
}

/// Permitted operating SoC range `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SocWindow {
    pub min: f64,
    pub max: f64,
}

impl SocWindow {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, soc: f64) -> f64 {
        soc.clamp(self.min, self.max)
    }

    pub fn contains(&self, soc: f64) -> bool {
        (self.min..=self.max).contains(&soc)
    }

    fn is_valid(&self) -> bool {
        0.0 <= self.min && self.min < self.max && self.max <= 1.0
    }
}

impl Default for SocWindow {
    fn default() -> Self {
        Self::new(0.3, 0.9)
    }
}

/// Tunables for the stepping loop.
///
/// # Examples
///
/// ```
/// use ebus_aging_sim::sim::types::EngineSettings;
///
/// let settings = EngineSettings::default();
/// assert_eq!(settings.evaluation_interval, 100);
/// assert_eq!(settings.loss_ceiling, 0.8);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// SoC clamp applied after every fast-loop update.
    pub soc_window: SocWindow,
    /// Aging is re-evaluated every this many samples.
    pub evaluation_interval: usize,
    /// Length of the trailing SoC ring buffer used for averages and DoD.
    pub averaging_window: usize,
    /// How depth of discharge is extracted from the trailing window.
    pub dod_method: DodMethod,
    /// Upper bound on lifetime capacity loss (fraction of nominal, < 1 so
    /// some capacity always remains).
    pub loss_ceiling: f64,
}

impl EngineSettings {
    pub(crate) fn check(&self) -> Result<(), SimError> {
        if !self.soc_window.is_valid() {
            return Err(SimError::InvalidSocWindow {
                min: self.soc_window.min,
                max: self.soc_window.max,
            });
        }
        if self.evaluation_interval == 0 || self.averaging_window == 0 {
            return Err(SimError::InvalidCadence {
                evaluation_interval: self.evaluation_interval,
                averaging_window: self.averaging_window,
            });
        }
        if !(0.0..1.0).contains(&self.loss_ceiling) {
            return Err(SimError::InvalidLossCeiling(self.loss_ceiling));
        }
        Ok(())
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            soc_window: SocWindow::default(),
            evaluation_interval: 100,
            averaging_window: 1000,
            dod_method: DodMethod::Range,
            loss_ceiling: 0.8,
        }
    }
}

/// Precondition violations that abort a run before any history is returned.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("condition sequence is empty; at least one sample is needed to seed the battery")]
    EmptyConditions,

    #[error(
        "timestamps must strictly increase: sample {index} at {current} h follows {previous} h"
    )]
    NonMonotonicTime {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("sample {index} has a non-finite timestamp")]
    NonFiniteTime { index: usize },

    #[error("nominal capacity must be > 0, got {0}")]
    NonPositiveCapacity(f64),

    #[error("initial SoC must be in [0, 1], got {0}")]
    InitialSocOutOfRange(f64),

    #[error("initial SoC {soc} lies outside the SoC window [{min}, {max}]")]
    InitialSocOutsideWindow { soc: f64, min: f64, max: f64 },

    #[error("SoC window [{min}, {max}] must satisfy 0 <= min < max <= 1")]
    InvalidSocWindow { min: f64, max: f64 },

    #[error(
        "evaluation interval ({evaluation_interval}) and averaging window ({averaging_window}) must be > 0"
    )]
    InvalidCadence {
        evaluation_interval: usize,
        averaging_window: usize,
    },

    #[error("loss ceiling must be in [0, 1), got {0}")]
    InvalidLossCeiling(f64),
}
