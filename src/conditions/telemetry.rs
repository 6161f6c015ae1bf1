//! Recorded trolleybus telemetry loaded from CSV.
//!
//! Expected columns (extra columns are ignored):
//! `datetime` (epoch milliseconds), `power_consumption_kw`,
//! `ambient_air_temp_degc`, `has_catenary`, `available_catenary_power_kw`.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{info, warn};

use crate::sim::types::{OperatingCondition, PowerDemand};

const MS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("cannot open telemetry file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed telemetry CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error(
        "telemetry row {row} at {time_hours} h does not advance past {previous} h \
         (set telemetry.drop_out_of_order to skip such rows)"
    )]
    NonIncreasingTime {
        row: usize,
        time_hours: f64,
        previous: f64,
    },

    #[error("telemetry contains no usable rows")]
    Empty,
}

/// What to do with a row whose timestamp does not advance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeOrder {
    /// Fail with [`TelemetryError::NonIncreasingTime`].
    #[default]
    Strict,
    /// Skip the row and log a warning.
    DropOutOfOrder,
}

#[derive(Debug, Deserialize)]
struct TelemetryRecord {
    datetime: i64,
    power_consumption_kw: f64,
    ambient_air_temp_degc: f64,
    #[serde(deserialize_with = "flag")]
    has_catenary: bool,
    available_catenary_power_kw: f64,
}

/// Accepts `true`/`false` as well as `1`/`0` for boolean columns.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid boolean '{other}'"
        ))),
    }
}

/// Loads telemetry from a CSV file into operating conditions.
///
/// # Errors
///
/// Returns [`TelemetryError`] if the file cannot be opened, a row is
/// malformed or out of order under [`TimeOrder::Strict`], or no row survives.
pub fn load_telemetry_csv(
    path: &Path,
    order: TimeOrder,
) -> Result<Vec<OperatingCondition>, TelemetryError> {
    let file = File::open(path).map_err(|source| TelemetryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let conditions = read_telemetry(file, order)?;
    info!(path = %path.display(), rows = conditions.len(), "loaded telemetry");
    Ok(conditions)
}

/// Parses telemetry CSV from any reader.
///
/// Time is expressed in hours since the first row. A row whose timestamp does
/// not advance past the previously kept row is an error, or is skipped with a
/// warning under [`TimeOrder::DropOutOfOrder`].
pub fn read_telemetry<R: Read>(
    reader: R,
    order: TimeOrder,
) -> Result<Vec<OperatingCondition>, TelemetryError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut conditions: Vec<OperatingCondition> = Vec::new();
    let mut start_ms: Option<i64> = None;
    let mut dropped = 0usize;

    for (row, record) in csv_reader.deserialize::<TelemetryRecord>().enumerate() {
        let record = record?;
        let start = *start_ms.get_or_insert(record.datetime);
        let time_hours = (record.datetime - start) as f64 / MS_PER_HOUR;

        let previous = conditions.last().map(|c| c.time_hours);
        if let Some(previous) = previous.filter(|&p| time_hours <= p) {
            if order == TimeOrder::Strict {
                return Err(TelemetryError::NonIncreasingTime {
                    row: row + 1,
                    time_hours,
                    previous,
                });
            }
            warn!(
                row = row + 1,
                time_hours,
                previous,
                "dropping telemetry row with non-increasing timestamp"
            );
            dropped += 1;
            continue;
        }

        conditions.push(OperatingCondition::from_power(
            time_hours,
            record.ambient_air_temp_degc,
            PowerDemand {
                demand_kw: record.power_consumption_kw,
                available_catenary_kw: record.available_catenary_power_kw,
                has_catenary: record.has_catenary,
            },
        ));
    }

    if conditions.is_empty() {
        return Err(TelemetryError::Empty);
    }
    if dropped > 0 {
        warn!(dropped, kept = conditions.len(), "telemetry rows dropped");
    }
    Ok(conditions)
}

/// Headline figures describing a telemetry trace.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySummary {
    pub samples: usize,
    pub duration_hours: f64,
    pub mean_power_kw: f64,
    pub max_power_kw: f64,
    pub mean_temperature_c: f64,
    /// Share of samples under catenary, in percent.
    pub catenary_coverage_percent: f64,
}

impl TelemetrySummary {
    /// Summarises telemetry-derived conditions; `None` if none carry power data.
    pub fn from_conditions(conditions: &[OperatingCondition]) -> Option<Self> {
        let powered: Vec<(f64, PowerDemand)> = conditions
            .iter()
            .filter_map(|c| c.power.map(|p| (c.ambient_temp, p)))
            .collect();
        if powered.is_empty() {
            return None;
        }

        let n = powered.len() as f64;
        let mean_power_kw = powered.iter().map(|(_, p)| p.demand_kw).sum::<f64>() / n;
        let max_power_kw = powered
            .iter()
            .map(|(_, p)| p.demand_kw)
            .fold(f64::NEG_INFINITY, f64::max);
        let mean_temperature_c = powered.iter().map(|(t, _)| t).sum::<f64>() / n;
        let on_wire = powered.iter().filter(|(_, p)| p.has_catenary).count() as f64;

        let duration_hours = match (conditions.first(), conditions.last()) {
            (Some(first), Some(last)) => last.time_hours - first.time_hours,
            _ => 0.0,
        };

        Some(Self {
            samples: powered.len(),
            duration_hours,
            mean_power_kw,
            max_power_kw,
            mean_temperature_c,
            catenary_coverage_percent: on_wire / n * 100.0,
        })
    }
}

impl fmt::Display for TelemetrySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Telemetry ===")?;
        writeln!(f, "Samples:            {}", self.samples)?;
        writeln!(f, "Duration:           {:.2} h", self.duration_hours)?;
        writeln!(f, "Mean power:         {:.1} kW", self.mean_power_kw)?;
        writeln!(f, "Peak power:         {:.1} kW", self.max_power_kw)?;
        writeln!(f, "Mean temperature:   {:.1} °C", self.mean_temperature_c)?;
        write!(
            f,
            "Catenary coverage:  {:.1}%",
            self.catenary_coverage_percent
        )
    }
}
