use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::warn;

use super::{ConditionSource, SocProbe};
use crate::sim::types::{OperatingCondition, OperatingMode};

/// Upper bound on the samples one generator emits.
pub const MAX_SAMPLES: usize = 10_000_000;

/// Hour of day at which the synthetic ambient temperature peaks.
const TEMPERATURE_PEAK_HOUR: f64 = 15.0;

/// Tunables for synthetic trolleybus operation.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Total simulated time (hours).
    pub duration_hours: f64,
    /// Spacing between samples (hours).
    pub time_step_hours: f64,
    /// Mean ambient temperature (°C).
    pub temperature_c: f64,
    /// Daily temperature amplitude around the mean (°C).
    pub temperature_swing_c: f64,
    /// Share of samples under overhead line (probability of charging).
    pub overhead_coverage: f64,
    /// Probability that an off-wire sample is braking.
    pub regen_probability: f64,
    /// Probability that a sample that is neither charging nor braking is idle.
    pub idle_probability: f64,
    /// Below this SoC the charging probability is boosted.
    pub charging_soc_threshold: f64,
    /// Multiplier applied to `overhead_coverage` under the threshold.
    pub low_soc_charge_boost: f64,
    /// At or above this SoC no regeneration is drawn.
    pub regen_soc_ceiling: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            duration_hours: 720.0,
            time_step_hours: 0.1,
            temperature_c: 25.0,
            temperature_swing_c: 0.0,
            overhead_coverage: 0.3,
            regen_probability: 0.2,
            idle_probability: 0.1,
            charging_soc_threshold: 0.4,
            low_soc_charge_boost: 2.0,
            regen_soc_ceiling: 0.85,
        }
    }
}

/// Seeded generator of synthetic trolleybus operating conditions.
///
/// Each sample draws a mode from the configured probabilities. The
/// charging probability adapts to the SoC read through the engine's
/// [`SocProbe`], closing the loop between operation and battery state.
///
/// # Examples
///
/// ```
/// use ebus_aging_sim::conditions::{BusOperationGenerator, GeneratorConfig};
///
/// let generator = BusOperationGenerator::new(
///     GeneratorConfig { duration_hours: 1.0, ..GeneratorConfig::default() },
///     42,
/// );
/// assert_eq!(generator.sample_count(), 11);
/// ```
#[derive(Debug, Clone)]
pub struct BusOperationGenerator {
    config: GeneratorConfig,
    index: usize,
    total: usize,
    rng: StdRng,
}

impl BusOperationGenerator {
    /// Creates a generator covering `[0, duration_hours]` inclusive.
    pub fn new(config: GeneratorConfig, seed: u64) -> Self {
        let total = if config.time_step_hours > 0.0 && config.duration_hours >= 0.0 {
            let intervals = (config.duration_hours / config.time_step_hours).round();
            if intervals >= MAX_SAMPLES as f64 {
                warn!(
                    duration_hours = config.duration_hours,
                    time_step_hours = config.time_step_hours,
                    max_samples = MAX_SAMPLES,
                    "synthetic run truncated"
                );
                MAX_SAMPLES
            } else {
                intervals as usize + 1
            }
        } else {
            0
        };
        Self {
            config,
            index: 0,
            total,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Number of samples this generator will emit.
    pub fn sample_count(&self) -> usize {
        self.total
    }

    /// Ambient temperature at `time_hours`: daily sinusoid around the mean.
    pub fn temperature_at(&self, time_hours: f64) -> f64 {
        let hour_angle =
            2.0 * std::f64::consts::PI * (time_hours - TEMPERATURE_PEAK_HOUR + 6.0) / 24.0;
        self.config.temperature_c + self.config.temperature_swing_c * hour_angle.sin()
    }

    /// Draws the operating mode for one sample given the current SoC.
    pub fn draw_mode(&mut self, soc: f64) -> OperatingMode {
        let c = &self.config;
        let charge_p = if soc < c.charging_soc_threshold {
            (c.overhead_coverage * c.low_soc_charge_boost).min(1.0)
        } else {
            c.overhead_coverage
        };
        let regen_p = if soc < c.regen_soc_ceiling {
            c.regen_probability
        } else {
            0.0
        };
        let idle_p = c.idle_probability;

        if self.rng.random::<f64>() < charge_p {
            OperatingMode::Charging
        } else if self.rng.random::<f64>() < regen_p {
            OperatingMode::Regenerating
        } else if self.rng.random::<f64>() < idle_p {
            OperatingMode::Idle
        } else {
            OperatingMode::Discharging
        }
    }
}

impl ConditionSource for BusOperationGenerator {
    fn next_condition(&mut self, probe: SocProbe<'_>) -> Option<OperatingCondition> {
        if self.index >= self.total {
            return None;
        }
        let time_hours = self.index as f64 * self.config.time_step_hours;
        self.index += 1;

        let mode = self.draw_mode(probe.soc());
        Some(OperatingCondition::new(
            time_hours,
            self.temperature_at(time_hours),
            mode,
        ))
    }
}
