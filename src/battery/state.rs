use std::fmt;

use super::bus::Bus;

/// Point-in-time snapshot of the traction battery.
///
/// The engine never mutates a state in place; every step produces a fresh
/// value and pushes it onto the run history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryState {
    /// Simulation time of this snapshot (hours since the first sample).
    pub time_hours: f64,
    /// State of charge (0.0 to 1.0).
    pub soc: f64,
    /// Pack voltage (V).
    pub voltage: f64,
    /// Pack current (A; positive=discharge, negative=charge).
    pub current: f64,
    /// Cell temperature (°C).
    pub temperature: f64,
    /// Equivalent full cycles as of the last aging evaluation.
    pub cycle_count: f64,
    /// Cumulative charge moved through the pack (Ah, both directions).
    pub total_ah_throughput: f64,
    /// Age since the start of the run (days).
    pub calendar_age_days: f64,
    /// Remaining capacity (Ah).
    pub capacity: f64,
    /// Remaining capacity as a percent of nominal.
    pub soh: f64,
    /// Depth of discharge used by the last aging evaluation.
    pub avg_dod: f64,
}

impl BatteryState {
    /// Beginning-of-life state seeded from the bus configuration.
    pub fn seed(bus: &Bus, temperature: f64) -> Self {
        Self {
            time_hours: 0.0,
            soc: bus.initial_soc,
            voltage: bus.voltage_at(bus.initial_soc),
            current: 0.0,
            temperature,
            cycle_count: 0.0,
            total_ah_throughput: 0.0,
            calendar_age_days: 0.0,
            capacity: bus.nominal_capacity_ah,
            soh: 100.0,
            avg_dod: 0.0,
        }
    }

    /// Capacity lost so far, as a percent of `nominal_capacity`.
    pub fn capacity_loss_percent(&self, nominal_capacity: f64) -> f64 {
        (nominal_capacity - self.capacity) / nominal_capacity * 100.0
    }
}

impl fmt::Display for BatteryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>8.1}h | SoC={:>5.1}%  I={:>7.1} A  U={:>5.1} V  T={:>4.1}°C | \
             SoH={:.3}%  cap={:.2} Ah  EFC={:.2}  DoD={:.1}%",
            self.time_hours,
            self.soc * 100.0,
            self.current,
            self.voltage,
            self.temperature,
            self.soh,
            self.capacity,
            self.cycle_count,
            self.avg_dod * 100.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_at_full_health() {
        let bus = Bus::new("b", 300.0, 0.5);
        let s = BatteryState::seed(&bus, 25.0);
        assert_eq!(s.soc, 0.5);
        assert_eq!(s.capacity, 300.0);
        assert_eq!(s.soh, 100.0);
        assert_eq!(s.temperature, 25.0);
        assert_eq!(s.capacity_loss_percent(300.0), 0.0);
    }

    #[test]
    fn display_does_not_panic() {
        let s = BatteryState::seed(&Bus::default(), 20.0);
        assert!(!format!("{s}").is_empty());
    }
}
