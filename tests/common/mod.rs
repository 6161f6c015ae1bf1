//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use std::path::PathBuf;

use ebus_aging_sim::aging::AgingModel;
use ebus_aging_sim::battery::{BatteryState, Bus};
use ebus_aging_sim::sim::engine::Engine;
use ebus_aging_sim::sim::power_source::FixedCRate;
use ebus_aging_sim::sim::types::{EngineSettings, OperatingCondition, OperatingMode, SocWindow};

/// Default trolleybus (300 Ah, 50% SoC, 0.3C discharge).
pub fn default_bus() -> Bus {
    Bus::new("TrolleyBus_001", 300.0, 0.5)
}

/// Fixed C-rate engine over the default bus, window (0.3, 0.9), linear-SoC aging.
pub fn default_engine() -> Engine<FixedCRate> {
    Engine::new(
        default_bus(),
        AgingModel::default(),
        EngineSettings::default(),
        FixedCRate,
    )
}

/// `steps` samples `dt` hours apart at 25 °C: discharging for the first
/// `discharge_steps`, idle afterwards.
pub fn discharge_then_idle(steps: usize, dt: f64, discharge_steps: usize) -> Vec<OperatingCondition> {
    (0..steps)
        .map(|i| {
            let mode = if i < discharge_steps {
                OperatingMode::Discharging
            } else {
                OperatingMode::Idle
            };
            OperatingCondition::new(i as f64 * dt, 25.0, mode)
        })
        .collect()
}

/// Asserts that capacity never increases along a history.
pub fn assert_capacity_monotonic(history: &[BatteryState]) {
    for pair in history.windows(2) {
        assert!(
            pair[1].capacity <= pair[0].capacity,
            "capacity rose from {} to {} at t={}",
            pair[0].capacity,
            pair[1].capacity,
            pair[1].time_hours
        );
    }
}

/// Asserts that every state's SoH matches its capacity within 1e-9.
pub fn assert_soh_consistent(history: &[BatteryState], nominal_capacity: f64) {
    for s in history {
        let expected = s.capacity / nominal_capacity * 100.0;
        assert!(
            (s.soh - expected).abs() < 1e-9,
            "soh {} != {} at t={}",
            s.soh,
            expected,
            s.time_hours
        );
    }
}

/// Asserts that every state after the seed lies inside `[min, max]`.
pub fn assert_within_window(history: &[BatteryState], min: f64, max: f64) {
    let window = SocWindow::new(min, max);
    for s in history.iter().skip(1) {
        assert!(
            window.contains(s.soc),
            "soc {} outside [{min}, {max}] at t={}",
            s.soc,
            s.time_hours
        );
    }
}

/// Unique scratch path under the system temp directory.
pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ebus-aging-sim-{}-{name}", std::process::id()))
}
