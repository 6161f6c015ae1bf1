//! Operating-condition producers: synthetic bus operation, lab protocols,
//! and recorded telemetry.

/// Seeded synthetic trolleybus operation with SoC feedback.
pub mod generator;
/// Cyclic and calendar lab-test protocols.
pub mod protocol;
/// CSV telemetry loader.
pub mod telemetry;

pub use generator::{BusOperationGenerator, GeneratorConfig};
pub use protocol::{CalendarProfile, CyclicProfile};
pub use telemetry::{TelemetryError, TelemetrySummary, TimeOrder, load_telemetry_csv};

use crate::battery::BatteryState;
use crate::sim::types::OperatingCondition;

/// Read-only view of the engine's current battery state.
///
/// Handed to a [`ConditionSource`] each time the engine pulls a sample, so a
/// generator can react to the charge level without shared mutable state.
#[derive(Debug, Clone, Copy)]
pub struct SocProbe<'a> {
    state: &'a BatteryState,
}

impl<'a> SocProbe<'a> {
    pub fn new(state: &'a BatteryState) -> Self {
        Self { state }
    }

    /// State of charge after the most recent step.
    pub fn soc(&self) -> f64 {
        self.state.soc
    }

    /// Simulation time of the most recent step (hours).
    pub fn time_hours(&self) -> f64 {
        self.state.time_hours
    }
}

/// Lazily produces operating conditions for the engine, one per pull.
pub trait ConditionSource {
    /// Returns the next sample, or `None` once the sequence is exhausted.
    fn next_condition(&mut self, probe: SocProbe<'_>) -> Option<OperatingCondition>;
}

/// Adapts any iterator of conditions into a [`ConditionSource`] that
/// ignores the probe.
#[derive(Debug, Clone)]
pub struct IterSource<I>(pub I);

impl<I> ConditionSource for IterSource<I>
where
    I: Iterator<Item = OperatingCondition>,
{
    fn next_condition(&mut self, _probe: SocProbe<'_>) -> Option<OperatingCondition> {
        self.0.next()
    }
}
