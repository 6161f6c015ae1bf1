//! Fast-loop strategies that turn one operating condition into a SoC update.

use crate::battery::{BatteryState, Bus};

use super::types::{OperatingCondition, OperatingMode, SocWindow};

/// Everything a strategy may look at while advancing one sample.
pub struct StepContext<'a> {
    /// State produced by the previous step.
    pub state: &'a BatteryState,
    /// Sample being consumed.
    pub condition: &'a OperatingCondition,
    /// Hours since the previous sample (> 0).
    pub dt_hours: f64,
    /// Static bus configuration.
    pub bus: &'a Bus,
    /// Operating SoC clamp.
    pub soc_window: SocWindow,
}

/// Result of one fast-loop update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerStep {
    /// SoC after the sample, already clamped to the operating window.
    pub soc: f64,
    /// Pack current over the sample (A; positive=discharge, negative=charge).
    pub current: f64,
}

/// Strategy that advances state of charge for one sample.
pub trait PowerSource {
    /// Returns the next SoC and the current that produced it.
    fn advance(&mut self, ctx: &StepContext<'_>) -> PowerStep;

    /// Returns a human-readable name for the strategy.
    fn name(&self) -> &'static str;
}

/// Current implied by the SoC change actually realised after clamping.
fn realised_current(prev_soc: f64, next_soc: f64, capacity_ah: f64, dt_hours: f64) -> f64 {
    (prev_soc - next_soc) * capacity_ah / dt_hours
}

/// Mode-driven fixed C-rate policy for synthetic operation.
///
/// Each mode draws `c_rate * nominal_capacity` amperes; the resulting SoC
/// change is computed against the aged capacity.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedCRate;

impl PowerSource for FixedCRate {
    fn advance(&mut self, ctx: &StepContext<'_>) -> PowerStep {
        let bus = ctx.bus;
        let nominal = bus.nominal_capacity_ah;
        let requested = match ctx.condition.mode {
            OperatingMode::Charging => -bus.charge_c_rate * nominal,
            OperatingMode::Regenerating => -bus.regen_c_rate * nominal,
            OperatingMode::Discharging => bus.discharge_c_rate * nominal,
            OperatingMode::Idle => 0.0,
        };

        let capacity = ctx.state.capacity;
        let unclamped = ctx.state.soc - requested * ctx.dt_hours / capacity;
        let soc = ctx.soc_window.clamp(unclamped);

        PowerStep {
            soc,
            current: realised_current(ctx.state.soc, soc, capacity, ctx.dt_hours),
        }
    }

    fn name(&self) -> &'static str {
        "fixed-c-rate"
    }
}

/// Net power balance policy for telemetry with measured demand.
///
/// Under catenary the pack absorbs `available - demand`; off-wire it
/// supplies the full demand (negative demand is braking energy).
/// Samples without power figures fall back to [`FixedCRate`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NetPowerBalance;

impl PowerSource for NetPowerBalance {
    fn advance(&mut self, ctx: &StepContext<'_>) -> PowerStep {
        let Some(power) = ctx.condition.power else {
            return FixedCRate.advance(ctx);
        };

        let net_kw = if power.has_catenary {
            power.available_catenary_kw - power.demand_kw
        } else {
            -power.demand_kw
        };

        let capacity = ctx.state.capacity;
        let energy_kwh = ctx.bus.energy_kwh(capacity);
        let unclamped = ctx.state.soc + net_kw * ctx.dt_hours / energy_kwh;
        let soc = ctx.soc_window.clamp(unclamped);

        PowerStep {
            soc,
            current: realised_current(ctx.state.soc, soc, capacity, ctx.dt_hours),
        }
    }

    fn name(&self) -> &'static str {
        "net-power-balance"
    }
}

/// Lab protocol policy: SoC follows the commanded target, current is the
/// commanded C-rate. Samples without a setpoint hold SoC with no current.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProtocolTarget;

impl PowerSource for ProtocolTarget {
    fn advance(&mut self, ctx: &StepContext<'_>) -> PowerStep {
        match ctx.condition.protocol {
            Some(setpoint) => PowerStep {
                soc: ctx.soc_window.clamp(setpoint.target_soc),
                current: setpoint.c_rate * ctx.bus.nominal_capacity_ah,
            },
            None => PowerStep {
                soc: ctx.soc_window.clamp(ctx.state.soc),
                current: 0.0,
            },
        }
    }

    fn name(&self) -> &'static str {
        "protocol-target"
    }
}

/// Config-selectable wrapper dispatching to one of the strategies.
#[derive(Debug, Clone, Copy)]
pub enum PowerModel {
    FixedCRate(FixedCRate),
    NetPowerBalance(NetPowerBalance),
    ProtocolTarget(ProtocolTarget),
}

impl PowerSource for PowerModel {
    fn advance(&mut self, ctx: &StepContext<'_>) -> PowerStep {
        match self {
            Self::FixedCRate(p) => p.advance(ctx),
            Self::NetPowerBalance(p) => p.advance(ctx),
            Self::ProtocolTarget(p) => p.advance(ctx),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::FixedCRate(p) => p.name(),
            Self::NetPowerBalance(p) => p.name(),
            Self::ProtocolTarget(p) => p.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::types::{PowerDemand, ProtocolSetpoint};
    use approx::assert_relative_eq;

    fn bus() -> Bus {
        Bus {
            charge_c_rate: 1.0,
            regen_c_rate: 0.5,
            discharge_c_rate: 0.3,
            ..Bus::new("test", 300.0, 0.5)
        }
    }

    fn ctx<'a>(
        state: &'a BatteryState,
        condition: &'a OperatingCondition,
        bus: &'a Bus,
        dt_hours: f64,
    ) -> StepContext<'a> {
        StepContext {
            state,
            condition,
            dt_hours,
            bus,
            soc_window: SocWindow::new(0.3, 0.9),
        }
    }

    #[test]
    fn fixed_rate_discharge() {
        let bus = bus();
        let state = BatteryState::seed(&bus, 25.0);
        let cond = OperatingCondition::new(0.1, 25.0, OperatingMode::Discharging);
        let step = FixedCRate.advance(&ctx(&state, &cond, &bus, 0.1));
        // 90 A for 0.1 h out of 300 Ah -> -3% SoC.
        assert_relative_eq!(step.soc, 0.47, epsilon = 1e-12);
        assert_relative_eq!(step.current, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn fixed_rate_charge_is_negative_current() {
        let bus = bus();
        let state = BatteryState::seed(&bus, 25.0);
        let cond = OperatingCondition::new(0.1, 25.0, OperatingMode::Charging);
        let step = FixedCRate.advance(&ctx(&state, &cond, &bus, 0.1));
        assert_relative_eq!(step.soc, 0.6, epsilon = 1e-12);
        assert!(step.current < 0.0);
    }

    #[test]
    fn fixed_rate_clamps_and_reports_realised_current() {
        let bus = bus();
        let mut state = BatteryState::seed(&bus, 25.0);
        state.soc = 0.31;
        let cond = OperatingCondition::new(1.0, 25.0, OperatingMode::Discharging);
        let step = FixedCRate.advance(&ctx(&state, &cond, &bus, 1.0));
        assert_eq!(step.soc, 0.3);
        // Only 1% of 300 Ah could actually leave the pack.
        assert_relative_eq!(step.current, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn fixed_rate_idle_holds_soc() {
        let bus = bus();
        let state = BatteryState::seed(&bus, 25.0);
        let cond = OperatingCondition::new(1.0, 25.0, OperatingMode::Idle);
        let step = FixedCRate.advance(&ctx(&state, &cond, &bus, 1.0));
        assert_eq!(step.soc, 0.5);
        assert_eq!(step.current, 0.0);
    }

    #[test]
    fn net_power_charges_under_catenary() {
        let bus = bus();
        let state = BatteryState::seed(&bus, 10.0);
        let cond = OperatingCondition::from_power(
            1.0,
            10.0,
            PowerDemand {
                demand_kw: 60.0,
                available_catenary_kw: 81.0,
                has_catenary: true,
            },
        );
        // 21 kW net for 1 h into 300 Ah * 350 V = 105 kWh -> +20%.
        let step = NetPowerBalance.advance(&ctx(&state, &cond, &bus, 1.0));
        assert_relative_eq!(step.soc, 0.7, epsilon = 1e-12);
        assert!(step.current < 0.0);
    }

    #[test]
    fn net_power_off_wire_discharges() {
        let bus = bus();
        let state = BatteryState::seed(&bus, 10.0);
        let cond = OperatingCondition::from_power(
            0.5,
            10.0,
            PowerDemand {
                demand_kw: 42.0,
                available_catenary_kw: 0.0,
                has_catenary: false,
            },
        );
        let step = NetPowerBalance.advance(&ctx(&state, &cond, &bus, 0.5));
        assert_relative_eq!(step.soc, 0.3, epsilon = 1e-12);
        assert!(step.current > 0.0);
    }

    #[test]
    fn protocol_follows_target_and_commanded_current() {
        let bus = Bus::new("cell", 3.3, 0.9);
        let state = BatteryState::seed(&bus, 23.0);
        let cond = OperatingCondition::from_protocol(
            0.1,
            23.0,
            ProtocolSetpoint {
                target_soc: 0.85,
                c_rate: 0.5,
                cycle_number: 0,
            },
        );
        let mut source = PowerModel::ProtocolTarget(ProtocolTarget);
        let step = source.advance(&StepContext {
            state: &state,
            condition: &cond,
            dt_hours: 0.1,
            bus: &bus,
            soc_window: SocWindow::new(0.0, 1.0),
        });
        assert_eq!(step.soc, 0.85);
        assert_relative_eq!(step.current, 1.65, epsilon = 1e-12);
        assert_eq!(source.name(), "protocol-target");
    }
}
