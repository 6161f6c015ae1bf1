/// Static traction-battery configuration of one bus.
///
/// Read-only for the duration of a run; clone it freely across
/// independent runs.
///
/// # Current Convention
/// - Positive current: discharging (battery supplies the drivetrain)
/// - Negative current: charging (catenary or regenerative braking)
#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    /// Vehicle identifier used in reports.
    pub id: String,

    /// Nominal (beginning-of-life) capacity in ampere-hours.
    pub nominal_capacity_ah: f64,

    /// State of charge at the start of the run (0.0 to 1.0).
    pub initial_soc: f64,

    /// Catenary charging current as a multiple of nominal capacity.
    pub charge_c_rate: f64,

    /// Regenerative braking current as a multiple of nominal capacity.
    pub regen_c_rate: f64,

    /// Traction discharge current as a multiple of nominal capacity.
    pub discharge_c_rate: f64,

    /// Pack voltage at 0% SoC.
    pub voltage_empty_v: f64,

    /// Pack voltage at 100% SoC.
    pub voltage_full_v: f64,
}

impl Bus {
    /// Creates a bus with the default trolleybus C-rates and voltage curve.
    pub fn new(id: impl Into<String>, nominal_capacity_ah: f64, initial_soc: f64) -> Self {
        Self {
            id: id.into(),
            nominal_capacity_ah,
            initial_soc,
            ..Self::default()
        }
    }

    /// Open-circuit pack voltage at `soc`, linear between the curve endpoints.
    pub fn voltage_at(&self, soc: f64) -> f64 {
        self.voltage_empty_v + soc * (self.voltage_full_v - self.voltage_empty_v)
    }

    /// Usable energy in kWh for a given remaining capacity, at mid-curve voltage.
    pub fn energy_kwh(&self, capacity_ah: f64) -> f64 {
        capacity_ah * self.voltage_at(0.5) / 1000.0
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            id: "TrolleyBus_001".to_string(),
            nominal_capacity_ah: 300.0,
            initial_soc: 0.5,
            charge_c_rate: 1.0,
            regen_c_rate: 0.5,
            discharge_c_rate: 0.3,
            voltage_empty_v: 300.0,
            voltage_full_v: 400.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voltage_curve_endpoints() {
        let bus = Bus::default();
        assert_eq!(bus.voltage_at(0.0), 300.0);
        assert_eq!(bus.voltage_at(1.0), 400.0);
        assert_eq!(bus.voltage_at(0.5), 350.0);
    }

    #[test]
    fn energy_uses_mid_curve_voltage() {
        let bus = Bus::new("b", 400.0, 0.7);
        assert_eq!(bus.energy_kwh(400.0), 140.0);
        assert_eq!(bus.initial_soc, 0.7);
    }
}
