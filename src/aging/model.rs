//! Semi-empirical calendar and cyclic aging model.

use super::params::{AgingParameters, SocDependence};

/// Offset between Celsius and Kelvin.
const KELVIN_OFFSET: f64 = 273.15;

/// Hours per day.
const HOURS_PER_DAY: f64 = 24.0;

/// Split of a cyclic loss into its two mechanisms.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CyclicLoss {
    /// Lithium-inventory loss driven by cycling (fraction).
    pub sei: f64,
    /// Mechanical-fatigue active-material loss (fraction).
    pub active_material: f64,
}

impl CyclicLoss {
    /// Sum of both mechanisms.
    pub fn total(&self) -> f64 {
        self.sei + self.active_material
    }
}

/// Pure loss-fraction calculator over a fixed [`AgingParameters`] set.
///
/// Inputs are not validated: SoC outside `[0, 1]` or odd temperatures are
/// evaluated as given. The only guards are the documented zero cases for
/// non-positive elapsed time and non-positive cycle counts.
///
/// # Examples
///
/// ```
/// use ebus_aging_sim::aging::AgingModel;
///
/// let model = AgingModel::default();
/// let month = model.calculate_calendar_aging(720.0, 25.0, 0.5);
/// let year = model.calculate_calendar_aging(8760.0, 25.0, 0.5);
/// assert!(month > 0.0 && year > month);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AgingModel {
    params: AgingParameters,
}

impl AgingModel {
    pub fn new(params: AgingParameters) -> Self {
        Self { params }
    }

    /// Calendar capacity-loss fraction after `elapsed_time_hours` of storage.
    ///
    /// # Arguments
    ///
    /// * `elapsed_time_hours` - Time since the start of life (hours)
    /// * `temperature_celsius` - Cell temperature (°C)
    /// * `average_state_of_charge` - Mean SoC over the recent window (0.0 to 1.0)
    ///
    /// # Returns
    ///
    /// Loss fraction; exactly 0.0 when `elapsed_time_hours <= 0`.
    pub fn calculate_calendar_aging(
        &self,
        elapsed_time_hours: f64,
        temperature_celsius: f64,
        average_state_of_charge: f64,
    ) -> f64 {
        let days = elapsed_time_hours / HOURS_PER_DAY;
        if days <= 0.0 {
            return 0.0;
        }

        let p = &self.params;
        let temp_term = arrhenius(
            p.activation_energy_calendar,
            p.gas_constant,
            temperature_celsius,
        );
        let soc_term = self.calendar_soc_term(average_state_of_charge);
        let time_term = days.powf(p.time_exponent);

        p.pre_exp_factor_calendar * temp_term * soc_term * time_term
    }

    /// Cyclic capacity-loss fraction after `equivalent_full_cycles`.
    ///
    /// Returns 0.0 for `equivalent_full_cycles <= 0`.
    pub fn calculate_cyclic_aging(
        &self,
        equivalent_full_cycles: f64,
        temperature_celsius: f64,
        average_state_of_charge: f64,
        average_depth_of_discharge: f64,
    ) -> f64 {
        self.cyclic_breakdown(
            equivalent_full_cycles,
            temperature_celsius,
            average_state_of_charge,
            average_depth_of_discharge,
        )
        .total()
    }

    /// Same as [`Self::calculate_cyclic_aging`] but keeps both mechanisms apart.
    pub fn cyclic_breakdown(
        &self,
        equivalent_full_cycles: f64,
        temperature_celsius: f64,
        average_state_of_charge: f64,
        average_depth_of_discharge: f64,
    ) -> CyclicLoss {
        if equivalent_full_cycles <= 0.0 {
            return CyclicLoss::default();
        }

        let p = &self.params;
        let stress = stress_amplitude(average_state_of_charge, average_depth_of_discharge);

        let temp_term = arrhenius(p.activation_energy_cyclic, p.gas_constant, temperature_celsius);
        let efc_term = equivalent_full_cycles.powf(p.efc_exponent);
        let chemical_term = (p.c3 * average_state_of_charge * 100.0 + p.c4) / 100.0;
        let sei = p.c2 * stress * temp_term * efc_term * chemical_term;

        let active_material = if average_depth_of_discharge > p.active_material_dod_threshold {
            p.c5 * stress.powf(p.paris_exponent) * equivalent_full_cycles
        } else {
            0.0
        };

        CyclicLoss {
            sei,
            active_material,
        }
    }

    fn calendar_soc_term(&self, soc: f64) -> f64 {
        let p = &self.params;
        match p.soc_dependence {
            SocDependence::Linear => p.gamma_calendar * soc * 100.0 + p.sigma_calendar,
            SocDependence::Exponential => p.soc_exp_scale * (p.soc_exp_rate * soc).exp(),
            SocDependence::Sigmoidal => {
                let x = -p.soc_sigmoid_steepness * (soc - p.soc_sigmoid_midpoint);
                p.sigma_calendar + p.soc_sigmoid_amplitude / (1.0 + x.exp())
            }
        }
    }
}

/// Arrhenius acceleration factor `exp(-Ea / (R * T))`.
fn arrhenius(activation_energy: f64, gas_constant: f64, temperature_celsius: f64) -> f64 {
    let kelvin = temperature_celsius + KELVIN_OFFSET;
    (-activation_energy / (gas_constant * kelvin)).exp()
}

/// Graphite particle expansion at `soc`, floored at zero.
///
/// Degree-7 polynomial with the fixed coefficients in
/// [`AgingParameters::GRAPHITE_EXPANSION`], evaluated by Horner's rule.
pub fn graphite_expansion(soc: f64) -> f64 {
    let value = AgingParameters::GRAPHITE_EXPANSION
        .iter()
        .fold(0.0, |acc, c| acc * soc + c);
    value.max(0.0)
}

/// Expansion swing across the SoC window centred on `soc` with width `dod`.
pub fn stress_amplitude(soc: f64, dod: f64) -> f64 {
    let soc_max = (soc + dod / 2.0).min(1.0);
    let soc_min = (soc - dod / 2.0).max(0.0);
    graphite_expansion(soc_max) - graphite_expansion(soc_min)
}
