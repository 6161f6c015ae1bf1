//! Empirical coefficient bundle for the semi-empirical aging model.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Shape of the calendar-aging state-of-charge stress term.
///
/// Every variant reads its coefficients from the shared [`AgingParameters`]
/// record; unused fields are simply ignored by the other shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocDependence {
    /// `gamma * soc_percent + sigma`
    Linear,
    /// `sigma_exp * exp(rate * soc)`
    Exponential,
    /// `sigma + amplitude / (1 + exp(-steepness * (soc - midpoint)))`
    Sigmoidal,
}

/// Immutable constant record for the aging model.
///
/// Created once per run and copied into every [`super::AgingModel`].
/// All energies are in J/mol, temperatures are handled in Kelvin by the
/// model, and time is expressed in days.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgingParameters {
    /// Calendar activation energy (J/mol).
    pub activation_energy_calendar: f64,
    /// Cyclic activation energy (J/mol).
    pub activation_energy_cyclic: f64,
    /// Universal gas constant (J/(mol*K)).
    pub gas_constant: f64,
    /// Exponent applied to elapsed days in the calendar term.
    pub time_exponent: f64,
    /// Exponent applied to equivalent full cycles in the SEI term.
    pub efc_exponent: f64,
    /// Calendar pre-exponential factor.
    pub pre_exp_factor_calendar: f64,

    /// Which SoC stress shape the calendar term uses.
    pub soc_dependence: SocDependence,
    /// Linear SoC slope per percent of charge.
    pub gamma_calendar: f64,
    /// Offset of the linear and sigmoidal SoC terms.
    pub sigma_calendar: f64,
    /// Scale of the exponential SoC term.
    pub soc_exp_scale: f64,
    /// Rate of the exponential SoC term (per unit SoC).
    pub soc_exp_rate: f64,
    /// Height of the sigmoidal SoC step.
    pub soc_sigmoid_amplitude: f64,
    /// Steepness of the sigmoidal SoC step.
    pub soc_sigmoid_steepness: f64,
    /// SoC at the sigmoid inflection point.
    pub soc_sigmoid_midpoint: f64,

    /// SEI pre-factor.
    pub c2: f64,
    /// SEI chemical-stress slope per percent of charge.
    pub c3: f64,
    /// SEI chemical-stress offset.
    pub c4: f64,
    /// Active-material (Paris-law) pre-factor.
    pub c5: f64,
    /// Active-material stress exponent.
    pub paris_exponent: f64,
    /// Depth of discharge above which active-material loss is counted.
    pub active_material_dod_threshold: f64,
}

impl AgingParameters {
    /// Coefficients of the graphite-expansion polynomial, highest degree first.
    pub const GRAPHITE_EXPANSION: [f64; 8] = [
        2.74e-13, -8.39e-11, 8.38e-9, -2.39e-7, -5.05e-6, 9.70e-5, 0.02, -6.19e-3,
    ];

    /// Linear SoC dependence; the reference coefficient set.
    pub fn linear_soc() -> Self {
        Self {
            activation_energy_calendar: 36_360.0,
            activation_energy_cyclic: 36_360.0,
            gas_constant: 8.314,
            time_exponent: 0.789,
            efc_exponent: 0.98,
            pre_exp_factor_calendar: 2.15e4,
            soc_dependence: SocDependence::Linear,
            gamma_calendar: 1.6e-3,
            sigma_calendar: 0.03,
            soc_exp_scale: 0.0405,
            soc_exp_rate: 2.0,
            soc_sigmoid_amplitude: 0.16,
            soc_sigmoid_steepness: 10.0,
            soc_sigmoid_midpoint: 0.5,
            c2: 5.0e6,
            c3: 3.90e-3,
            c4: 0.20,
            c5: 0.35,
            paris_exponent: 2.0,
            active_material_dod_threshold: 0.6,
        }
    }

    /// Exponential SoC dependence, matched to the linear set at 50% SoC.
    pub fn exponential_soc() -> Self {
        Self {
            soc_dependence: SocDependence::Exponential,
            ..Self::linear_soc()
        }
    }

    /// Sigmoidal SoC dependence, matched to the linear set at 50% SoC.
    pub fn sigmoidal_soc() -> Self {
        Self {
            soc_dependence: SocDependence::Sigmoidal,
            ..Self::linear_soc()
        }
    }
}

impl Default for AgingParameters {
    fn default() -> Self {
        Self::linear_soc()
    }
}

/// Named coefficient presets selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgingPreset {
    #[default]
    LinearSoc,
    ExponentialSoc,
    SigmoidalSoc,
}

impl AgingPreset {
    /// Available preset names.
    pub const NAMES: &[&str] = &["linear-soc", "exponential-soc", "sigmoidal-soc"];

    /// Builds the coefficient record for this preset.
    pub fn parameters(self) -> AgingParameters {
        match self {
            Self::LinearSoc => AgingParameters::linear_soc(),
            Self::ExponentialSoc => AgingParameters::exponential_soc(),
            Self::SigmoidalSoc => AgingParameters::sigmoidal_soc(),
        }
    }
}

impl fmt::Display for AgingPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LinearSoc => "linear-soc",
            Self::ExponentialSoc => "exponential-soc",
            Self::SigmoidalSoc => "sigmoidal-soc",
        };
        f.write_str(name)
    }
}

impl FromStr for AgingPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear-soc" => Ok(Self::LinearSoc),
            "exponential-soc" => Ok(Self::ExponentialSoc),
            "sigmoidal-soc" => Ok(Self::SigmoidalSoc),
            _ => Err(format!(
                "unknown aging preset \"{s}\", available: {}",
                Self::NAMES.join(", ")
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_share_everything_but_soc_shape() {
        let linear = AgingPreset::LinearSoc.parameters();
        let sigmoid = AgingPreset::SigmoidalSoc.parameters();
        assert_eq!(sigmoid.soc_dependence, SocDependence::Sigmoidal);
        assert_eq!(
            AgingParameters {
                soc_dependence: SocDependence::Linear,
                ..sigmoid
            },
            linear
        );
    }

    #[test]
    fn preset_names_round_trip() {
        for name in AgingPreset::NAMES {
            let preset: AgingPreset = name.parse().expect("listed preset should parse");
            assert_eq!(preset.to_string(), *name);
        }
    }

    #[test]
    fn unknown_preset_lists_alternatives() {
        let err = "quadratic-soc".parse::<AgingPreset>().unwrap_err();
        assert!(err.contains("linear-soc"));
    }
}
