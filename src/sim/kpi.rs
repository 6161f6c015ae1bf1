//! Post-hoc run summary computed from a completed simulation.

use std::fmt;

use super::engine::SimulationRun;

/// Headline degradation figures for one run.
///
/// Computed from the history and evaluations so reported numbers always
/// match the exported rows.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Samples consumed after the seed.
    pub steps: usize,
    /// Aging evaluations performed.
    pub evaluations: usize,
    pub nominal_capacity: f64,
    /// Remaining capacity at the end of the run (Ah).
    pub final_capacity: f64,
    /// Final state of health (%).
    pub final_soh: f64,
    /// Capacity lost relative to nominal (%).
    pub capacity_loss_percent: f64,
    /// Equivalent full cycles at the end of the run.
    pub total_efc: f64,
    pub calendar_age_days: f64,
    /// Total charge moved through the pack (Ah).
    pub total_ah_throughput: f64,
    pub min_soc: f64,
    pub max_soc: f64,
    pub mean_soc: f64,
    /// Calendar share of the last evaluation's raw loss (fraction).
    pub calendar_loss: f64,
    /// SEI share of the last evaluation's raw loss (fraction).
    pub sei_loss: f64,
    /// Active-material share of the last evaluation's raw loss (fraction).
    pub active_material_loss: f64,
}

impl RunSummary {
    /// Summarises a completed run.
    ///
    /// # Arguments
    ///
    /// * `run` - Engine output; its history always holds the seed state
    ///
    /// # Returns
    ///
    /// A `RunSummary` with all fields populated; loss splits are zero when
    /// no evaluation took place.
    pub fn from_run(run: &SimulationRun) -> Self {
        let history = run.history();
        let last = run.final_state();
        let nominal = run.nominal_capacity();

        let n = history.len() as f64;
        let mut min_soc = f64::INFINITY;
        let mut max_soc = f64::NEG_INFINITY;
        let mut soc_sum = 0.0;
        for s in history {
            min_soc = min_soc.min(s.soc);
            max_soc = max_soc.max(s.soc);
            soc_sum += s.soc;
        }

        let (calendar_loss, sei_loss, active_material_loss) = run
            .evaluations()
            .last()
            .map(|e| (e.calendar_loss, e.cyclic_loss.sei, e.cyclic_loss.active_material))
            .unwrap_or_default();

        Self {
            steps: history.len() - 1,
            evaluations: run.evaluations().len(),
            nominal_capacity: nominal,
            final_capacity: last.capacity,
            final_soh: last.soh,
            capacity_loss_percent: last.capacity_loss_percent(nominal),
            total_efc: last.cycle_count,
            calendar_age_days: last.calendar_age_days,
            total_ah_throughput: last.total_ah_throughput,
            min_soc,
            max_soc,
            mean_soc: soc_sum / n,
            calendar_loss,
            sei_loss,
            active_material_loss,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Aging Summary ---")?;
        writeln!(
            f,
            "Steps:                 {} ({} aging evaluations)",
            self.steps, self.evaluations
        )?;
        writeln!(f, "Calendar age:          {:.1} days", self.calendar_age_days)?;
        writeln!(
            f,
            "Capacity:              {:.2} / {:.2} Ah",
            self.final_capacity, self.nominal_capacity
        )?;
        writeln!(f, "State of health:       {:.3}%", self.final_soh)?;
        writeln!(f, "Capacity loss:         {:.3}%", self.capacity_loss_percent)?;
        writeln!(
            f,
            "  calendar / SEI / AM: {:.3}% / {:.3}% / {:.3}%",
            self.calendar_loss * 100.0,
            self.sei_loss * 100.0,
            self.active_material_loss * 100.0
        )?;
        writeln!(
            f,
            "Throughput:            {:.1} Ah ({:.2} EFC)",
            self.total_ah_throughput, self.total_efc
        )?;
        write!(
            f,
            "SoC range:             {:.1}% .. {:.1}% (mean {:.1}%)",
            self.min_soc * 100.0,
            self.max_soc * 100.0,
            self.mean_soc * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aging::AgingModel;
    use crate::battery::Bus;
    use crate::sim::engine::Engine;
    use crate::sim::power_source::FixedCRate;
    use crate::sim::types::{EngineSettings, OperatingCondition, OperatingMode};
    use approx::assert_relative_eq;

    fn run_with(modes: &[OperatingMode]) -> SimulationRun {
        let mut engine = Engine::new(
            Bus::new("kpi", 300.0, 0.5),
            AgingModel::default(),
            EngineSettings::default(),
            FixedCRate,
        );
        let conds = modes
            .iter()
            .enumerate()
            .map(|(i, &m)| OperatingCondition::new(i as f64 * 0.1, 25.0, m));
        engine.run(conds).unwrap()
    }

    #[test]
    fn seed_only_run_reports_pristine_pack() {
        let summary = RunSummary::from_run(&run_with(&[OperatingMode::Idle]));
        assert_eq!(summary.steps, 0);
        assert_eq!(summary.evaluations, 0);
        assert_eq!(summary.final_soh, 100.0);
        assert_eq!(summary.capacity_loss_percent, 0.0);
        assert_eq!(summary.sei_loss, 0.0);
    }

    #[test]
    fn loss_percent_matches_soh() {
        let modes: Vec<_> = (0..500)
            .map(|i| {
                if i % 3 == 0 {
                    OperatingMode::Charging
                } else {
                    OperatingMode::Discharging
                }
            })
            .collect();
        let summary = RunSummary::from_run(&run_with(&modes));
        assert_eq!(summary.steps, 499);
        assert_relative_eq!(
            summary.capacity_loss_percent,
            100.0 - summary.final_soh,
            epsilon = 1e-9
        );
        assert!(summary.total_efc > 0.0);
        assert!(summary.min_soc >= 0.3 && summary.max_soc <= 0.9);
    }

    #[test]
    fn display_lists_headline_figures() {
        let summary = RunSummary::from_run(&run_with(&[OperatingMode::Idle; 150]));
        let text = summary.to_string();
        assert!(text.contains("State of health"));
        assert!(text.contains("EFC"));
    }
}
