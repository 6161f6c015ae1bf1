//! Lab validation sweep: the cyclic test matrix and the calendar storage
//! matrix, each run as an independent lab-cell scenario.

use std::fmt;

use tracing::info;

use crate::aging::AgingPreset;
use crate::config::{BusConfig, LabConfig, ScenarioConfig};
use crate::runner::{RunError, run_scenario};

/// Aging mechanism a test is expected to trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedAging {
    /// Loss of lithium inventory (SEI growth) only.
    Lli,
    /// Lithium inventory plus active-material loss.
    LliLam,
}

impl fmt::Display for ExpectedAging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lli => "LLI",
            Self::LliLam => "LLI+LAM",
        })
    }
}

/// One row of the cyclic test matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CyclicTest {
    pub number: u32,
    pub dod: f64,
    pub soc_avg: f64,
    pub c_rate: f64,
    pub expected: ExpectedAging,
}

const fn test(number: u32, dod: f64, soc_avg: f64, c_rate: f64, expected: ExpectedAging) -> CyclicTest {
    CyclicTest {
        number,
        dod,
        soc_avg,
        c_rate,
        expected,
    }
}

/// Cyclic aging matrix: DoD 5 to 100%, average SoC 50 to 90%, 0.5C to 2C.
pub const CYCLIC_MATRIX: [CyclicTest; 13] = [
    test(1, 0.05, 0.50, 0.5, ExpectedAging::Lli),
    test(2, 0.10, 0.50, 0.5, ExpectedAging::Lli),
    test(3, 0.20, 0.50, 0.5, ExpectedAging::Lli),
    test(4, 0.40, 0.50, 0.5, ExpectedAging::Lli),
    test(5, 0.50, 0.50, 0.5, ExpectedAging::Lli),
    test(6, 0.60, 0.50, 0.5, ExpectedAging::Lli),
    test(7, 0.80, 0.50, 0.5, ExpectedAging::LliLam),
    test(8, 0.90, 0.50, 0.5, ExpectedAging::LliLam),
    test(9, 0.10, 0.70, 0.5, ExpectedAging::Lli),
    test(10, 0.10, 0.90, 0.5, ExpectedAging::Lli),
    test(11, 0.10, 0.70, 1.25, ExpectedAging::Lli),
    test(12, 0.10, 0.70, 2.0, ExpectedAging::Lli),
    test(13, 1.00, 0.50, 2.0, ExpectedAging::LliLam),
];

/// Storage SoCs of the calendar matrix.
pub const CALENDAR_SOCS: [f64; 3] = [0.5, 0.7, 0.9];
/// Chamber temperatures of the calendar matrix (°C).
pub const CALENDAR_TEMPERATURES: [f64; 2] = [23.0, 40.0];

/// Sweep-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    /// Cyclic test length (equivalent full cycles).
    pub target_efc: f64,
    /// Chamber temperature for the cyclic matrix (°C).
    pub cyclic_temperature_c: f64,
    /// Storage duration for the calendar matrix (days).
    pub calendar_days: f64,
    pub aging: AgingPreset,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            target_efc: 200.0,
            cyclic_temperature_c: 23.0,
            calendar_days: 60.0,
            aging: AgingPreset::LinearSoc,
        }
    }
}

/// Which matrix a sweep row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepKind {
    Cyclic,
    Calendar,
}

impl fmt::Display for SweepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cyclic => "cyclic",
            Self::Calendar => "calendar",
        })
    }
}

/// Outcome of one lab test.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepRow {
    pub kind: SweepKind,
    pub test_no: u32,
    /// Cycle depth; zero for storage tests.
    pub dod: f64,
    /// Average SoC (cyclic) or storage SoC (calendar).
    pub soc: f64,
    /// Cycling C-rate; zero for storage tests.
    pub c_rate: f64,
    pub temperature_c: f64,
    /// Elapsed test time (days).
    pub duration_days: f64,
    pub expected: Option<ExpectedAging>,
    pub final_efc: f64,
    pub capacity_loss_percent: f64,
    pub final_soh: f64,
}

impl fmt::Display for SweepRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<8} #{:<2} DoD={:>5.1}% SoC={:>5.1}% C={:<4} T={:>4.1}°C {:>6.1} d | \
             EFC={:>7.1} loss={:>6.3}% SoH={:>7.3}%",
            self.kind,
            self.test_no,
            self.dod * 100.0,
            self.soc * 100.0,
            self.c_rate,
            self.temperature_c,
            self.duration_days,
            self.final_efc,
            self.capacity_loss_percent,
            self.final_soh,
        )?;
        if let Some(expected) = self.expected {
            write!(f, " ({expected})")?;
        }
        Ok(())
    }
}

fn row_from(
    scenario: &ScenarioConfig,
    kind: SweepKind,
    test_no: u32,
    expected: Option<ExpectedAging>,
) -> Result<SweepRow, RunError> {
    let outcome = run_scenario(scenario)?;
    let lab = &scenario.lab;
    let (dod, soc, c_rate) = match kind {
        SweepKind::Cyclic => (lab.dod, lab.soc_avg, lab.c_rate),
        SweepKind::Calendar => (0.0, lab.storage_soc, 0.0),
    };
    let summary = &outcome.summary;
    Ok(SweepRow {
        kind,
        test_no,
        dod,
        soc,
        c_rate,
        temperature_c: lab.temperature_c,
        duration_days: summary.calendar_age_days,
        expected,
        final_efc: summary.total_efc,
        capacity_loss_percent: summary.capacity_loss_percent,
        final_soh: summary.final_soh,
    })
}

/// Scenario for one cyclic matrix test.
pub fn cyclic_scenario(test: &CyclicTest, sweep: &SweepConfig) -> ScenarioConfig {
    let mut scenario = ScenarioConfig::lab_cyclic();
    scenario.aging.preset = sweep.aging;
    scenario.lab = LabConfig {
        dod: test.dod,
        soc_avg: test.soc_avg,
        c_rate: test.c_rate,
        target_efc: sweep.target_efc,
        temperature_c: sweep.cyclic_temperature_c,
        ..scenario.lab
    };
    scenario.bus = BusConfig {
        id: format!("Cell_Cyclic_{:02}", test.number),
        initial_soc: scenario.lab.cyclic_profile().start_soc(),
        ..scenario.bus
    };
    scenario
}

/// Scenario for one calendar matrix test.
pub fn calendar_scenario(soc: f64, temperature_c: f64, sweep: &SweepConfig) -> ScenarioConfig {
    let mut scenario = ScenarioConfig::lab_calendar();
    scenario.aging.preset = sweep.aging;
    scenario.simulation.days = sweep.calendar_days;
    scenario.lab.storage_soc = soc;
    scenario.lab.temperature_c = temperature_c;
    scenario.bus.initial_soc = soc;
    scenario
}

/// Runs every cyclic matrix test in order.
///
/// # Errors
///
/// Stops at the first test whose scenario fails.
pub fn run_cyclic_matrix(sweep: &SweepConfig) -> Result<Vec<SweepRow>, RunError> {
    CYCLIC_MATRIX
        .iter()
        .map(|t| {
            info!(test = t.number, dod = t.dod, soc_avg = t.soc_avg, c_rate = t.c_rate, "cyclic test");
            row_from(
                &cyclic_scenario(t, sweep),
                SweepKind::Cyclic,
                t.number,
                Some(t.expected),
            )
        })
        .collect()
}

/// Runs every calendar matrix test, SoC-major.
///
/// # Errors
///
/// Stops at the first test whose scenario fails.
pub fn run_calendar_matrix(sweep: &SweepConfig) -> Result<Vec<SweepRow>, RunError> {
    let mut rows = Vec::with_capacity(CALENDAR_SOCS.len() * CALENDAR_TEMPERATURES.len());
    for &soc in &CALENDAR_SOCS {
        for &temperature in &CALENDAR_TEMPERATURES {
            let test_no = rows.len() as u32 + 1;
            info!(test = test_no, soc, temperature, "calendar test");
            rows.push(row_from(
                &calendar_scenario(soc, temperature, sweep),
                SweepKind::Calendar,
                test_no,
                None,
            )?);
        }
    }
    Ok(rows)
}

/// Runs the calendar matrix followed by the cyclic matrix.
///
/// # Errors
///
/// Stops at the first test whose scenario fails.
pub fn run_lab_sweep(sweep: &SweepConfig) -> Result<Vec<SweepRow>, RunError> {
    let mut rows = run_calendar_matrix(sweep)?;
    rows.extend(run_cyclic_matrix(sweep)?);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> SweepConfig {
        SweepConfig {
            target_efc: 10.0,
            calendar_days: 8.0,
            ..SweepConfig::default()
        }
    }

    #[test]
    fn matrix_spans_documented_ranges() {
        assert_eq!(CYCLIC_MATRIX.len(), 13);
        let dods: Vec<f64> = CYCLIC_MATRIX.iter().map(|t| t.dod).collect();
        assert_eq!(dods.iter().copied().fold(f64::INFINITY, f64::min), 0.05);
        assert_eq!(dods.iter().copied().fold(0.0, f64::max), 1.0);
        assert!(CYCLIC_MATRIX
            .iter()
            .filter(|t| t.expected == ExpectedAging::LliLam)
            .all(|t| t.dod > 0.6));
    }

    #[test]
    fn cyclic_scenario_starts_at_top_of_swing() {
        let s = cyclic_scenario(&CYCLIC_MATRIX[9], &quick());
        assert!((s.bus.initial_soc - 0.95).abs() < 1e-12);
        assert_eq!(s.bus.id, "Cell_Cyclic_10");
        assert!(s.validate().is_empty());
    }

    #[test]
    fn calendar_matrix_orders_soc_major() {
        let rows = run_calendar_matrix(&quick()).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[1].soc, 0.5);
        assert_eq!(rows[1].temperature_c, 40.0);
        // Hotter storage ages faster at the same SoC.
        assert!(rows[1].capacity_loss_percent > rows[0].capacity_loss_percent);
        assert_eq!(rows[5].test_no, 6);
    }

    #[test]
    fn deep_cycles_age_more_than_shallow() {
        let sweep = quick();
        let shallow = row_from(
            &cyclic_scenario(&CYCLIC_MATRIX[1], &sweep),
            SweepKind::Cyclic,
            2,
            None,
        )
        .unwrap();
        let deep = row_from(
            &cyclic_scenario(&CYCLIC_MATRIX[12], &sweep),
            SweepKind::Cyclic,
            13,
            None,
        )
        .unwrap();
        assert!(deep.capacity_loss_percent > shallow.capacity_loss_percent);
        assert!(deep.to_string().contains("cyclic"));
    }
}
