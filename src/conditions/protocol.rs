//! Lab-test protocols for cell-level validation runs.
//!
//! Both profiles emit [`OperatingCondition`]s carrying a [`ProtocolSetpoint`],
//! meant to be consumed with the protocol-target power model.

use crate::sim::types::{OperatingCondition, ProtocolSetpoint};

/// Cycle number tagged on preconditioning samples.
pub const PRECONDITIONING_CYCLE: i64 = -1;
/// Number of 1C full cycles run before the test matrix starts.
pub const PRECONDITIONING_CYCLES: usize = 5;
/// A characterization block runs after every this many test cycles.
pub const CHARACTERIZATION_EVERY: usize = 100;

/// Time step used for characterization blocks (hours).
const CHARACTERIZATION_STEP_HOURS: f64 = 0.1;
/// Constant-voltage tail current (C-rate, charging).
const CV_TAIL_C_RATE: f64 = -0.05;
const CV_HOURS: f64 = 0.5;
const REST_HOURS: f64 = 0.5;

/// Number of whole steps of length `dt` fitting in `hours`, at least one.
fn step_count(hours: f64, dt: f64) -> usize {
    // Absorb float noise such as 0.4 / 0.1 = 4.000000000000001.
    ((hours / dt + 1e-9).floor() as usize).max(1)
}

/// Append-only timeline of protocol samples at one ambient temperature.
struct Timeline {
    conditions: Vec<OperatingCondition>,
    time_hours: f64,
    temperature: f64,
}

impl Timeline {
    fn new(temperature: f64) -> Self {
        Self {
            conditions: Vec::new(),
            time_hours: 0.0,
            temperature,
        }
    }

    fn push(&mut self, target_soc: f64, c_rate: f64, cycle_number: i64, dt: f64) {
        self.conditions.push(OperatingCondition::from_protocol(
            self.time_hours,
            self.temperature,
            ProtocolSetpoint {
                target_soc,
                c_rate,
                cycle_number,
            },
        ));
        self.time_hours += dt;
    }

    /// Linear SoC ramp from `from` towards `to`, excluding the endpoint.
    fn ramp(&mut self, from: f64, to: f64, hours: f64, c_rate: f64, cycle: i64, dt: f64) {
        let steps = step_count(hours, dt);
        for i in 0..steps {
            let progress = i as f64 / steps as f64;
            self.push(from + (to - from) * progress, c_rate, cycle, dt);
        }
    }

    fn hold(&mut self, soc: f64, hours: f64, c_rate: f64, cycle: i64, dt: f64) {
        for _ in 0..step_count(hours, dt) {
            self.push(soc, c_rate, cycle, dt);
        }
    }

    /// Capacity check: CC charge to full, CV tail, rest, 1C discharge, rest.
    ///
    /// Returns the SoC the block ends at.
    fn capacity_check(&mut self, start_soc: f64, cycle: i64) -> f64 {
        let dt = CHARACTERIZATION_STEP_HOURS;
        if start_soc < 1.0 {
            self.ramp(start_soc, 1.0, 1.0 - start_soc, -1.0, cycle, dt);
        }
        self.hold(1.0, CV_HOURS, CV_TAIL_C_RATE, cycle, dt);
        self.hold(1.0, REST_HOURS, 0.0, cycle, dt);
        self.ramp(1.0, 0.0, 1.0, 1.0, cycle, dt);
        self.hold(0.0, REST_HOURS, 0.0, cycle, dt);
        0.0
    }
}

/// Cyclic aging test: full-window preconditioning, then repeated
/// discharge/charge swings of `dod` centred on `soc_avg` at `c_rate` until
/// `target_efc` equivalent full cycles are reached.
///
/// # Examples
///
/// ```
/// use ebus_aging_sim::conditions::CyclicProfile;
///
/// let profile = CyclicProfile::new(0.8, 0.5, 2.0, 23.0, 10.0);
/// assert!((profile.start_soc() - 0.9).abs() < 1e-12);
/// let conditions = profile.conditions();
/// assert!(conditions.windows(2).all(|w| w[1].time_hours > w[0].time_hours));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CyclicProfile {
    pub dod: f64,
    pub soc_avg: f64,
    pub c_rate: f64,
    pub temperature: f64,
    pub target_efc: f64,
    pub time_step_hours: f64,
}

impl CyclicProfile {
    pub fn new(dod: f64, soc_avg: f64, c_rate: f64, temperature: f64, target_efc: f64) -> Self {
        Self {
            dod,
            soc_avg,
            c_rate,
            temperature,
            target_efc,
            time_step_hours: 0.1,
        }
    }

    /// Lower and upper SoC of the test swing, limited to `[0, 1]`.
    pub fn soc_bounds(&self) -> (f64, f64) {
        (
            (self.soc_avg - self.dod / 2.0).max(0.0),
            (self.soc_avg + self.dod / 2.0).min(1.0),
        )
    }

    /// SoC the cell should start the test at (top of the swing).
    pub fn start_soc(&self) -> f64 {
        self.soc_bounds().1
    }

    /// SoC actually swept per half cycle once the bounds are clipped.
    pub fn swing(&self) -> f64 {
        let (soc_min, soc_max) = self.soc_bounds();
        (soc_max - soc_min).max(0.0)
    }

    /// Number of test cycles needed to reach the target EFC.
    pub fn cycles_needed(&self) -> usize {
        let swing = self.swing();
        if swing <= 0.0 {
            return 0;
        }
        (self.target_efc / swing) as usize + 1
    }

    pub fn conditions(&self) -> Vec<OperatingCondition> {
        let dt = self.time_step_hours;
        let mut timeline = Timeline::new(self.temperature);

        for _ in 0..PRECONDITIONING_CYCLES {
            timeline.ramp(1.0, 0.0, 1.0, 1.0, PRECONDITIONING_CYCLE, dt);
            timeline.ramp(0.0, 1.0, 1.0, -1.0, PRECONDITIONING_CYCLE, dt);
        }

        let (soc_min, soc_max) = self.soc_bounds();
        let swing = self.swing();
        let half_cycle_hours = swing / self.c_rate;

        for cycle in 0..self.cycles_needed() {
            let tag = cycle as i64;
            timeline.ramp(soc_max, soc_min, half_cycle_hours, self.c_rate, tag, dt);
            timeline.ramp(soc_min, soc_max, half_cycle_hours, -self.c_rate, tag, dt);

            if cycle > 0 && cycle % CHARACTERIZATION_EVERY == 0 {
                let mut soc = soc_max;
                for _ in 0..2 {
                    soc = timeline.capacity_check(soc, tag);
                }
                // Bring the cell back to the top of the swing at 1C.
                timeline.ramp(soc, soc_max, soc_max - soc, -1.0, tag, dt);
            }
        }

        tracing::debug!(
            dod = self.dod,
            soc_avg = self.soc_avg,
            c_rate = self.c_rate,
            swing,
            samples = timeline.conditions.len(),
            "generated cyclic profile"
        );
        timeline.conditions
    }
}

/// Calendar aging test: storage at a fixed SoC with a capacity check at the
/// start and every quarter of the duration.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarProfile {
    pub soc: f64,
    pub temperature: f64,
    pub duration_days: f64,
    /// Storage sample spacing (hours).
    pub storage_step_hours: f64,
}

impl CalendarProfile {
    pub fn new(soc: f64, temperature: f64, duration_days: f64) -> Self {
        Self {
            soc,
            temperature,
            duration_days,
            storage_step_hours: 1.0,
        }
    }

    pub fn conditions(&self) -> Vec<OperatingCondition> {
        let mut timeline = Timeline::new(self.temperature);
        let total_hours = self.duration_days * 24.0;
        let interval = total_hours / 4.0;
        let mut next_check = interval;

        let mut soc = timeline.capacity_check(self.soc, 0);
        timeline.ramp(soc, self.soc, 1.0, -1.0, 0, CHARACTERIZATION_STEP_HOURS);

        while timeline.time_hours < total_hours {
            timeline.push(self.soc, 0.0, 0, self.storage_step_hours);

            // No check in the final day of storage.
            if timeline.time_hours >= next_check && timeline.time_hours < total_hours - 24.0 {
                soc = timeline.capacity_check(self.soc, 0);
                timeline.ramp(soc, self.soc, 1.0, -1.0, 0, CHARACTERIZATION_STEP_HOURS);
                next_check += interval;
            }
        }

        tracing::debug!(
            soc = self.soc,
            temperature = self.temperature,
            days = self.duration_days,
            samples = timeline.conditions.len(),
            "generated calendar profile"
        );
        timeline.conditions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::types::OperatingMode;

    fn cycle_of(c: &OperatingCondition) -> i64 {
        c.protocol.map(|p| p.cycle_number).unwrap_or(i64::MIN)
    }

    #[test]
    fn step_count_tolerates_float_noise() {
        assert_eq!(step_count(0.4, 0.1), 4);
        assert_eq!(step_count(0.5, 0.1), 5);
        assert_eq!(step_count(0.01, 0.1), 1);
    }

    #[test]
    fn cyclic_starts_with_five_preconditioning_cycles() {
        let conds = CyclicProfile::new(0.5, 0.5, 1.0, 23.0, 5.0).conditions();
        let pre = conds
            .iter()
            .take_while(|c| cycle_of(c) == PRECONDITIONING_CYCLE)
            .count();
        // 1 h discharge + 1 h charge at 0.1 h steps, five times.
        assert_eq!(pre, 100);
        assert_eq!(conds[0].mode, OperatingMode::Discharging);
    }

    #[test]
    fn cyclic_swing_stays_within_bounds() {
        let profile = CyclicProfile::new(0.2, 0.5, 0.5, 23.0, 4.0);
        let (lo, hi) = profile.soc_bounds();
        let test_samples: Vec<_> = profile
            .conditions()
            .into_iter()
            .filter(|c| cycle_of(c) >= 0)
            .collect();
        assert!(!test_samples.is_empty());
        for c in test_samples {
            let target = c.protocol.map(|p| p.target_soc).unwrap_or(f64::NAN);
            assert!(target >= lo - 1e-12 && target <= hi + 1e-12);
        }
    }

    #[test]
    fn clipped_swing_sets_ramp_length_and_cycle_count() {
        // 80% DoD around 90% SoC is clipped to 50%..100%.
        let profile = CyclicProfile::new(0.8, 0.9, 1.0, 23.0, 2.0);
        assert_eq!(profile.soc_bounds(), (0.5, 1.0));
        assert_eq!(profile.swing(), 0.5);
        assert_eq!(profile.cycles_needed(), 5);

        let test_samples: Vec<_> = profile
            .conditions()
            .into_iter()
            .filter(|c| cycle_of(c) >= 0)
            .collect();
        // 0.5 h per half cycle at 0.1 h steps.
        assert_eq!(test_samples.len(), 5 * 10);
        let target = |i: usize| test_samples[i].protocol.map(|p| p.target_soc);
        assert_eq!(target(0), Some(1.0));
        assert_eq!(target(5), Some(0.5));
        assert_eq!(target(10), Some(1.0));
    }

    #[test]
    fn cyclic_adds_characterization_after_cycle_hundred() {
        let profile = CyclicProfile::new(0.1, 0.5, 1.0, 23.0, 12.0);
        assert_eq!(profile.cycles_needed(), 121);
        let cv_tail = profile
            .conditions()
            .iter()
            .filter(|c| c.protocol.is_some_and(|p| p.c_rate == CV_TAIL_C_RATE))
            .count();
        // Two capacity checks of five CV samples each.
        assert_eq!(cv_tail, 10);
    }

    #[test]
    fn calendar_holds_storage_soc() {
        let profile = CalendarProfile::new(0.7, 40.0, 8.0);
        let conds = profile.conditions();
        assert!(conds.windows(2).all(|w| w[1].time_hours > w[0].time_hours));
        let storage = conds
            .iter()
            .filter(|c| c.protocol.is_some_and(|p| p.c_rate == 0.0 && p.target_soc == 0.7))
            .count();
        assert!(storage > 150);
        let last = conds.last().map(|c| c.time_hours).unwrap_or_default();
        assert!(last < 8.0 * 24.0 + 1e-9);
    }

    #[test]
    fn calendar_checks_quarterly() {
        let conds = CalendarProfile::new(0.5, 23.0, 60.0).conditions();
        let cv_tail = conds
            .iter()
            .filter(|c| c.protocol.is_some_and(|p| p.c_rate == CV_TAIL_C_RATE))
            .count();
        // Initial check plus three in-run checks, five CV samples each.
        assert_eq!(cv_tail, 20);
    }
}
