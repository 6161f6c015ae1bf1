//! Two-rate battery stepping loop: a fast electrical update on every sample
//! and a slow aging evaluation on a fixed cadence.

use tracing::{debug, info};

use crate::aging::{AgingModel, CyclicLoss};
use crate::battery::{BatteryState, Bus};
use crate::conditions::{ConditionSource, IterSource, SocProbe};

use super::power_source::{PowerSource, StepContext};
use super::types::{EngineSettings, OperatingCondition, SimError};
use super::window::SocHistory;

/// One slow-loop aging evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgingEvaluation {
    /// Sample index the evaluation was taken at.
    pub step: usize,
    pub time_hours: f64,
    /// Temperature the losses were evaluated at (°C).
    pub temperature: f64,
    /// Mean SoC over the trailing window.
    pub avg_soc: f64,
    /// Depth of discharge over the trailing window.
    pub dod: f64,
    /// Equivalent full cycles to date.
    pub efc: f64,
    pub calendar_loss: f64,
    pub cyclic_loss: CyclicLoss,
    /// Lifetime loss applied to capacity after clamping and ratcheting.
    pub total_loss: f64,
    pub capacity: f64,
    pub soh: f64,
}

/// Output of a completed run: the state history and the aging evaluations.
///
/// The history always holds at least the seed state.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    history: Vec<BatteryState>,
    evaluations: Vec<AgingEvaluation>,
    nominal_capacity: f64,
}

impl SimulationRun {
    /// One state per consumed sample; index 0 is the seed.
    pub fn history(&self) -> &[BatteryState] {
        &self.history
    }

    pub fn evaluations(&self) -> &[AgingEvaluation] {
        &self.evaluations
    }

    pub fn nominal_capacity(&self) -> f64 {
        self.nominal_capacity
    }

    pub fn initial_state(&self) -> &BatteryState {
        &self.history[0]
    }

    pub fn final_state(&self) -> &BatteryState {
        &self.history[self.history.len() - 1]
    }
}

/// Battery simulation engine.
///
/// Generic over `P: PowerSource` for static dispatch; the strategy decides
/// how a sample moves the state of charge, the engine owns timing, aging,
/// and bookkeeping.
///
/// # Examples
///
/// ```
/// use ebus_aging_sim::aging::AgingModel;
/// use ebus_aging_sim::battery::Bus;
/// use ebus_aging_sim::sim::engine::Engine;
/// use ebus_aging_sim::sim::power_source::FixedCRate;
/// use ebus_aging_sim::sim::types::{EngineSettings, OperatingCondition, OperatingMode};
///
/// let mut engine = Engine::new(
///     Bus::new("demo", 300.0, 0.5),
///     AgingModel::default(),
///     EngineSettings::default(),
///     FixedCRate,
/// );
/// let conditions = (0..=200)
///     .map(|i| OperatingCondition::new(i as f64 * 0.1, 25.0, OperatingMode::Idle));
/// let run = engine.run(conditions).unwrap();
/// assert_eq!(run.history().len(), 201);
/// assert!(run.final_state().soh < 100.0);
/// ```
pub struct Engine<P: PowerSource> {
    bus: Bus,
    model: AgingModel,
    settings: EngineSettings,
    power: P,
}

impl<P: PowerSource> Engine<P> {
    /// Creates a new engine.
    ///
    /// # Arguments
    ///
    /// * `bus` - Static vehicle and pack configuration
    /// * `model` - Aging model with its parameter set
    /// * `settings` - SoC window, evaluation cadence, and DoD policy
    /// * `power` - Fast-loop power strategy
    pub fn new(bus: Bus, model: AgingModel, settings: EngineSettings, power: P) -> Self {
        Self {
            bus,
            model,
            settings,
            power,
        }
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Name of the fast-loop strategy.
    pub fn power_name(&self) -> &'static str {
        self.power.name()
    }

    /// Runs over a finite, pre-built condition sequence.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] on any precondition violation; no partial
    /// history is returned.
    pub fn run<I>(&mut self, conditions: I) -> Result<SimulationRun, SimError>
    where
        I: IntoIterator<Item = OperatingCondition>,
    {
        self.run_source(&mut IterSource(conditions.into_iter()))
    }

    /// Runs over a lazily produced sequence, exposing the current state of
    /// charge to the source through a [`SocProbe`] at every pull.
    ///
    /// # Errors
    ///
    /// Same as [`Self::run`].
    pub fn run_source<S>(&mut self, source: &mut S) -> Result<SimulationRun, SimError>
    where
        S: ConditionSource + ?Sized,
    {
        self.check_preconditions()?;

        // The seed temperature comes from the first sample, so the first
        // pull sees a provisional beginning-of-life state.
        let provisional = BatteryState::seed(&self.bus, f64::NAN);
        let first = source
            .next_condition(SocProbe::new(&provisional))
            .ok_or(SimError::EmptyConditions)?;
        if !first.time_hours.is_finite() {
            return Err(SimError::NonFiniteTime { index: 0 });
        }

        let start_time = first.time_hours;
        let mut state = BatteryState::seed(&self.bus, first.ambient_temp);
        let mut history = vec![state];
        let mut evaluations = Vec::new();
        let mut window = SocHistory::new(self.settings.averaging_window);
        window.push(state.soc);

        info!(
            bus = %self.bus.id,
            strategy = self.power.name(),
            capacity_ah = self.bus.nominal_capacity_ah,
            initial_soc = self.bus.initial_soc,
            "starting battery simulation"
        );

        let interval = self.settings.evaluation_interval;
        let mut previous_time = first.time_hours;
        let mut lifetime_loss = 0.0;
        let mut step = 0usize;
        let mut evaluated_last = true;

        while let Some(condition) = source.next_condition(SocProbe::new(&state)) {
            step += 1;
            let time = condition.time_hours;
            if !time.is_finite() {
                return Err(SimError::NonFiniteTime { index: step });
            }
            if time <= previous_time {
                return Err(SimError::NonMonotonicTime {
                    index: step,
                    previous: previous_time,
                    current: time,
                });
            }
            let dt_hours = time - previous_time;

            let power_step = self.power.advance(&StepContext {
                state: &state,
                condition: &condition,
                dt_hours,
                bus: &self.bus,
                soc_window: self.settings.soc_window,
            });

            let elapsed = time - start_time;
            state = BatteryState {
                time_hours: elapsed,
                soc: power_step.soc,
                voltage: self.bus.voltage_at(power_step.soc),
                current: power_step.current,
                temperature: condition.ambient_temp,
                total_ah_throughput: state.total_ah_throughput + power_step.current.abs() * dt_hours,
                calendar_age_days: elapsed / 24.0,
                ..state
            };
            window.push(state.soc);

            evaluated_last = step % interval == 0;
            if evaluated_last {
                let evaluation = self.evaluate(&mut state, &window, step, &mut lifetime_loss);
                evaluations.push(evaluation);
            }

            history.push(state);
            previous_time = time;
        }

        // Final sample off the cadence still gets an up-to-date aging figure.
        if !evaluated_last {
            let evaluation = self.evaluate(&mut state, &window, step, &mut lifetime_loss);
            evaluations.push(evaluation);
            if let Some(last) = history.last_mut() {
                *last = state;
            }
        }

        info!(
            steps = step,
            soh = state.soh,
            efc = state.cycle_count,
            calendar_days = state.calendar_age_days,
            "simulation complete"
        );

        Ok(SimulationRun {
            history,
            evaluations,
            nominal_capacity: self.bus.nominal_capacity_ah,
        })
    }

    fn check_preconditions(&self) -> Result<(), SimError> {
        let capacity = self.bus.nominal_capacity_ah;
        if !(capacity.is_finite() && capacity > 0.0) {
            return Err(SimError::NonPositiveCapacity(capacity));
        }
        if !(0.0..=1.0).contains(&self.bus.initial_soc) {
            return Err(SimError::InitialSocOutOfRange(self.bus.initial_soc));
        }
        self.settings.check()?;
        let window = self.settings.soc_window;
        if !window.contains(self.bus.initial_soc) {
            return Err(SimError::InitialSocOutsideWindow {
                soc: self.bus.initial_soc,
                min: window.min,
                max: window.max,
            });
        }
        Ok(())
    }

    /// Slow loop: recomputes lifetime loss and writes capacity, SoH, EFC,
    /// and DoD into `state`.
    ///
    /// Lifetime loss is clamped to the ceiling and never allowed to fall
    /// below the previous evaluation, so capacity only decreases.
    fn evaluate(
        &self,
        state: &mut BatteryState,
        window: &SocHistory,
        step: usize,
        lifetime_loss: &mut f64,
    ) -> AgingEvaluation {
        let nominal = self.bus.nominal_capacity_ah;
        let avg_soc = window.mean().unwrap_or(state.soc);
        let dod = window.depth_of_discharge(self.settings.dod_method);
        let efc = state.total_ah_throughput / (2.0 * nominal);

        let calendar_loss =
            self.model
                .calculate_calendar_aging(state.time_hours, state.temperature, avg_soc);
        let cyclic_loss = self
            .model
            .cyclic_breakdown(efc, state.temperature, avg_soc, dod);

        let raw = calendar_loss + cyclic_loss.total();
        let total_loss = raw.clamp(0.0, self.settings.loss_ceiling).max(*lifetime_loss);
        *lifetime_loss = total_loss;

        state.capacity = nominal * (1.0 - total_loss);
        state.soh = 100.0 * state.capacity / nominal;
        state.cycle_count = efc;
        state.avg_dod = dod;

        debug!(
            step,
            time_hours = state.time_hours,
            avg_soc,
            dod,
            efc,
            calendar_loss,
            sei = cyclic_loss.sei,
            active_material = cyclic_loss.active_material,
            soh = state.soh,
            "aging evaluation"
        );

        AgingEvaluation {
            step,
            time_hours: state.time_hours,
            temperature: state.temperature,
            avg_soc,
            dod,
            efc,
            calendar_loss,
            cyclic_loss,
            total_loss,
            capacity: state.capacity,
            soh: state.soh,
        }
    }
}
