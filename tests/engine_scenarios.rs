//! Integration tests for the engine's reference scenarios and preconditions.

mod common;

use approx::assert_relative_eq;
use ebus_aging_sim::aging::AgingModel;
use ebus_aging_sim::sim::engine::Engine;
use ebus_aging_sim::sim::kpi::RunSummary;
use ebus_aging_sim::sim::power_source::FixedCRate;
use ebus_aging_sim::sim::types::{EngineSettings, OperatingCondition, OperatingMode, SimError};

#[test]
fn month_of_discharge_then_idle_ages_moderately() {
    let conditions = common::discharge_then_idle(7200, 0.1, 20);
    let run = common::default_engine().run(conditions).unwrap();

    assert_eq!(run.history().len(), 7200);
    let last = run.final_state();
    assert!(last.soh > 95.0 && last.soh < 100.0, "soh = {}", last.soh);
    // Discharge stops at the window floor and stays there while idle.
    assert_relative_eq!(last.soc, 0.3, epsilon = 1e-12);

    common::assert_capacity_monotonic(run.history());
    common::assert_soh_consistent(run.history(), 300.0);
    common::assert_within_window(run.history(), 0.3, 0.9);
}

#[test]
fn single_sample_yields_seed_only() {
    let run = common::default_engine()
        .run(vec![OperatingCondition::new(0.0, 25.0, OperatingMode::Idle)])
        .unwrap();
    assert_eq!(run.history().len(), 1);
    assert_eq!(run.final_state(), run.initial_state());
    assert_eq!(run.final_state().soh, 100.0);

    let summary = RunSummary::from_run(&run);
    assert_eq!(summary.steps, 0);
    assert_eq!(summary.evaluations, 0);
    assert_eq!(summary.capacity_loss_percent, 0.0);
}

#[test]
fn decreasing_timestamp_is_a_precondition_error() {
    let mut conditions = common::discharge_then_idle(50, 0.1, 10);
    conditions[30].time_hours = 1.0;
    match common::default_engine().run(conditions) {
        Err(SimError::NonMonotonicTime { index, .. }) => assert_eq!(index, 30),
        other => panic!("expected NonMonotonicTime, got {other:?}"),
    }
}

#[test]
fn empty_sequence_is_a_precondition_error() {
    assert_eq!(
        common::default_engine().run(Vec::new()).unwrap_err(),
        SimError::EmptyConditions
    );
}

#[test]
fn evaluation_history_tracks_final_state() {
    let run = common::default_engine()
        .run(common::discharge_then_idle(1000, 0.1, 20))
        .unwrap();
    let evaluations = run.evaluations();
    assert!(!evaluations.is_empty());
    for pair in evaluations.windows(2) {
        assert!(pair[1].total_loss >= pair[0].total_loss);
        assert!(pair[1].capacity <= pair[0].capacity);
    }
    let last = evaluations.last().unwrap();
    assert_relative_eq!(last.capacity, run.final_state().capacity, epsilon = 1e-12);
}

#[test]
fn full_loss_ceiling_is_rejected() {
    let mut engine = Engine::new(
        common::default_bus(),
        AgingModel::default(),
        EngineSettings {
            loss_ceiling: 1.0,
            ..EngineSettings::default()
        },
        FixedCRate,
    );
    assert_eq!(engine.settings().loss_ceiling, 1.0);
    assert_eq!(
        engine.run(common::discharge_then_idle(10, 0.1, 5)).unwrap_err(),
        SimError::InvalidLossCeiling(1.0)
    );
}

#[test]
fn hot_storage_at_high_ceiling_keeps_soc_finite() {
    // Two decades at 60 °C push the loss toward the ceiling.
    let mut engine = Engine::new(
        common::default_bus(),
        AgingModel::default(),
        EngineSettings {
            loss_ceiling: 0.99,
            ..EngineSettings::default()
        },
        FixedCRate,
    );
    let conditions: Vec<_> = (0..20_000)
        .map(|i| {
            let mode = if i % 2 == 0 {
                OperatingMode::Discharging
            } else {
                OperatingMode::Charging
            };
            OperatingCondition::new(i as f64 * 10.0, 60.0, mode)
        })
        .collect();
    let run = engine.run(conditions).unwrap();

    let nominal = engine.bus().nominal_capacity_ah;
    for s in run.history() {
        assert!(s.soc.is_finite() && s.capacity.is_finite());
        assert!(s.capacity >= nominal * 0.01 - 1e-9);
    }
    common::assert_within_window(run.history(), 0.3, 0.9);
    common::assert_capacity_monotonic(run.history());
}
