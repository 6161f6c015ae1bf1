//! CSV export for state history, aging evaluations, and lab sweep rows.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::battery::BatteryState;
use crate::sim::engine::AgingEvaluation;
use crate::validation::SweepRow;

/// Column header for state history export.
pub const HISTORY_HEADER: &str = "time_hours,soc,voltage_v,current_a,temperature_c,\
                                  cycle_count,ah_throughput,calendar_age_days,\
                                  capacity_ah,soh_percent,avg_dod";

/// Column header for aging evaluation export.
pub const EVALUATION_HEADER: &str = "step,time_hours,temperature_c,avg_soc,dod,efc,\
                                     calendar_loss,sei_loss,active_material_loss,\
                                     total_loss,capacity_ah,soh_percent";

/// Column header for lab sweep export.
pub const SWEEP_HEADER: &str = "kind,test_no,dod_percent,soc_percent,c_rate,temperature_c,\
                                duration_days,expected_aging,final_efc,\
                                capacity_loss_percent,final_soh";

/// Picks the history rows to persist: the seed, the first state at or after
/// every multiple of `save_interval_hours`, and the final state.
///
/// A non-positive interval keeps every state.
pub fn downsample(history: &[BatteryState], save_interval_hours: f64) -> Vec<&BatteryState> {
    if save_interval_hours <= 0.0 {
        return history.iter().collect();
    }
    let mut rows = Vec::new();
    let mut next_save = 0.0;
    for state in history {
        if state.time_hours >= next_save {
            rows.push(state);
            while next_save <= state.time_hours {
                next_save += save_interval_hours;
            }
        }
    }
    if let Some(last) = history.last() {
        if rows.last().is_none_or(|kept| !std::ptr::eq(*kept, last)) {
            rows.push(last);
        }
    }
    rows
}

/// Exports the state history to a CSV file, down-sampled by `save_interval_hours`.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_history_csv(
    history: &[BatteryState],
    save_interval_hours: f64,
    path: &Path,
) -> io::Result<()> {
    let file = File::create(path)?;
    write_history_csv(history, save_interval_hours, io::BufWriter::new(file))
}

/// Writes the down-sampled state history as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_history_csv(
    history: &[BatteryState],
    save_interval_hours: f64,
    writer: impl Write,
) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HISTORY_HEADER.split(',').map(str::trim))?;

    for s in downsample(history, save_interval_hours) {
        wtr.write_record(&[
            format!("{:.3}", s.time_hours),
            format!("{:.6}", s.soc),
            format!("{:.2}", s.voltage),
            format!("{:.3}", s.current),
            format!("{:.2}", s.temperature),
            format!("{:.4}", s.cycle_count),
            format!("{:.3}", s.total_ah_throughput),
            format!("{:.4}", s.calendar_age_days),
            format!("{:.4}", s.capacity),
            format!("{:.4}", s.soh),
            format!("{:.4}", s.avg_dod),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports aging evaluations to a CSV file.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_evaluations_csv(evaluations: &[AgingEvaluation], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_evaluations_csv(evaluations, io::BufWriter::new(file))
}

/// Writes aging evaluations as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_evaluations_csv(evaluations: &[AgingEvaluation], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(EVALUATION_HEADER.split(',').map(str::trim))?;

    for e in evaluations {
        wtr.write_record(&[
            e.step.to_string(),
            format!("{:.3}", e.time_hours),
            format!("{:.2}", e.temperature),
            format!("{:.4}", e.avg_soc),
            format!("{:.4}", e.dod),
            format!("{:.4}", e.efc),
            format!("{:.6e}", e.calendar_loss),
            format!("{:.6e}", e.cyclic_loss.sei),
            format!("{:.6e}", e.cyclic_loss.active_material),
            format!("{:.6e}", e.total_loss),
            format!("{:.4}", e.capacity),
            format!("{:.4}", e.soh),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports lab sweep rows to a CSV file.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_sweep_csv(rows: &[SweepRow], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_sweep_csv(rows, io::BufWriter::new(file))
}

/// Writes lab sweep rows as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_sweep_csv(rows: &[SweepRow], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(SWEEP_HEADER.split(',').map(str::trim))?;

    for r in rows {
        wtr.write_record(&[
            r.kind.to_string(),
            r.test_no.to_string(),
            format!("{:.1}", r.dod * 100.0),
            format!("{:.1}", r.soc * 100.0),
            format!("{:.2}", r.c_rate),
            format!("{:.1}", r.temperature_c),
            format!("{:.2}", r.duration_days),
            r.expected.map(|e| e.to_string()).unwrap_or_default(),
            format!("{:.2}", r.final_efc),
            format!("{:.4}", r.capacity_loss_percent),
            format!("{:.4}", r.final_soh),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aging::CyclicLoss;
    use crate::battery::Bus;
    use crate::validation::{ExpectedAging, SweepKind};

    fn history(n: usize, dt: f64) -> Vec<BatteryState> {
        let seed = BatteryState::seed(&Bus::default(), 25.0);
        (0..n)
            .map(|i| BatteryState {
                time_hours: i as f64 * dt,
                ..seed
            })
            .collect()
    }

    fn lines(buf: &[u8]) -> Vec<String> {
        String::from_utf8_lossy(buf).lines().map(str::to_string).collect()
    }

    #[test]
    fn history_header_matches_constant() {
        let mut buf = Vec::new();
        write_history_csv(&history(3, 1.0), 0.0, &mut buf).unwrap();
        let expected: Vec<&str> = HISTORY_HEADER.split(',').map(str::trim).collect();
        assert_eq!(lines(&buf)[0], expected.join(","));
    }

    #[test]
    fn zero_interval_keeps_every_state() {
        let h = history(25, 0.1);
        assert_eq!(downsample(&h, 0.0).len(), 25);
    }

    #[test]
    fn downsample_keeps_interval_rows_and_final_state() {
        // 0.0 .. 2.4 h at 0.1 h; one row per hour plus the final state.
        let h = history(25, 0.1);
        let times: Vec<f64> = downsample(&h, 1.0).iter().map(|s| s.time_hours).collect();
        assert_eq!(times.len(), 4);
        assert_eq!(times[0], 0.0);
        assert!((times[1] - 1.0).abs() < 1e-9);
        assert!((times[2] - 2.0).abs() < 1e-9);
        assert!((times[3] - 2.4).abs() < 1e-9);
    }

    #[test]
    fn downsample_does_not_duplicate_final_row() {
        let h = history(3, 1.0);
        assert_eq!(downsample(&h, 1.0).len(), 3);
    }

    #[test]
    fn evaluation_rows_parse_back() {
        let eval = AgingEvaluation {
            step: 100,
            time_hours: 10.0,
            temperature: 25.0,
            avg_soc: 0.5,
            dod: 0.4,
            efc: 1.5,
            calendar_loss: 1e-3,
            cyclic_loss: CyclicLoss {
                sei: 2e-4,
                active_material: 0.0,
            },
            total_loss: 1.2e-3,
            capacity: 299.64,
            soh: 99.88,
        };
        let mut buf = Vec::new();
        write_evaluations_csv(&[eval, eval], &mut buf).unwrap();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        assert_eq!(rdr.headers().map(csv::StringRecord::len).unwrap(), 12);
        let records: Vec<_> = rdr.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        let total: f64 = records[0][9].parse().unwrap();
        assert!((total - 1.2e-3).abs() < 1e-12);
    }

    #[test]
    fn sweep_rows_leave_expected_blank_for_calendar() {
        let row = |kind, expected| SweepRow {
            kind,
            test_no: 1,
            dod: 0.8,
            soc: 0.5,
            c_rate: 0.5,
            temperature_c: 23.0,
            duration_days: 10.0,
            expected,
            final_efc: 200.0,
            capacity_loss_percent: 4.2,
            final_soh: 95.8,
        };
        let mut buf = Vec::new();
        write_sweep_csv(
            &[
                row(SweepKind::Cyclic, Some(ExpectedAging::LliLam)),
                row(SweepKind::Calendar, None),
            ],
            &mut buf,
        )
        .unwrap();
        let out = lines(&buf);
        assert_eq!(out.len(), 3);
        assert!(out[1].starts_with("cyclic,1,80.0,50.0"));
        assert!(out[1].contains("LLI+LAM"));
        assert!(out[2].contains(",23.0,10.00,,200.00,"));
    }
}
