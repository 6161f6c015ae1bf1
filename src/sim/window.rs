//! Trailing SoC ring buffer feeding the aging evaluation.

use std::collections::VecDeque;

use serde::Deserialize;

/// Minimum number of retained samples before a depth of discharge is reported.
pub const MIN_DOD_SAMPLES: usize = 10;

/// Swings smaller than this are treated as noise by cycle detection.
const MIN_CYCLE_DOD: f64 = 0.01;

/// Depth-of-discharge extraction policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DodMethod {
    /// `max(soc) - min(soc)` over the trailing window.
    #[default]
    Range,
    /// Mean depth of the discharge half-cycles found in the trailing window.
    CycleDetection,
}

/// Fixed-length trailing window of SoC samples.
///
/// Older samples are dropped once the window is full; there is no decay
/// weighting.
#[derive(Debug, Clone)]
pub struct SocHistory {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl SocHistory {
    /// Creates an empty window retaining at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, soc: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(soc);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mean SoC over the retained samples, or `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    /// Depth of discharge over the retained samples.
    ///
    /// Returns 0.0 while fewer than [`MIN_DOD_SAMPLES`] samples are held.
    pub fn depth_of_discharge(&self, method: DodMethod) -> f64 {
        if self.samples.len() < MIN_DOD_SAMPLES {
            return 0.0;
        }
        match method {
            DodMethod::Range => self.range(),
            DodMethod::CycleDetection => self.mean_cycle_depth(),
        }
    }

    fn range(&self) -> f64 {
        let (lo, hi) = self
            .samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| {
                (lo.min(s), hi.max(s))
            });
        hi - lo
    }

    fn mean_cycle_depth(&self) -> f64 {
        let mut depths = Vec::new();
        let mut discharge_start: Option<f64> = None;

        let mut iter = self.samples.iter().copied();
        let Some(mut prev) = iter.next() else {
            return 0.0;
        };
        for soc in iter {
            match discharge_start {
                None if soc < prev => discharge_start = Some(prev),
                Some(start) if soc >= prev => {
                    let depth = start - prev;
                    if depth > MIN_CYCLE_DOD {
                        depths.push(depth);
                    }
                    discharge_start = None;
                }
                _ => {}
            }
            prev = soc;
        }
        // Discharge still running at the end of the window.
        if let Some(start) = discharge_start {
            let depth = start - prev;
            if depth > MIN_CYCLE_DOD {
                depths.push(depth);
            }
        }

        if depths.is_empty() {
            0.0
        } else {
            depths.iter().sum::<f64>() / depths.len() as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn filled(values: &[f64], capacity: usize) -> SocHistory {
        let mut w = SocHistory::new(capacity);
        for &v in values {
            w.push(v);
        }
        w
    }

    #[test]
    fn evicts_oldest_sample() {
        let w = filled(&[0.1, 0.2, 0.3, 0.4], 3);
        assert_eq!(w.len(), 3);
        assert_relative_eq!(w.mean().unwrap_or_default(), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn mean_of_empty_window_is_none() {
        let w = SocHistory::new(5);
        assert!(w.is_empty());
        assert!(w.mean().is_none());
    }

    #[test]
    fn dod_needs_ten_samples() {
        let w = filled(&[0.9, 0.3, 0.9, 0.3, 0.9, 0.3, 0.9, 0.3, 0.9], 100);
        assert_eq!(w.depth_of_discharge(DodMethod::Range), 0.0);
        assert_eq!(w.depth_of_discharge(DodMethod::CycleDetection), 0.0);
    }

    #[test]
    fn range_dod_is_max_minus_min() {
        let w = filled(&[0.5, 0.6, 0.7, 0.4, 0.45, 0.5, 0.55, 0.6, 0.65, 0.7], 100);
        assert_relative_eq!(w.depth_of_discharge(DodMethod::Range), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn range_dod_forgets_evicted_extremes() {
        let mut values = vec![0.1];
        values.extend(std::iter::repeat_n(0.5, 10));
        let w = filled(&values, 10);
        assert_eq!(w.depth_of_discharge(DodMethod::Range), 0.0);
    }

    #[test]
    fn cycle_detection_averages_discharge_swings() {
        // Two discharges: 0.9 -> 0.5 (0.4) and 0.8 -> 0.6 (0.2).
        let w = filled(
            &[0.9, 0.7, 0.5, 0.6, 0.7, 0.8, 0.7, 0.6, 0.7, 0.8],
            100,
        );
        assert_relative_eq!(
            w.depth_of_discharge(DodMethod::CycleDetection),
            0.3,
            epsilon = 1e-12
        );
    }

    #[test]
    fn cycle_detection_counts_open_discharge() {
        let w = filled(
            &[0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.9, 0.8, 0.7],
            100,
        );
        assert_relative_eq!(
            w.depth_of_discharge(DodMethod::CycleDetection),
            0.2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn cycle_detection_ignores_small_ripple() {
        let w = filled(&[0.5, 0.495, 0.5, 0.495, 0.5, 0.495, 0.5, 0.495, 0.5, 0.495], 100);
        assert_eq!(w.depth_of_discharge(DodMethod::CycleDetection), 0.0);
    }
}
