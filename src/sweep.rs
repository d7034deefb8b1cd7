//! Sweep reassembly.
//!
//! In sweep mode the receiver retunes through a list of centre frequencies and
//! emits one capture per step. Each step contributes a slice of its pass-band;
//! the aggregator stitches the slices in step order and hands back the whole
//! `[start, stop]` spectrum once the last step arrives.

use num_traits::Float;
use tracing::{debug, trace};

use crate::band::{select_sweep_step, Band};

/// Where a capture sits inside the sweep
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepTag {
    pub is_first_step: bool,
    pub is_last_step: bool,
    /// Bandwidth still needed past this step's centre to reach the sweep stop (Hz)
    pub remaining_bandwidth: f64,
    /// The receiver flagged this capture as the start of a freshly programmed sweep
    pub start_id: bool,
}

/// Centre frequencies the receiver is programmed to step through
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepPlan {
    pub start_hz: f64,
    pub stop_hz: f64,
    pub step_hz: f64,
}

impl SweepPlan {
    /// Sweep entry covering the user's `[start_hz, stop_hz]` with one band per step.
    ///
    /// The half-band path only passes the upper half of each capture, so the
    /// tuned centres sit a full band above the range; the full-band path is
    /// symmetric and sits half a band above.
    pub fn covering(start_hz: f64, stop_hz: f64, band: Band) -> Self {
        let offset = match band {
            Band::Full => band.width_hz() / 2.0,
            Band::Half => band.width_hz(),
        };
        Self {
            start_hz: start_hz + offset,
            stop_hz: stop_hz + offset,
            step_hz: band.width_hz(),
        }
    }

    /// Tag a capture tuned to `rf_freq_hz`
    pub fn tag(&self, rf_freq_hz: f64) -> StepTag {
        let is_last_step = rf_freq_hz + self.step_hz > self.stop_hz || rf_freq_hz == self.stop_hz;
        StepTag {
            is_first_step: rf_freq_hz == self.start_hz,
            is_last_step,
            remaining_bandwidth: if is_last_step {
                self.stop_hz - rf_freq_hz
            } else {
                0.0
            },
            start_id: false,
        }
    }

    /// Number of captures in one pass
    pub fn steps(&self) -> usize {
        if self.step_hz <= 0.0 || self.stop_hz < self.start_hz {
            return 1;
        }
        ((self.stop_hz - self.start_hz) / self.step_hz).floor() as usize + 1
    }
}

/// Whether a requested span needs the receiver to sweep at all
pub fn needs_sweep(span_hz: f64, band: Band) -> bool {
    span_hz > band.width_hz()
}

/// Coarsening factor applied to wide sweeps before slicing
pub fn decimation_factor(span_hz: f64) -> usize {
    if span_hz > 4e9 {
        32
    } else if span_hz > 2e9 {
        16
    } else if span_hz > 1e9 {
        8
    } else {
        1
    }
}

/// Collapse consecutive groups of `factor` bins into their maximum
pub fn decimate_max<T: Float>(data: &[T], factor: usize) -> Vec<T> {
    if factor <= 1 {
        return data.to_vec();
    }
    data.chunks_exact(factor)
        .map(|chunk| chunk.iter().fold(T::neg_infinity(), |a, &b| a.max(b)))
        .collect()
}

/// What happened to a step handed to the aggregator
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    /// Appended; the pass is still open
    Accumulating,
    /// The last step closed the pass; this is the stitched spectrum
    Complete(Vec<f64>),
    /// No pass is open (we never saw its first step), so the step was dropped
    OutOfOrder,
}

/// Stitches per-step slices into one spectrum per sweep pass.
///
/// A new aggregator (or one that was reset) starts suspended: passes are
/// stitched but not handed out until a first step carries the receiver's
/// start id. Captures queued before the sweep was programmed never escape.
#[derive(Debug)]
pub struct SweepAggregator {
    buffer: Vec<f64>,
    in_pass: bool,
    suspended: bool,
}

impl Default for SweepAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepAggregator {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            in_pass: false,
            suspended: true,
        }
    }

    /// Still waiting for a first step with the start id
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Bins collected so far in the open pass
    pub fn pending(&self) -> &[f64] {
        &self.buffer
    }

    /// Forget any partial pass and wait for the next start id
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.in_pass = false;
        self.suspended = true;
    }

    /// Add an already-sliced step
    pub fn push_slice(&mut self, tag: &StepTag, slice: &[f64]) -> StepOutcome {
        if tag.is_first_step {
            if !self.buffer.is_empty() {
                debug!(
                    bins = self.buffer.len(),
                    "Sweep restarted mid-pass, dropping partial spectrum"
                );
            }
            self.buffer.clear();
            self.in_pass = true;
            if tag.start_id && self.suspended {
                debug!("Sweep start id seen, resuming output");
                self.suspended = false;
            }
        }
        if !self.in_pass {
            self.buffer.clear();
            return StepOutcome::OutOfOrder;
        }
        self.buffer.extend_from_slice(slice);
        trace!(added = slice.len(), total = self.buffer.len(), "Sweep step");
        if tag.is_last_step {
            self.in_pass = false;
            let pass = std::mem::take(&mut self.buffer);
            if self.suspended {
                debug!(bins = pass.len(), "Pass finished before start id, discarding");
                return StepOutcome::Accumulating;
            }
            StepOutcome::Complete(pass)
        } else {
            StepOutcome::Accumulating
        }
    }

    /// Decimate (for wide spans), slice and add a full step spectrum
    pub fn push_step(
        &mut self,
        tag: &StepTag,
        spectrum: &[f64],
        band: Band,
        span_hz: f64,
    ) -> StepOutcome {
        let factor = decimation_factor(span_hz);
        if factor > 1 {
            let coarse = decimate_max(spectrum, factor);
            self.push_slice(tag, select_sweep_step(&coarse, band, tag))
        } else {
            self.push_slice(tag, select_sweep_step(spectrum, band, tag))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::sweep_step_range;

    const FIRST: StepTag = StepTag {
        is_first_step: true,
        is_last_step: false,
        remaining_bandwidth: 0.0,
        start_id: true,
    };
    const MIDDLE: StepTag = StepTag {
        is_first_step: false,
        is_last_step: false,
        remaining_bandwidth: 0.0,
        start_id: false,
    };

    #[test]
    fn test_three_steps_concatenate() {
        let mut agg = SweepAggregator::new();
        let last = StepTag {
            is_last_step: true,
            remaining_bandwidth: 100e6,
            ..Default::default()
        };
        let steps: Vec<Vec<f64>> = (0..3).map(|s| vec![s as f64; 256]).collect();
        let a = sweep_step_range(256, Band::Full, &FIRST).len();
        let b = sweep_step_range(256, Band::Full, &MIDDLE).len();
        let c = sweep_step_range(256, Band::Full, &last).len();

        assert_eq!(
            agg.push_step(&FIRST, &steps[0], Band::Full, 300e6),
            StepOutcome::Accumulating
        );
        assert_eq!(
            agg.push_step(&MIDDLE, &steps[1], Band::Full, 300e6),
            StepOutcome::Accumulating
        );
        let StepOutcome::Complete(out) = agg.push_step(&last, &steps[2], Band::Full, 300e6) else {
            panic!("last step should close the pass");
        };
        assert_eq!(out.len(), a + b + c);
        assert!(out[..a].iter().all(|&x| x == 0.0));
        assert!(out[a..a + b].iter().all(|&x| x == 1.0));
        assert!(out[a + b..].iter().all(|&x| x == 2.0));
        assert!(agg.pending().is_empty());
    }

    #[test]
    fn test_last_without_first_is_dropped() {
        let mut agg = SweepAggregator::new();
        let last = StepTag {
            is_last_step: true,
            remaining_bandwidth: 50e6,
            ..Default::default()
        };
        assert_eq!(agg.push_slice(&last, &[1.0, 2.0]), StepOutcome::OutOfOrder);
        assert!(agg.pending().is_empty());
        assert_eq!(agg.push_slice(&MIDDLE, &[1.0]), StepOutcome::OutOfOrder);
        assert!(agg.pending().is_empty());
    }

    #[test]
    fn test_restart_discards_partial_pass() {
        let mut agg = SweepAggregator::new();
        agg.push_slice(&FIRST, &[1.0, 1.0]);
        agg.push_slice(&MIDDLE, &[2.0]);
        agg.push_slice(&FIRST, &[3.0]);
        assert_eq!(agg.pending(), &[3.0]);
        let last = StepTag {
            is_last_step: true,
            ..Default::default()
        };
        assert_eq!(
            agg.push_slice(&last, &[4.0]),
            StepOutcome::Complete(vec![3.0, 4.0])
        );
        // The pass is closed, a stray step must wait for the next first step
        assert_eq!(agg.push_slice(&MIDDLE, &[5.0]), StepOutcome::OutOfOrder);
    }

    #[test]
    fn test_single_step_sweep() {
        let mut agg = SweepAggregator::new();
        let only = StepTag {
            is_first_step: true,
            is_last_step: true,
            remaining_bandwidth: 0.0,
            start_id: true,
        };
        assert_eq!(
            agg.push_slice(&only, &[7.0]),
            StepOutcome::Complete(vec![7.0])
        );
    }

    #[test]
    fn test_held_until_start_id() {
        let mut agg = SweepAggregator::new();
        let stale_first = StepTag {
            start_id: false,
            ..FIRST
        };
        let last = StepTag {
            is_last_step: true,
            ..Default::default()
        };
        // A whole pass from before the sweep was programmed goes nowhere
        agg.push_slice(&stale_first, &[1.0]);
        assert_eq!(agg.push_slice(&last, &[2.0]), StepOutcome::Accumulating);
        assert!(agg.is_suspended());
        assert!(agg.pending().is_empty());

        agg.push_slice(&FIRST, &[3.0]);
        assert!(!agg.is_suspended());
        assert_eq!(
            agg.push_slice(&last, &[4.0]),
            StepOutcome::Complete(vec![3.0, 4.0])
        );
        // Later passes need no start id of their own
        agg.push_slice(&stale_first, &[5.0]);
        assert_eq!(
            agg.push_slice(&last, &[6.0]),
            StepOutcome::Complete(vec![5.0, 6.0])
        );

        agg.reset();
        assert!(agg.is_suspended());
    }

    #[test]
    fn test_decimate_max() {
        let data: Vec<f64> = vec![
            1.0, 4.0, 2.0, 3.0, //
            -5.0, -1.0, -9.0, -2.0, //
            0.0, 0.0, 0.0, 0.5, //
            8.0, 7.0, 6.0, 5.0,
        ];
        assert_eq!(decimate_max(&data, 4), vec![4.0, -1.0, 0.5, 8.0]);
        assert_eq!(decimate_max(&data, 1), data);
    }

    #[test]
    fn test_decimation_factor_thresholds() {
        assert_eq!(decimation_factor(1e9), 1);
        assert_eq!(decimation_factor(1.5e9), 8);
        assert_eq!(decimation_factor(3e9), 16);
        assert_eq!(decimation_factor(9.9e9), 32);
    }

    #[test]
    fn test_wide_sweep_is_decimated_before_slicing() {
        let mut agg = SweepAggregator::new();
        let only = StepTag {
            is_first_step: true,
            is_last_step: true,
            remaining_bandwidth: 125e6,
            start_id: true,
        };
        let StepOutcome::Complete(out) = agg.push_step(&only, &[0.0; 1024], Band::Full, 1.5e9)
        else {
            panic!("single step sweep should complete");
        };
        // 1024 / 8 = 128 bins, full-band slice of those
        assert_eq!(out.len(), sweep_step_range(128, Band::Full, &only).len());
    }

    #[test]
    fn test_step_tags() {
        let plan = SweepPlan {
            start_hz: 2050e6,
            stop_hz: 2350e6,
            step_hz: 100e6,
        };
        assert_eq!(plan.steps(), 4);
        let first = plan.tag(2050e6);
        assert!(first.is_first_step && !first.is_last_step);
        let mid = plan.tag(2150e6);
        assert_eq!(mid, StepTag::default());
        let last = plan.tag(2300e6);
        assert!(last.is_last_step && !last.is_first_step);
        assert_eq!(last.remaining_bandwidth, 50e6);
    }

    #[test]
    fn test_covering_plan() {
        let full = SweepPlan::covering(2000e6, 2400e6, Band::Full);
        assert_eq!(full.start_hz, 2050e6);
        assert_eq!(full.stop_hz, 2450e6);
        assert_eq!(full.step_hz, 100e6);
        let half = SweepPlan::covering(2000e6, 2400e6, Band::Half);
        assert_eq!(half.start_hz, 2045e6);
        assert_eq!(half.step_hz, 45e6);
        assert!(needs_sweep(400e6, Band::Full));
        assert!(!needs_sweep(80e6, Band::Full));
    }
}
