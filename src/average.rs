//! Averaging of consecutive single-capture traces (the video bandwidth control).

use tracing::{debug, warn};

use crate::f_engine::{to_dbm, Calibration};

/// Which domain the averaging happens in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AverageMode {
    /// Average linear FFT magnitudes, convert to dBm once per window
    Power,
    /// Average traces that are already in dBm
    Log,
}

/// Sums `packets_per_average` traces and emits their mean
#[derive(Debug)]
pub struct TraceAverager {
    mode: AverageMode,
    packets_per_average: usize,
    // Window size requested mid-window, applied when the next window opens
    pending_packets: Option<usize>,
    count: usize,
    sum: Vec<f64>,
}

impl TraceAverager {
    pub fn new(mode: AverageMode, packets_per_average: usize) -> Self {
        Self {
            mode,
            packets_per_average: packets_per_average.max(1),
            pending_packets: None,
            count: 0,
            sum: Vec::new(),
        }
    }

    pub fn mode(&self) -> AverageMode {
        self.mode
    }

    pub fn packets_per_average(&self) -> usize {
        self.packets_per_average
    }

    /// Traces accumulated in the open window
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.sum.clear();
    }

    /// Apply the current configuration.
    ///
    /// A new mode takes effect immediately and discards the open window since
    /// the two domains can't be mixed. A new window size waits for the window
    /// in progress to finish.
    pub fn configure(&mut self, mode: AverageMode, packets_per_average: usize) {
        if mode != self.mode {
            debug!(?mode, "Averaging mode changed, restarting window");
            self.mode = mode;
            self.reset();
        }
        let packets = packets_per_average.max(1);
        if packets != self.packets_per_average {
            self.pending_packets = Some(packets);
        } else {
            self.pending_packets = None;
        }
        self.open_window();
    }

    fn open_window(&mut self) {
        if self.count == 0 {
            if let Some(packets) = self.pending_packets.take() {
                self.packets_per_average = packets;
            }
        }
    }

    /// Add one trace. `trace` is linear magnitudes in `Power` mode and dBm in
    /// `Log` mode. Returns the averaged dBm trace when the window completes;
    /// `cal` is the calibration of the capture that completes it.
    pub fn push(&mut self, trace: &[f64], cal: Calibration) -> Option<Vec<f64>> {
        self.open_window();
        if self.count > 0 && trace.len() != self.sum.len() {
            warn!(
                expected = self.sum.len(),
                got = trace.len(),
                "Trace length changed mid-window, restarting average"
            );
            self.reset();
        }
        if self.count == 0 {
            self.sum.clear();
            self.sum.resize(trace.len(), 0.0);
        }
        self.sum
            .iter_mut()
            .zip(trace)
            .for_each(|(acc, x)| *acc += x);
        self.count += 1;

        if self.count < self.packets_per_average {
            return None;
        }
        let n = self.count as f64;
        let mean: Vec<f64> = self.sum.iter().map(|x| x / n).collect();
        self.reset();
        Some(match self.mode {
            AverageMode::Power => to_dbm(&mean, cal),
            AverageMode::Log => mean,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const CAL: Calibration = Calibration {
        reference_level: 0.0,
        adc_dynamic_range: 100.0,
    };

    #[test]
    fn test_power_average_of_identical_traces() {
        let mut avg = TraceAverager::new(AverageMode::Power, 2);
        let p1 = [0.5, 2.0, 10.0];
        assert_eq!(avg.push(&p1, CAL), None);
        let out = avg.push(&p1, CAL).unwrap();
        for (a, b) in out.iter().zip(to_dbm(&p1, CAL)) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
        }
        assert_eq!(avg.count(), 0);
    }

    #[test]
    fn test_log_average() {
        let mut avg = TraceAverager::new(AverageMode::Log, 2);
        assert_eq!(avg.push(&[0.0, 0.0], CAL), None);
        assert_eq!(avg.push(&[-10.0, -10.0], CAL), Some(vec![-5.0, -5.0]));
    }

    #[test]
    fn test_power_average_is_not_log_average() {
        let mut power = TraceAverager::new(AverageMode::Power, 2);
        power.push(&[1.0], CAL);
        let out = power.push(&[3.0], CAL).unwrap();
        // 20*log10(2) + offset, not the mean of 0 dB and 9.54 dB
        assert_abs_diff_eq!(out[0], 20.0 * 2f64.log10() - 90.0, epsilon = 1e-12);
    }

    #[test]
    fn test_window_of_one_passes_through() {
        let mut avg = TraceAverager::new(AverageMode::Log, 1);
        assert_eq!(avg.push(&[-42.0], CAL), Some(vec![-42.0]));
        assert_eq!(avg.push(&[-43.0], CAL), Some(vec![-43.0]));
    }

    #[test]
    fn test_window_size_change_waits_for_window() {
        let mut avg = TraceAverager::new(AverageMode::Log, 2);
        assert_eq!(avg.push(&[0.0], CAL), None);
        avg.configure(AverageMode::Log, 4);
        assert_eq!(avg.packets_per_average(), 2);
        // The open window still closes after two traces
        assert_eq!(avg.push(&[-2.0], CAL), Some(vec![-1.0]));
        assert_eq!(avg.packets_per_average(), 2);
        // The next one uses the new size
        avg.configure(AverageMode::Log, 4);
        for _ in 0..3 {
            assert_eq!(avg.push(&[-4.0], CAL), None);
        }
        assert_eq!(avg.packets_per_average(), 4);
        assert_eq!(avg.push(&[-4.0], CAL), Some(vec![-4.0]));
    }

    #[test]
    fn test_mode_change_restarts_window() {
        let mut avg = TraceAverager::new(AverageMode::Log, 2);
        avg.push(&[-10.0], CAL);
        avg.configure(AverageMode::Power, 2);
        assert_eq!(avg.count(), 0);
        assert_eq!(avg.mode(), AverageMode::Power);
    }

    #[test]
    fn test_length_change_restarts_window() {
        let mut avg = TraceAverager::new(AverageMode::Log, 2);
        avg.push(&[-10.0, -10.0], CAL);
        assert_eq!(avg.push(&[-2.0], CAL), None);
        assert_eq!(avg.push(&[-4.0], CAL), Some(vec![-3.0]));
    }
}
