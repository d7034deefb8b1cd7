//! The F-engine turns a calibrated IQ block into a centred power spectrum.
//!
//! For each capture we
//! * multiply with a Hann window
//! * FFT and shift so the middle bin is the tuned centre frequency
//! * take magnitudes, then (optionally) scale to dBm against the reference level

use std::{collections::HashMap, f64::consts::PI, sync::Arc};

use rustfft::{Fft, FftPlanner};

use crate::{
    complex::IqSample,
    error::{CaptureError, CaptureResult},
    FFT_BASELINE,
};

/// Shortest sequence the window is defined for
pub const MIN_FFT_LEN: usize = 2;

/// Instrument constants needed to anchor a capture on the dBm scale
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
    /// Reference level reported alongside the capture (dBm)
    pub reference_level: f64,
    /// Fixed ADC dynamic range of the receiver (dB)
    pub adc_dynamic_range: f64,
}

impl Calibration {
    pub fn new(reference_level: f64, adc_dynamic_range: f64) -> Self {
        Self {
            reference_level,
            adc_dynamic_range,
        }
    }

    pub fn noise_level_offset(&self) -> f64 {
        self.reference_level - FFT_BASELINE - self.adc_dynamic_range
    }
}

/// Symmetric Hann window, zero at both ends
pub fn hann(n: usize) -> Vec<f64> {
    match n {
        0 => return Vec::new(),
        1 => return vec![1.0],
        _ => {}
    }
    let denom = (n - 1) as f64;
    (0..n)
        .map(|k| 0.5 - 0.5 * (2.0 * PI * k as f64 / denom).cos())
        .collect()
}

/// Convert linear FFT magnitudes to dBm
pub fn to_dbm(magnitudes: &[f64], cal: Calibration) -> Vec<f64> {
    let offset = cal.noise_level_offset();
    magnitudes.iter().map(|m| 20.0 * m.log10() + offset).collect()
}

/// Holds FFT plans and windows so repeated captures of one size reuse them
pub struct FEngine {
    planner: FftPlanner<f64>,
    plans: HashMap<usize, Arc<dyn Fft<f64>>>,
    windows: HashMap<usize, Vec<f64>>,
}

impl std::fmt::Debug for FEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FEngine")
            .field("planned_lengths", &self.plans.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for FEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FEngine {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            plans: HashMap::new(),
            windows: HashMap::new(),
        }
    }

    /// Windowed, centre-shifted complex spectrum
    pub fn channelize(&mut self, iq: &[IqSample]) -> CaptureResult<Vec<IqSample>> {
        let n = iq.len();
        if n < MIN_FFT_LEN {
            return Err(CaptureError::InvalidLength {
                len: n,
                min: MIN_FFT_LEN,
            });
        }
        let window = self.windows.entry(n).or_insert_with(|| hann(n));
        let mut buf: Vec<IqSample> = iq.iter().zip(window.iter()).map(|(s, w)| *s * *w).collect();
        let planner = &mut self.planner;
        let fft = self
            .plans
            .entry(n)
            .or_insert_with(|| planner.plan_fft_forward(n));
        fft.process(&mut buf);
        buf.rotate_right(n / 2);
        Ok(buf)
    }

    /// Shifted FFT magnitudes with no log scaling or offset applied
    pub fn magnitudes(&mut self, iq: &[IqSample]) -> CaptureResult<Vec<f64>> {
        Ok(self.channelize(iq)?.iter().map(|x| x.norm()).collect())
    }

    /// Power spectrum in dBm
    pub fn power_dbm(&mut self, iq: &[IqSample], cal: Calibration) -> CaptureResult<Vec<f64>> {
        Ok(to_dbm(&self.magnitudes(iq)?, cal))
    }
}
