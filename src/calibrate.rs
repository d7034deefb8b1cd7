//! Blind DC offset and quadrature imbalance correction.
//!
//! The estimator works on arbitrary signal content (no calibration tone), so
//! the correction is approximate. The arithmetic below is kept exactly as the
//! instrument's reference software computes it so that downstream golden
//! vectors stay comparable.

use crate::{
    complex::{IqBlock, IqSample},
    error::{CaptureError, CaptureResult},
};

/// Shortest block the estimator is defined for
pub const MIN_SAMPLES: usize = 2;

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn sum_of_squares(xs: &[f64]) -> f64 {
    xs.iter().map(|x| x * x).sum()
}

/// Remove DC from both channels and rotate/scale Q back into quadrature with I
pub fn calibrate(block: &IqBlock) -> CaptureResult<Vec<IqSample>> {
    let n = block.len();
    if n < MIN_SAMPLES {
        return Err(CaptureError::InvalidLength {
            len: n,
            min: MIN_SAMPLES,
        });
    }
    let mut i: Vec<f64> = block.samples().iter().map(|s| s.re).collect();
    let mut q: Vec<f64> = block.samples().iter().map(|s| s.im).collect();

    // DC offset removal
    let (i_mean, q_mean) = (mean(&i), mean(&q));
    i.iter_mut().for_each(|x| *x -= i_mean);
    q.iter_mut().for_each(|x| *x -= q_mean);

    let samples = n as f64;
    let sum_sq_i = sum_of_squares(&i);
    let sum_sq_q = sum_of_squares(&q);
    if sum_sq_q == 0.0 {
        return Err(CaptureError::DegenerateInput { channel: "Q" });
    }
    if sum_sq_i == 0.0 {
        return Err(CaptureError::DegenerateInput { channel: "I" });
    }

    let amplitude = (sum_sq_i * 2.0 / samples).sqrt();
    let ratio = (sum_sq_i / sum_sq_q).sqrt();
    let p_sum: f64 = i
        .iter()
        .zip(&q)
        .map(|(i, q)| (q / amplitude) * ratio * (i / amplitude))
        .sum();
    // Cauchy-Schwarz bounds this by 1, rounding doesn't always agree
    let sinphi = (2.0 * p_sum / samples).clamp(-1.0, 1.0);
    let phi_est = -sinphi.asin();
    let (sin_phi, cos_phi) = phi_est.sin_cos();

    Ok(i
        .iter()
        .zip(&q)
        .map(|(&i, &q)| IqSample::new(i, (sin_phi * i + ratio * q) / cos_phi))
        .collect())
}
