//! Pass-band selection.
//!
//! A capture's bins span the full digitised bandwidth of the receiver, but only
//! part of it is usable. Which part depends on the receiver's filter path:
//! the full-band path passes a window symmetric about the centre, the
//! half-band path only passes (part of) the upper half of the spectrum.

use std::ops::Range;

use crate::{sweep::StepTag, DEVICE_FULL_SPAN};

/// The two pass-band geometries of the receiver
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Band {
    /// 100 MHz, symmetric about the tuned centre
    Full,
    /// 45 MHz, upper half of the spectrum only
    Half,
}

impl Band {
    /// Pass-band width in Hz
    pub fn width_hz(self) -> f64 {
        match self {
            Band::Full => 100e6,
            Band::Half => 45e6,
        }
    }
}

/// Index at a fraction of the array, truncated toward zero
fn frac_index(n: usize, frac: f64) -> isize {
    (n as f64 * frac) as isize
}

/// Clamp signed bounds into `0..=n`; an inverted range collapses to empty
fn clamped(lo: isize, hi: isize, n: usize) -> Range<usize> {
    let n = n as isize;
    let lo = lo.clamp(0, n);
    let hi = hi.clamp(lo, n);
    lo as usize..hi as usize
}

/// Bounds of the symmetric middle `ratio` of the array
fn symmetric_bounds(n: usize, ratio: f64) -> (isize, isize) {
    (
        frac_index(n, (1.0 - ratio) / 2.0),
        frac_index(n, 1.0 - (1.0 - ratio) / 2.0),
    )
}

/// Bounds of the usable upper-half window, `[first - 1, half - 1)`
fn upper_half_bounds(n: usize, ratio: f64) -> (isize, isize) {
    let half = (n / 2) as isize;
    let first = half - frac_index(n, ratio);
    (first - 1, half - 1)
}

/// Usable bins of a single capture covering `span_hz`
pub fn trace_range(n: usize, band: Band, span_hz: f64) -> Range<usize> {
    let ratio = span_hz / DEVICE_FULL_SPAN;
    let (lo, hi) = match band {
        Band::Full => symmetric_bounds(n, ratio),
        Band::Half => upper_half_bounds(n, ratio),
    };
    clamped(lo, hi, n)
}

/// Usable bins of one sweep step, given the step's position in the sweep
pub fn sweep_step_range(n: usize, band: Band, tag: &StepTag) -> Range<usize> {
    let ratio = band.width_hz() / DEVICE_FULL_SPAN;
    let rem_index = frac_index(n, tag.remaining_bandwidth / DEVICE_FULL_SPAN);
    let (lo, hi) = match band {
        Band::Full => {
            let (first, last) = symmetric_bounds(n, ratio);
            if tag.is_last_step {
                (first, rem_index.min(last))
            } else {
                (first, last)
            }
        }
        Band::Half => {
            let (lo, hi) = upper_half_bounds(n, ratio);
            if tag.is_first_step {
                (lo, hi)
            } else if tag.is_last_step {
                (lo, (lo + rem_index).min(hi))
            } else {
                // Consecutive half-band steps overlap by half a window
                (lo, lo + (hi - lo) / 2)
            }
        }
    };
    clamped(lo, hi, n)
}

/// Slice the usable pass-band out of a single capture
pub fn select_trace(data: &[f64], band: Band, span_hz: f64) -> &[f64] {
    &data[trace_range(data.len(), band, span_hz)]
}

/// Slice the new spectrum contributed by one sweep step
pub fn select_sweep_step<'a>(data: &'a [f64], band: Band, tag: &StepTag) -> &'a [f64] {
    &data[sweep_step_range(data.len(), band, tag)]
}
