//! Per-tick acquisition settings.
//!
//! The controller that owns user input builds one of these and hands it to the
//! pipeline by reference every tick; the pipeline never mutates it.

use crate::{average::AverageMode, band::Band, sweep::SweepPlan};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AcquisitionMode {
    /// One capture covers the tuned span
    Single,
    /// The receiver steps through the plan, one capture per step
    Sweep(SweepPlan),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub mode: AcquisitionMode,
    pub band: Band,
    /// Centre of the displayed span (Hz)
    pub center_freq_hz: f64,
    /// Displayed span (Hz)
    pub span_hz: f64,
    pub average: AverageMode,
    pub packets_per_average: usize,
    /// Receiver ADC dynamic range (dB)
    pub adc_dynamic_range: f64,
    /// Receiver decimation, passed through to the display for axis labelling
    pub step_scale_factor: u32,
    /// Captures to poll for a reference level before giving up this tick
    pub reflevel_polls: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: AcquisitionMode::Single,
            band: Band::Full,
            center_freq_hz: 2450e6,
            span_hz: 100e6,
            average: AverageMode::Power,
            packets_per_average: 1,
            adc_dynamic_range: 72.5,
            step_scale_factor: 1,
            reflevel_polls: 8,
        }
    }
}

impl PipelineConfig {
    pub fn is_sweep(&self) -> bool {
        matches!(self.mode, AcquisitionMode::Sweep(_))
    }
}
