//! In this module, we keep the runtime counters for the pipeline.
//! Every dropped capture lands in exactly one bucket so a periodic summary
//! shows where data is going.

use tracing::info;

use crate::error::CaptureError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub captures: u64,
    pub degenerate: u64,
    pub invalid_length: u64,
    pub missing_reflevel: u64,
    pub out_of_order_steps: u64,
    pub traces: u64,
}

impl Stats {
    pub fn record_error(&mut self, err: &CaptureError) {
        match err {
            CaptureError::DegenerateInput { .. } => self.degenerate += 1,
            CaptureError::InvalidLength { .. } => self.invalid_length += 1,
            CaptureError::MissingReferenceLevel { .. } => self.missing_reflevel += 1,
        }
    }

    pub fn dropped(&self) -> u64 {
        self.degenerate + self.invalid_length + self.missing_reflevel + self.out_of_order_steps
    }

    pub fn log_summary(&self) {
        info!(
            captures = self.captures,
            traces = self.traces,
            dropped = self.dropped(),
            degenerate = self.degenerate,
            invalid_length = self.invalid_length,
            missing_reflevel = self.missing_reflevel,
            out_of_order = self.out_of_order_steps,
            "Pipeline stats"
        );
    }
}
