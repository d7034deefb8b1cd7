pub mod average;
pub mod band;
pub mod calibrate;
pub mod capture;
pub mod complex;
pub mod config;
pub mod error;
pub mod exfil;
pub mod f_engine;
pub mod monitoring;
pub mod pipeline;
pub mod sweep;

/// Full digitised bandwidth of the receiver (Hz)
pub const DEVICE_FULL_SPAN: f64 = 125e6;
/// dB offset between the FFT output and the reference level
pub const FFT_BASELINE: f64 = -10.0;

pub use average::{AverageMode, TraceAverager};
pub use band::Band;
pub use capture::{Capture, CaptureSource, Packet};
pub use complex::{IqBlock, IqSample};
pub use config::{AcquisitionMode, PipelineConfig};
pub use error::{CaptureError, CaptureResult};
pub use exfil::{Trace, TraceSink};
pub use f_engine::{Calibration, FEngine};
pub use pipeline::Pipeline;
pub use sweep::{StepTag, SweepAggregator, SweepPlan};
