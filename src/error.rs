//! Per-capture failure modes. None of these are fatal: the pipeline drops the
//! offending capture and carries on with its buffers untouched.

use thiserror::Error;

pub type CaptureResult<T> = Result<T, CaptureError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// One of the IQ channels carries no energy after DC removal
    #[error("degenerate IQ block: {channel} channel has zero energy")]
    DegenerateInput { channel: &'static str },

    /// Too few samples to window and transform
    #[error("IQ block of length {len} is too short (need at least {min})")]
    InvalidLength { len: usize, min: usize },

    /// No reference level arrived with any data packet within the polling window
    #[error("no reference level paired with a capture after {polls} polls")]
    MissingReferenceLevel { polls: usize },
}
