//! This module is responsible for getting finished traces out of the pipeline

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use byte_slice_cast::AsByteSlice;
use chrono::{DateTime, Datelike, Timelike, Utc};
use crossbeam_channel::{Sender, TrySendError};
use tracing::{debug, warn};

/// The display contract: one call per completed trace
pub trait TraceSink {
    fn update(
        &mut self,
        spectrum: &[f64],
        center_freq_hz: f64,
        span_hz: f64,
        step_scale_factor: u32,
    );
}

impl<S: TraceSink + ?Sized> TraceSink for &mut S {
    fn update(
        &mut self,
        spectrum: &[f64],
        center_freq_hz: f64,
        span_hz: f64,
        step_scale_factor: u32,
    ) {
        (**self).update(spectrum, center_freq_hz, span_hz, step_scale_factor)
    }
}

/// A finished, frequency-labelled spectrum
#[derive(Clone, Debug, PartialEq)]
pub struct Trace {
    pub spectrum: Vec<f64>,
    pub center_freq_hz: f64,
    pub span_hz: f64,
    pub step_scale_factor: u32,
    pub timestamp: DateTime<Utc>,
}

impl Trace {
    /// Frequency of bin `idx`, with the bins spread evenly across the span
    pub fn bin_freq_hz(&self, idx: usize) -> f64 {
        let start = self.center_freq_hz - self.span_hz / 2.0;
        start + idx as f64 / self.spectrum.len() as f64 * self.span_hz
    }

    /// Strongest bin as `(frequency_hz, dbm)`
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.spectrum
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, &dbm)| (self.bin_freq_hz(idx), dbm))
    }
}

/// Sends traces to another thread, dropping them if it can't keep up
#[derive(Debug)]
pub struct ChannelSink {
    sender: Sender<Trace>,
}

impl ChannelSink {
    pub fn new(sender: Sender<Trace>) -> Self {
        Self { sender }
    }
}

impl TraceSink for ChannelSink {
    fn update(
        &mut self,
        spectrum: &[f64],
        center_freq_hz: f64,
        span_hz: f64,
        step_scale_factor: u32,
    ) {
        let trace = Trace {
            spectrum: spectrum.to_vec(),
            center_freq_hz,
            span_hz,
            step_scale_factor,
            timestamp: Utc::now(),
        };
        match self.sender.try_send(trace) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("Display behind, dropping trace"),
            Err(TrySendError::Disconnected(_)) => warn!("Display hung up"),
        }
    }
}

/// Timestamp for file names, `YYYY-MM-DD-hh:mm:ss`
pub fn file_timestamp(time: &DateTime<Utc>) -> String {
    format!(
        "{}-{:02}-{:02}-{:02}:{:02}:{:02}",
        time.year(),
        time.month(),
        time.day(),
        time.hour(),
        time.minute(),
        time.second()
    )
}

/// Trace dump on disk
pub type TraceFile = FileSink<BufWriter<File>>;

/// Appends every spectrum as raw native-endian f64s
pub struct FileSink<W: Write> {
    writer: W,
    written: usize,
}

impl TraceFile {
    /// Create `spectrum-<timestamp>.f64` in `dir`
    pub fn create_in(dir: &Path) -> io::Result<(Self, PathBuf)> {
        let path = dir.join(format!("spectrum-{}.f64", file_timestamp(&Utc::now())));
        let file = File::create(&path)?;
        Ok((Self::new(BufWriter::new(file)), path))
    }
}

impl<W: Write> FileSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Traces written so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn write_trace(&mut self, spectrum: &[f64]) -> io::Result<()> {
        self.writer.write_all(spectrum.as_byte_slice())?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TraceSink for FileSink<W> {
    fn update(&mut self, spectrum: &[f64], _: f64, _: f64, _: u32) {
        if let Err(e) = self.write_trace(spectrum) {
            warn!("Failed to write trace: {e}");
        }
    }
}
