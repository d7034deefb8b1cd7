//! The per-tick driver: poll for a capture, push it through every stage, hand
//! any finished trace to the sink.
//!
//! Everything runs on the caller's thread. The aggregator and averager are
//! owned here and only touched in capture order.

use tracing::{debug, trace, warn};

use crate::{
    average::{AverageMode, TraceAverager},
    band::select_trace,
    calibrate::calibrate,
    capture::{Capture, CaptureSource},
    config::{AcquisitionMode, PipelineConfig},
    error::{CaptureError, CaptureResult},
    exfil::TraceSink,
    f_engine::{Calibration, FEngine},
    monitoring::Stats,
    sweep::{StepOutcome, StepTag, SweepAggregator, SweepPlan},
};

#[derive(Debug)]
pub struct Pipeline {
    engine: FEngine,
    sweep: SweepAggregator,
    averager: TraceAverager,
    stats: Stats,
    // Mode of the previous tick, to drop stale buffers on a switch
    last_mode: Option<AcquisitionMode>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            engine: FEngine::new(),
            sweep: SweepAggregator::new(),
            averager: TraceAverager::new(AverageMode::Power, 1),
            stats: Stats::default(),
            last_mode: None,
        }
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Poll `source` for one capture with a reference level and process it.
    ///
    /// Returns `Ok(true)` if a capture was processed, `Ok(false)` if the
    /// source had nothing for us. Capture-level failures are logged, counted
    /// and returned, but never leave a buffer half-updated.
    pub fn tick<S, K>(
        &mut self,
        config: &PipelineConfig,
        mut source: S,
        mut sink: K,
    ) -> CaptureResult<bool>
    where
        S: CaptureSource,
        K: TraceSink,
    {
        let polls = config.reflevel_polls.max(1);
        for _ in 0..polls {
            let Some(capture) = source.read_capture() else {
                return Ok(false);
            };
            if capture.reference_level.is_none() {
                trace!("Capture without reference level, polling again");
                continue;
            }
            self.process(config, capture, &mut sink)?;
            return Ok(true);
        }
        let err = CaptureError::MissingReferenceLevel { polls };
        warn!("{err}");
        self.stats.record_error(&err);
        Err(err)
    }

    /// Run one paired capture through the pipeline
    pub fn process<K: TraceSink>(
        &mut self,
        config: &PipelineConfig,
        capture: Capture,
        mut sink: K,
    ) -> CaptureResult<()> {
        let result = self.run(config, capture, &mut sink);
        if let Err(err) = &result {
            warn!("Dropping capture: {err}");
            self.stats.record_error(err);
        }
        result
    }

    fn run<K: TraceSink>(
        &mut self,
        config: &PipelineConfig,
        capture: Capture,
        sink: &mut K,
    ) -> CaptureResult<()> {
        let Some(reference_level) = capture.reference_level else {
            return Err(CaptureError::MissingReferenceLevel { polls: 0 });
        };
        self.switch_mode(config.mode);
        let cal = Calibration::new(reference_level, config.adc_dynamic_range);
        let iq = calibrate(&capture.iq)?;
        self.stats.captures += 1;

        match config.mode {
            AcquisitionMode::Single => {
                self.averager
                    .configure(config.average, config.packets_per_average);
                let spectrum = match config.average {
                    AverageMode::Power => self.engine.magnitudes(&iq)?,
                    AverageMode::Log => self.engine.power_dbm(&iq, cal)?,
                };
                let passband = select_trace(&spectrum, config.band, config.span_hz);
                if let Some(trace) = self.averager.push(passband, cal) {
                    self.emit(config, &trace, sink);
                }
            }
            AcquisitionMode::Sweep(plan) => {
                let spectrum = self.engine.power_dbm(&iq, cal)?;
                let tag = step_tag(&plan, &capture);
                match self
                    .sweep
                    .push_step(&tag, &spectrum, config.band, config.span_hz)
                {
                    StepOutcome::Accumulating => {}
                    StepOutcome::Complete(trace) => self.emit(config, &trace, sink),
                    StepOutcome::OutOfOrder => {
                        debug!(?tag, "Sweep step outside a pass, waiting for first step");
                        self.stats.out_of_order_steps += 1;
                    }
                }
            }
        }
        Ok(())
    }

    fn switch_mode(&mut self, mode: AcquisitionMode) {
        if self.last_mode.is_some_and(|last| last != mode) {
            debug!(?mode, "Acquisition mode changed, clearing buffers");
            self.sweep.reset();
            self.averager.reset();
        }
        self.last_mode = Some(mode);
    }

    fn emit<K: TraceSink>(&mut self, config: &PipelineConfig, trace: &[f64], sink: &mut K) {
        self.stats.traces += 1;
        trace!(bins = trace.len(), "Trace complete");
        sink.update(
            trace,
            config.center_freq_hz,
            config.span_hz,
            config.step_scale_factor,
        );
    }
}

/// Captures with no tuned frequency can't be placed in the sweep, treat them
/// as a middle step
fn step_tag(plan: &SweepPlan, capture: &Capture) -> StepTag {
    let tag = capture
        .rf_freq_hz
        .map(|f| plan.tag(f))
        .unwrap_or_default();
    StepTag {
        start_id: capture.start_id,
        ..tag
    }
}
