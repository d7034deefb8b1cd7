//! A stand-in for the receiver so the pipeline can run without hardware.
//!
//! It tunes the way the real instrument does (fixed centre, or stepping
//! through a sweep plan) and emits a context packet followed by a data packet
//! per capture. The IQ data is a single carrier plus noise, with the DC offset
//! and quadrature skew of an imperfect mixer baked in.

use std::{
    f64::consts::PI,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use rand::prelude::*;
use spectrum_slurper::{
    capture::ContextFields,
    complex::{IqBlock, RawIq},
    Packet, SweepPlan, DEVICE_FULL_SPAN,
};
use tracing::{debug, info};

// ADC full scale we aim the carrier at
const CARRIER_COUNTS: f64 = 8000.0;
const NOISE_COUNTS: f64 = 40.0;
const DC_COUNTS: (f64, f64) = (120.0, -75.0);
const Q_GAIN: f64 = 1.06;
const Q_SKEW_RAD: f64 = 0.05;

pub struct Simulator {
    points: usize,
    plan: Option<SweepPlan>,
    center_hz: f64,
    carrier_hz: f64,
    reference_level: f64,
    rng: StdRng,
}

impl Simulator {
    pub fn new(points: usize, plan: Option<SweepPlan>, center_hz: f64, carrier_hz: f64) -> Self {
        Self {
            points,
            plan,
            center_hz,
            carrier_hz,
            reference_level: -10.0,
            rng: StdRng::from_entropy(),
        }
    }

    /// One block of raw samples as seen when tuned to `rf_freq_hz`
    pub fn capture(&mut self, rf_freq_hz: f64) -> IqBlock {
        let offset = (self.carrier_hz - rf_freq_hz) / DEVICE_FULL_SPAN;
        let raw: Vec<RawIq> = (0..self.points)
            .map(|k| {
                let phase = 2.0 * PI * offset * k as f64;
                let i = CARRIER_COUNTS * phase.cos()
                    + DC_COUNTS.0
                    + self.rng.gen_range(-NOISE_COUNTS..NOISE_COUNTS);
                let q = Q_GAIN * CARRIER_COUNTS * (phase + Q_SKEW_RAD).sin()
                    + DC_COUNTS.1
                    + self.rng.gen_range(-NOISE_COUNTS..NOISE_COUNTS);
                RawIq::new(i as i16, q as i16)
            })
            .collect();
        IqBlock::from_raw(&raw)
    }

    /// Centre frequencies of one pass
    fn tunings(&self) -> Vec<f64> {
        match self.plan {
            Some(plan) => (0..plan.steps())
                .map(|s| plan.start_hz + s as f64 * plan.step_hz)
                .collect(),
            None => vec![self.center_hz],
        }
    }

    /// Keep the ring fed until `running` drops
    pub fn run(mut self, mut producer: rtrb::Producer<Packet>, running: Arc<AtomicBool>) {
        let tunings = self.tunings();
        info!(steps = tunings.len(), points = self.points, "Simulated receiver up");
        'outer: while running.load(Ordering::Relaxed) {
            for (step, &rf) in tunings.iter().enumerate() {
                let packets = [
                    Packet::Context(ContextFields {
                        reference_level: Some(self.reference_level),
                        rf_freq_hz: Some(rf),
                        start_id: step == 0,
                    }),
                    Packet::Data(self.capture(rf)),
                ];
                for mut packet in packets {
                    // Block on a full ring, the pipeline drains one capture per tick
                    loop {
                        match producer.push(packet) {
                            Ok(()) => break,
                            Err(rtrb::PushError::Full(p)) => {
                                if !running.load(Ordering::Relaxed) {
                                    break 'outer;
                                }
                                packet = p;
                                thread::sleep(Duration::from_millis(1));
                            }
                        }
                    }
                }
                debug!(rf_mhz = rf / 1e6, "Captured step");
            }
        }
        info!("Simulated receiver stopped");
    }
}
