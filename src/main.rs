use std::{
    error::Error,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use clap::Parser;
use crossbeam_channel::{bounded, Receiver};
use rtrb::RingBuffer;
use spectrum_slurper::{
    capture::RingSource,
    exfil::{ChannelSink, TraceFile},
    AcquisitionMode, Pipeline, Trace, TraceSink,
};
use tracing::{info, trace, warn};

mod args;
mod simulator;

use args::{convert_filter, Args};
use simulator::Simulator;

// How often we dump the pipeline counters
const SUMMARY_PERIOD: Duration = Duration::from_secs(5);

/// Log each trace as it arrives and optionally dump it to disk
fn display(receiver: Receiver<Trace>, output: Option<PathBuf>) {
    let mut file = match output.as_deref().map(TraceFile::create_in).transpose() {
        Ok(Some((sink, path))) => {
            info!("Writing traces to {}", path.display());
            Some(sink)
        }
        Ok(None) => None,
        Err(e) => {
            warn!("Can't create trace file, continuing without: {e}");
            None
        }
    };
    for trace in receiver {
        if let Some((freq, dbm)) = trace.peak() {
            info!(
                bins = trace.spectrum.len(),
                center_mhz = trace.center_freq_hz / 1e6,
                span_mhz = trace.span_hz / 1e6,
                "Peak {dbm:.1} dBm at {:.3} MHz",
                freq / 1e6
            );
        }
        if let Some(sink) = file.as_mut() {
            sink.update(
                &trace.spectrum,
                trace.center_freq_hz,
                trace.span_hz,
                trace.step_scale_factor,
            );
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(convert_filter(args.verbose.log_level_filter()))
        .init();

    let config = args.pipeline_config();
    info!(
        mode = ?config.mode,
        band = ?config.band,
        span_mhz = config.span_hz / 1e6,
        "Starting spectrum pipeline"
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || r.store(false, Ordering::SeqCst))?;

    // Simulated receiver on its own thread, feeding packets through the ring
    let (producer, consumer) = RingBuffer::new(args.capacity);
    let plan = match config.mode {
        AcquisitionMode::Sweep(plan) => Some(plan),
        AcquisitionMode::Single => None,
    };
    // Park a carrier a quarter of the way into the range
    let carrier_hz = args.start * 1e6 + config.span_hz / 4.0;
    let sim = Simulator::new(args.points, plan, config.center_freq_hz, carrier_hz);
    let sim_running = running.clone();
    let sim_handle = thread::spawn(move || sim.run(producer, sim_running));

    let (tx, rx) = bounded(16);
    let output = args.output.clone();
    let display_handle = thread::spawn(move || display(rx, output));

    let mut source = RingSource::new(consumer);
    let mut sink = ChannelSink::new(tx);
    let mut pipeline = Pipeline::new();
    let tick = Duration::from_millis(args.tick_ms);
    let mut last_summary = Instant::now();

    while running.load(Ordering::SeqCst) {
        let started = Instant::now();
        if let Err(e) = pipeline.tick(&config, &mut source, &mut sink) {
            trace!("Tick failed: {e}");
        }
        if last_summary.elapsed() >= SUMMARY_PERIOD {
            pipeline.stats().log_summary();
            last_summary = Instant::now();
        }
        if let Some(rest) = tick.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }

    info!("Shutting down");
    // Hang up on the display so it drains and exits
    drop(sink);
    if sim_handle.join().is_err() {
        warn!("Simulator thread panicked");
    }
    if display_handle.join().is_err() {
        warn!("Display thread panicked");
    }
    pipeline.stats().log_summary();
    Ok(())
}
