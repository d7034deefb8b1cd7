//! Argument parsing for running from the command line

use std::path::PathBuf;

use clap::{ArgEnum, Parser};
use spectrum_slurper::{
    sweep::needs_sweep, AcquisitionMode, AverageMode, Band, PipelineConfig, SweepPlan,
};

#[derive(ArgEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BandArg {
    /// 100 MHz symmetric pass-band
    Full,
    /// 45 MHz upper-half pass-band
    Half,
}

#[derive(ArgEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AverageArg {
    /// Average linear power, then convert to dBm
    Power,
    /// Average dBm values directly
    Log,
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Start of the displayed range (MHz)
    #[clap(long, default_value_t = 2400.0)]
    pub start: f64,
    /// End of the displayed range (MHz). Ranges wider than the band sweep.
    #[clap(long, default_value_t = 2480.0)]
    pub stop: f64,
    /// Receiver pass-band
    #[clap(short, long, arg_enum, default_value_t = BandArg::Full)]
    pub band: BandArg,
    /// Samples per capture
    #[clap(short = 'n', long, default_value_t = 1024)]
    #[clap(value_parser = valid_points)]
    pub points: usize,
    /// Captures averaged into one trace (single-capture mode only)
    #[clap(long, default_value_t = 1)]
    #[clap(value_parser = clap::value_parser!(u16).range(1..=64))]
    pub packets: u16,
    /// Averaging domain
    #[clap(long, arg_enum, default_value_t = AverageArg::Power)]
    pub average: AverageArg,
    /// Receiver ADC dynamic range (dB)
    #[clap(long, default_value_t = 72.5)]
    pub adc_dynamic_range: f64,
    /// Pipeline tick period (ms)
    #[clap(long, default_value_t = 50)]
    pub tick_ms: u64,
    /// Packet ring buffer capacity
    #[clap(short, long, default_value_t = 256)]
    pub capacity: usize,
    /// Directory to dump raw traces into
    #[clap(short, long)]
    pub output: Option<PathBuf>,
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,
}

impl Args {
    pub fn band(&self) -> Band {
        match self.band {
            BandArg::Full => Band::Full,
            BandArg::Half => Band::Half,
        }
    }

    pub fn span_hz(&self) -> f64 {
        (self.stop - self.start) * 1e6
    }

    /// Build the acquisition settings the pipeline runs with
    pub fn pipeline_config(&self) -> PipelineConfig {
        let band = self.band();
        let (start_hz, stop_hz) = (self.start * 1e6, self.stop * 1e6);
        let span_hz = self.span_hz();
        let mode = if needs_sweep(span_hz, band) {
            AcquisitionMode::Sweep(SweepPlan::covering(start_hz, stop_hz, band))
        } else {
            AcquisitionMode::Single
        };
        PipelineConfig {
            mode,
            band,
            center_freq_hz: (start_hz + stop_hz) / 2.0,
            span_hz,
            average: match self.average {
                AverageArg::Power => AverageMode::Power,
                AverageArg::Log => AverageMode::Log,
            },
            packets_per_average: self.packets as usize,
            adc_dynamic_range: self.adc_dynamic_range,
            ..Default::default()
        }
    }
}

/// Match verbosity filter with tracing subscriber log levels
pub fn convert_filter(filter: log::LevelFilter) -> tracing_subscriber::filter::LevelFilter {
    match filter {
        log::LevelFilter::Off => tracing_subscriber::filter::LevelFilter::OFF,
        log::LevelFilter::Error => tracing_subscriber::filter::LevelFilter::ERROR,
        log::LevelFilter::Warn => tracing_subscriber::filter::LevelFilter::WARN,
        log::LevelFilter::Info => tracing_subscriber::filter::LevelFilter::INFO,
        log::LevelFilter::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
        log::LevelFilter::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
    }
}

fn valid_points(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|_| "Invalid integer".to_string())?;
    if n.is_power_of_two() && (256..=32768).contains(&n) {
        Ok(n)
    } else {
        Err("Points must be a power of two between 256 and 32768".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrow_span_is_single() {
        let args = Args::parse_from(["spectrum_slurper", "--start", "2400", "--stop", "2450"]);
        let config = args.pipeline_config();
        assert_eq!(config.mode, AcquisitionMode::Single);
        assert_eq!(config.center_freq_hz, 2425e6);
    }

    #[test]
    fn test_wide_span_sweeps() {
        let args = Args::parse_from([
            "spectrum_slurper",
            "--start",
            "2000",
            "--stop",
            "2500",
            "--band",
            "half",
        ]);
        let config = args.pipeline_config();
        assert!(config.is_sweep());
        assert_eq!(config.band, Band::Half);
    }

    #[test]
    fn test_points_validation() {
        assert!(valid_points("1024").is_ok());
        assert!(valid_points("1000").is_err());
        assert!(valid_points("128").is_err());
    }
}
