//! minbias: PMT baseline thresholds from a minimum-bias calibration run.
//!
//! Prints one `μ + 3σ` line per PMT on stdout and writes the combined
//! diagnostic plot. Diagnostics go to stderr through `env_logger`.
//!
//! Only failures before the report is printed are fatal. A JSON or plot
//! file that cannot be written is logged and the run still succeeds.

use clap::error::ErrorKind;
use clap::Parser;
use minbias_core::{
    AnalysisConfig, BaselineReport, ChannelHistograms, ChannelMap, DisplayLayout, NUM_CHANNELS,
};
use minbias_io::{render_report, write_report_json, EventSource, PlotOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] minbias_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] minbias_core::Error),
}

/// Baseline noise thresholds for the PMT readouts of a minimum-bias run.
#[derive(Parser, Debug)]
#[command(name = "minbias")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Event store (.h5/.hdf5 table or binary event file)
    input: PathBuf,

    /// Output path of the combined plot
    #[arg(long, default_value = "CombinedPMTEnergyDistributions.png")]
    plot: PathBuf,

    /// Skip the combined plot
    #[arg(long)]
    no_plot: bool,

    /// Also write the report as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(usage_exit_code(err.kind()));
        }
    };
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Help and version requests succeed; any other parse error is a usage error.
fn usage_exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(cli: &Cli) -> Result<BaselineReport> {
    let start = Instant::now();
    let config = AnalysisConfig::default();
    config.validate()?;
    let map = ChannelMap::standard();
    let layout = DisplayLayout::standard();

    let source = EventSource::open(&cli.input)?;
    log::info!(
        "{}: {} events",
        cli.input.display(),
        source.event_count()
    );

    let mut histograms = ChannelHistograms::new(&config.histogram)?;
    let stats = histograms.try_accumulate(source.events(), &map, &config.filter)?;
    log::info!(
        "Selected {} of {} events with trigger {}",
        stats.events_selected,
        stats.events_scanned,
        config.filter.trigger_code
    );

    let report = BaselineReport::from_histograms(&histograms, stats, &map, &layout, &config.fit);
    print!("{report}");

    if let Some(path) = &cli.json {
        match write_report_json(path, &report) {
            Ok(()) => log::info!("Wrote {}", path.display()),
            Err(err) => log::error!("Failed to write {}: {err}", path.display()),
        }
    }
    if !cli.no_plot {
        if let Err(err) = render_report(&cli.plot, &report, &PlotOptions::default()) {
            log::error!("Failed to draw {}: {err}", cli.plot.display());
        }
    }

    log::info!(
        "Fitted {} of {} channels in {:.2?}",
        NUM_CHANNELS - report.failed_channels(),
        NUM_CHANNELS,
        start.elapsed()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minbias_core::{Event, NUM_AMPLITUDES};
    use minbias_io::EventFileWriter;
    use std::ffi::OsStr;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["minbias", "run.h5"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("run.h5"));
        assert_eq!(cli.plot, PathBuf::from("CombinedPMTEnergyDistributions.png"));
        assert!(!cli.no_plot);
        assert!(cli.json.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_missing_input_is_usage_error() {
        let err = Cli::try_parse_from(["minbias"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(usage_exit_code(err.kind()), 1);
    }

    #[test]
    fn test_help_exits_cleanly() {
        let err = Cli::try_parse_from(["minbias", "--help"]).unwrap_err();
        assert_eq!(usage_exit_code(err.kind()), 0);
        let err = Cli::try_parse_from(["minbias", "--version"]).unwrap_err();
        assert_eq!(usage_exit_code(err.kind()), 0);
    }

    #[test]
    fn test_run_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("run.mbev");
        let json = dir.path().join("report.json");
        let mut writer = EventFileWriter::create(&input).unwrap();
        for i in 0..50u8 {
            let mut amplitudes = [-20.0; NUM_AMPLITUDES];
            amplitudes[0] = f64::from(i % 5);
            writer.write_event(&Event::new(amplitudes, 4)).unwrap();
        }
        writer.finish().unwrap();

        let cli = Cli::try_parse_from([
            OsStr::new("minbias"),
            input.as_os_str(),
            OsStr::new("--no-plot"),
            OsStr::new("--json"),
            json.as_os_str(),
        ])
        .unwrap();
        let report = run(&cli).unwrap();
        assert_eq!(report.stats.events_selected, 50);
        assert_eq!(report.channel(0).unwrap().histogram.entries(), 50);
        assert!(report.failed_channels() >= NUM_CHANNELS - 1);
        assert!(json.exists());
    }

    #[test]
    fn test_unwritable_outputs_are_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("run.mbev");
        let missing = dir.path().join("missing");
        let json = missing.join("report.json");
        let plot = missing.join("plot.png");
        let mut writer = EventFileWriter::create(&input).unwrap();
        writer
            .write_event(&Event::new([0.0; NUM_AMPLITUDES], 4))
            .unwrap();
        writer.finish().unwrap();

        let cli = Cli::try_parse_from([
            OsStr::new("minbias"),
            input.as_os_str(),
            OsStr::new("--json"),
            json.as_os_str(),
            OsStr::new("--plot"),
            plot.as_os_str(),
        ])
        .unwrap();
        let report = run(&cli).unwrap();
        assert_eq!(report.stats.events_selected, 1);
        assert!(!json.exists());
        assert!(!plot.exists());
    }

    #[test]
    fn test_missing_input_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            OsStr::new("minbias"),
            dir.path().join("absent.mbev").as_os_str(),
            OsStr::new("--no-plot"),
        ])
        .unwrap();
        assert!(matches!(run(&cli), Err(CliError::Io(_))));
    }
}
