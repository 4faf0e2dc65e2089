//! Event file to report and plot, through the public API only.

use minbias_core::{
    AnalysisConfig, BaselineReport, ChannelHistograms, ChannelMap, DisplayLayout, Event,
    NUM_AMPLITUDES,
};
use minbias_io::{render_report, write_report_json, EventFileWriter, EventSource, PlotOptions};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::path::Path;

fn write_run(path: &Path) -> usize {
    let mut rng = StdRng::seed_from_u64(2024);
    let noise = Normal::new(1.0, 1.5).unwrap();
    let mut writer = EventFileWriter::create(path).unwrap();
    for i in 0..6_000 {
        let mut amplitudes = [0.0; NUM_AMPLITUDES];
        for value in amplitudes.iter_mut().take(12) {
            *value = noise.sample(&mut rng);
        }
        let trigger = if i % 3 == 0 { 1 } else { 4 };
        writer.write_event(&Event::new(amplitudes, trigger)).unwrap();
    }
    writer.finish().unwrap()
}

fn run(path: &Path) -> BaselineReport {
    let config = AnalysisConfig::default();
    let map = ChannelMap::standard();
    let source = EventSource::open(path).unwrap();
    let mut histograms = ChannelHistograms::new(&config.histogram).unwrap();
    let stats = histograms
        .try_accumulate(source.events(), &map, &config.filter)
        .unwrap();
    BaselineReport::from_histograms(
        &histograms,
        stats,
        &map,
        &DisplayLayout::standard(),
        &config.fit,
    )
}

#[test]
fn test_event_file_to_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("run.mbev");
    assert_eq!(write_run(&input), 6_000);

    let report = run(&input);
    assert_eq!(report.stats.events_scanned, 6_000);
    assert_eq!(report.stats.events_selected, 4_000);
    assert_eq!(report.failed_channels(), 0);
    for threshold in report.thresholds() {
        let threshold = threshold.unwrap();
        assert!((threshold - 5.5).abs() < 0.6, "threshold {threshold}");
    }
    assert_eq!(report.to_string().lines().count(), 12);
}

#[test]
fn test_report_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("run.mbev");
    write_run(&input);
    let report = run(&input);

    let json = dir.path().join("report.json");
    write_report_json(&json, &report).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(value["stats"]["events_selected"], 4_000);

    let png = dir.path().join("CombinedPMTEnergyDistributions.png");
    let options = PlotOptions {
        width: 900,
        height: 960,
        ..PlotOptions::default()
    };
    render_report(&png, &report, &options).unwrap();
    assert!(std::fs::metadata(&png).unwrap().len() > 0);
}

#[test]
fn test_corrupt_source_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("run.mbev");
    std::fs::write(&input, b"not an event file").unwrap();
    assert!(EventSource::open(&input).is_err());
}
