#![allow(clippy::uninlined_format_args)]
use minbias_core::{
    accumulate, fit, AnalysisConfig, BaselineReport, ChannelMap, DisplayLayout, Event,
    FitFailure, NUM_AMPLITUDES, NUM_CHANNELS,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// 20k events: 15k minimum-bias with column 0 ~ N(2, 1), the rest trigger 1.
/// All other columns sit far below the histogram domain.
fn generate_run(seed: u64) -> Vec<Event> {
    let mut rng = StdRng::seed_from_u64(seed);
    let baseline = Normal::new(2.0, 1.0).unwrap();
    (0..20_000)
        .map(|i| {
            let mut amplitudes = [-50.0; NUM_AMPLITUDES];
            if i < 15_000 {
                amplitudes[0] = baseline.sample(&mut rng);
                Event::new(amplitudes, 4)
            } else {
                amplitudes[0] = 20.0;
                Event::new(amplitudes, 1)
            }
        })
        .collect()
}

#[test]
fn test_end_to_end_threshold() {
    let report = BaselineReport::from_events(
        generate_run(2024),
        &ChannelMap::standard(),
        &DisplayLayout::standard(),
        &AnalysisConfig::default(),
    )
    .unwrap();

    assert_eq!(report.stats.events_scanned, 20_000);
    assert_eq!(report.stats.events_selected, 15_000);

    let pmt1 = report.channel(0).unwrap();
    assert_eq!(pmt1.histogram.entries(), 15_000);
    let threshold = pmt1.threshold().unwrap();
    assert!((threshold - 5.0).abs() < 0.4, "threshold {}", threshold);

    for pmt in 1..NUM_CHANNELS {
        let outcome = report.channel(pmt).unwrap();
        assert_eq!(outcome.fit, Err(FitFailure::EmptyHistogram));
        assert_eq!(outcome.to_string(), format!("PMT {}: no data", pmt + 1));
    }

    let text = report.to_string();
    assert_eq!(text.lines().count(), NUM_CHANNELS);
    assert!(text.lines().any(|l| l.starts_with("PMT 1: μ + 3σ = ")));
}

#[test]
fn test_wiring_routes_column_to_slot() {
    // Slot 1 (PMT 2) is wired to readout column 10.
    let mut rng = StdRng::seed_from_u64(9);
    let noise = Normal::new(1.0, 1.5).unwrap();
    let events: Vec<Event> = (0..12_000)
        .map(|_| {
            let mut amplitudes = [100.0; NUM_AMPLITUDES];
            amplitudes[10] = noise.sample(&mut rng);
            Event::new(amplitudes, 4)
        })
        .collect();

    let histograms = accumulate(events, &ChannelMap::standard());
    assert!(histograms.channel(0).is_empty());
    assert!(histograms.channel(1).entries() > 11_900);

    let result = fit(histograms.channel(1)).unwrap();
    assert!((result.mean - 1.0).abs() < 0.3, "mean {}", result.mean);
    assert!((result.sigma - 1.5).abs() < 0.3, "sigma {}", result.sigma);
}

#[test]
fn test_one_bad_channel_does_not_block_others() {
    let mut rng = StdRng::seed_from_u64(77);
    let noise = Normal::new(0.0, 2.0).unwrap();
    let map = ChannelMap::standard();
    let events: Vec<Event> = (0..10_000)
        .map(|_| {
            let mut amplitudes = [0.0; NUM_AMPLITUDES];
            for slot in 0..NUM_CHANNELS {
                amplitudes[map.physical_index(slot)] = noise.sample(&mut rng);
            }
            // PMT 3 only ever reads a constant.
            amplitudes[map.physical_index(2)] = 4.5;
            Event::new(amplitudes, 4)
        })
        .collect();

    let report = BaselineReport::from_events(
        events,
        &map,
        &DisplayLayout::standard(),
        &AnalysisConfig::default(),
    )
    .unwrap();

    assert_eq!(report.failed_channels(), 1);
    let pmt3 = report.channel(2).unwrap();
    assert_eq!(pmt3.fit, Err(FitFailure::InsufficientBins { populated: 1 }));
    assert!(pmt3.to_string().starts_with("PMT 3: fit failed"));

    let thresholds = report.thresholds();
    for (pmt, threshold) in thresholds.iter().enumerate() {
        if pmt == 2 {
            assert!(threshold.is_none());
        } else {
            let t = threshold.unwrap();
            assert!((t - 6.0).abs() < 0.6, "PMT {} threshold {}", pmt + 1, t);
        }
    }
}
