#![allow(clippy::float_cmp, clippy::cast_precision_loss)]
use approx::{assert_abs_diff_eq, assert_relative_eq};
use calosum_core::{
    CalibrationPolicy, CellSelection, DetectorConfig, EventHits, HitCollection, Subdetector,
    SubdetectorConfig,
};
use calosum_pipeline::{
    event_rng, process_events, process_events_parallel, EventInput, EventProcessor, RunConfig,
};

fn unit_config(layers: [usize; 3], cells: [usize; 3]) -> DetectorConfig {
    let policy = CalibrationPolicy::noiseless(0.0);
    DetectorConfig {
        cee: SubdetectorConfig::new("cee", layers[0], cells[0], policy),
        che: SubdetectorConfig::new("che", layers[1], cells[1], policy),
        ahcal: SubdetectorConfig::new("ahcal", layers[2], cells[2], policy),
    }
}

// Deterministic, strictly positive cell values.
fn ramp(layers: usize, cells: usize, offset: f64) -> HitCollection {
    (0..layers)
        .map(|l| {
            (0..cells)
                .map(|c| offset + (l * cells + c) as f64 * 0.125)
                .collect()
        })
        .collect()
}

fn realistic_event(config: &DetectorConfig, event_id: u64) -> EventInput {
    let mut hits = EventHits::zeroed(config);
    for detector in Subdetector::ALL {
        let sub = config.subdetector(detector);
        let collection = hits.collection_mut(&sub.collection).unwrap();
        for layer in 0..sub.layers {
            let cells = collection.layer_mut(layer).unwrap();
            // A shower core: a handful of cells with a few MIP each.
            for (i, cell) in cells.iter_mut().take(12).enumerate() {
                *cell = sub.policy.divisor * (1.0 + (i + layer) as f64 * 0.5);
            }
        }
    }
    EventInput {
        event_id,
        steps: vec![1.25; 40],
        interaction_layer: 4,
        hits,
    }
}

#[test]
fn test_single_wafer_boundary_keeps_first_cells() {
    let mut config = unit_config([1, 2, 1], [1, 10, 1]);
    config.che.selection = CellSelection::SingleWafer {
        from_layer: 1,
        cells_per_wafer: 4,
    };

    let raw = vec![1.0, 2.0, 3.0, 100.0, 200.0, 300.0, 400.0, 500.0, 600.0, 700.0];
    let hits = EventHits::zeroed(&config).with_collection("che", vec![raw.clone(), raw].into());

    let mut processor = EventProcessor::new(config).unwrap();
    processor.begin_event();
    let record = processor.end_event(&hits, &mut event_rng(0, 0, 0)).unwrap();

    let che = processor.accumulator().layer_signals(Subdetector::Che);
    // Before the boundary: the full list.
    assert_relative_eq!(che[0], 2806.0);
    // At the boundary: only cells 0..3.
    assert_relative_eq!(che[1], 6.0);
    assert_relative_eq!(record.che_total, 2812.0);
}

#[test]
fn test_noiseless_unit_calibration_is_exact_sum() {
    let config = unit_config([3, 2, 4], [5, 6, 2]);
    let cee = ramp(3, 5, 1.0);
    let che = ramp(2, 6, 2.0);
    let ahcal = ramp(4, 2, 3.0);
    let expected = [cee.raw_energy(), che.raw_energy(), ahcal.raw_energy()];

    let hits = EventHits::new()
        .with_collection("cee", cee.clone())
        .with_collection("che", che)
        .with_collection("ahcal", ahcal);

    let mut processor = EventProcessor::new(config).unwrap();
    processor.begin_event();
    let record = processor.end_event(&hits, &mut event_rng(9, 0, 9)).unwrap();

    for (layer, cells) in cee.iter().enumerate() {
        let sum: f64 = cells.iter().sum();
        assert_relative_eq!(
            processor.accumulator().layer_signals(Subdetector::Cee)[layer],
            sum
        );
    }
    assert_relative_eq!(record.cee_total, expected[0]);
    assert_relative_eq!(record.che_total, expected[1]);
    assert_relative_eq!(record.ahcal_total, expected[2]);
    assert_relative_eq!(
        record.hgcal_total,
        expected.iter().sum::<f64>(),
        max_relative = 1e-12
    );
}

#[test]
fn test_layer_lengths_fixed_when_everything_is_cut() {
    let config = DetectorConfig::default();
    let mut processor = EventProcessor::new(config.clone()).unwrap();
    let hits = EventHits::zeroed(&config);

    // No raw energy: only rare noise fluctuations pass the cut.
    for event_id in 0..3 {
        processor.begin_event();
        processor
            .end_event(&hits, &mut event_rng(11, 0, event_id))
            .unwrap();
        for detector in Subdetector::ALL {
            assert_eq!(
                processor.accumulator().layer_signals(detector).len(),
                config.subdetector(detector).layers
            );
        }
    }

    let mut quiet = config.clone();
    for detector in Subdetector::ALL {
        let sub = config.subdetector(detector).clone();
        let policy = sub.policy.with_noise_sigma(0.0);
        quiet = quiet.with_subdetector(detector, sub.with_policy(policy));
    }
    assert_eq!(quiet.che.selection, config.che.selection);
    let mut processor = EventProcessor::new(quiet).unwrap();
    processor.begin_event();
    let record = processor.end_event(&hits, &mut event_rng(11, 0, 0)).unwrap();
    assert_eq!(record.hgcal_total, 0.0);
    assert_eq!(
        processor.accumulator().layer_signals(Subdetector::Ahcal),
        vec![0.0; 39].as_slice()
    );
}

#[test]
fn test_grand_total_is_sum_of_detector_totals() {
    let config = DetectorConfig::default();
    let mut processor = EventProcessor::new(config.clone()).unwrap();
    let run = RunConfig::new(1234);
    for event_id in 0..5 {
        let record = processor
            .process(&realistic_event(&config, event_id), &run)
            .unwrap();
        assert!(record.cee_total > 0.0);
        assert!(record.ahcal_total > 0.0);
        assert_abs_diff_eq!(
            record.hgcal_total,
            record.cee_total + record.che_total + record.ahcal_total,
            epsilon = 1e-9
        );
        assert_relative_eq!(record.edep, 50.0);
        assert_eq!(record.interaction_layer, 4);
    }
}

#[test]
fn test_same_seed_reproduces_records() {
    let config = DetectorConfig::default();
    let events: Vec<EventInput> = (0..4).map(|id| realistic_event(&config, id)).collect();

    let mut first = Vec::new();
    let mut second = Vec::new();
    process_events(&config, events.clone(), &RunConfig::new(77), &mut first).unwrap();
    process_events(&config, events.clone(), &RunConfig::new(77), &mut second).unwrap();
    assert_eq!(first, second);

    let mut other_seed = Vec::new();
    process_events(&config, events, &RunConfig::new(78), &mut other_seed).unwrap();
    assert_ne!(first, other_seed);
}

#[test]
fn test_parallel_matches_sequential() {
    let config = DetectorConfig::default();
    let mut events: Vec<EventInput> = (0..16).map(|id| realistic_event(&config, id)).collect();
    // One broken event in the middle is skipped by both paths.
    events[7].hits.remove("AHCALHitsCollection");

    let run = RunConfig::new(2024);
    let mut sequential = Vec::new();
    let mut parallel = Vec::new();
    let seq_summary = process_events(&config, events.clone(), &run, &mut sequential).unwrap();
    let par_summary = process_events_parallel(&config, &events, &run, &mut parallel).unwrap();

    assert_eq!(seq_summary, par_summary);
    assert_eq!(seq_summary.processed, 15);
    assert_eq!(seq_summary.skipped, 1);
    assert_eq!(sequential, parallel);
}

#[test]
fn test_repeated_event_ids_get_independent_noise_per_stream() {
    // Two simulation runs both number their events from zero.
    let config = DetectorConfig::default();
    let events: Vec<EventInput> = (0..3).map(|id| realistic_event(&config, id)).collect();

    let run = RunConfig::new(42);
    let mut first_file = Vec::new();
    let mut second_file = Vec::new();
    process_events(&config, events.clone(), &run, &mut first_file).unwrap();
    process_events_parallel(&config, &events, &run.with_stream(1), &mut second_file).unwrap();

    for (a, b) in first_file.iter().zip(&second_file) {
        assert_ne!(a.cee_total, b.cee_total);
        assert_ne!(a.ahcal_total, b.ahcal_total);
        assert_eq!(a.edep, b.edep);
    }
}
