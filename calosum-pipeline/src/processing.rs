//! Event loop driver: reset, step accumulation, finalize, sink.

use crate::accumulator::EventAccumulator;
use crate::aggregator::LayerAggregator;
use calosum_core::{DetectorConfig, EventHits, EventRecord, EventSink, HitSource, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What to do when a single event cannot be finalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FailurePolicy {
    /// Stop the run and return the event's error.
    Abort,
    /// Log the error, drop the event and continue.
    #[default]
    Skip,
}

/// Run-level parameters for batch processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunConfig {
    /// Seed from which every event's noise stream is derived.
    pub seed: u64,
    /// Stream index within the run, e.g. the input file number.
    ///
    /// Event ids restart in every simulation run, so batches that share a
    /// seed need distinct streams to get independent noise.
    #[cfg_attr(feature = "serde", serde(default))]
    pub stream: u64,
    /// Handling of per-event failures.
    pub failure_policy: FailurePolicy,
}

impl RunConfig {
    /// Creates a run configuration with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Sets the stream index.
    #[must_use]
    pub fn with_stream(mut self, stream: u64) -> Self {
        self.stream = stream;
        self
    }

    /// Sets the failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// Counts of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProcessingSummary {
    /// Events recorded to the sink.
    pub processed: usize,
    /// Events dropped under [`FailurePolicy::Skip`].
    pub skipped: usize,
}

/// Everything the pipeline needs to know about one simulated event.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventInput {
    /// Event number; also selects the event's noise stream.
    pub event_id: u64,
    /// Raw energy deposited per simulation step.
    #[cfg_attr(feature = "serde", serde(default))]
    pub steps: Vec<f64>,
    /// Layer of the first hadronic interaction.
    #[cfg_attr(feature = "serde", serde(default))]
    pub interaction_layer: i32,
    /// Hit collections by name.
    pub hits: EventHits,
}

// SplitMix64 step.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Noise stream of one event.
///
/// Depends only on the run seed, the stream index and the event id, so an
/// event produces the same record whichever worker processes it and in
/// whatever order. Each input word passes through a SplitMix64 round before
/// the next is folded in, and the 256-bit key is drawn from the mixed state.
#[must_use]
pub fn event_rng(seed: u64, stream: u64, event_id: u64) -> StdRng {
    let mut state = 0u64;
    for word in [seed, stream, event_id] {
        state = splitmix64(&mut state) ^ word;
    }

    let mut key = <StdRng as SeedableRng>::Seed::default();
    for chunk in key.chunks_exact_mut(8) {
        chunk.copy_from_slice(&splitmix64(&mut state).to_le_bytes());
    }
    StdRng::from_seed(key)
}

/// Drives one [`EventAccumulator`] through the per-event state machine.
#[derive(Debug, Clone)]
pub struct EventProcessor {
    aggregator: LayerAggregator,
    accumulator: EventAccumulator,
}

impl EventProcessor {
    /// Creates a processor for a validated configuration.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`](calosum_core::Error::InvalidConfig) if `config` fails validation.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        let accumulator = EventAccumulator::new(&config);
        let aggregator = LayerAggregator::new(config)?;
        Ok(Self {
            aggregator,
            accumulator,
        })
    }

    /// Returns the detector configuration.
    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        self.aggregator.config()
    }

    /// Read access to the current event state.
    #[must_use]
    pub fn accumulator(&self) -> &EventAccumulator {
        &self.accumulator
    }

    /// Starts a new event.
    pub fn begin_event(&mut self) {
        self.accumulator.reset();
    }

    /// Adds one step's raw energy deposit to the current event.
    #[inline]
    pub fn add_edep(&mut self, step_edep: f64) {
        self.accumulator.add_edep(step_edep);
    }

    /// Records the interaction layer of the current event.
    pub fn set_interaction_layer(&mut self, layer: i32) {
        self.accumulator.set_interaction_layer(layer);
    }

    /// Aggregates the event's hits and returns its record.
    ///
    /// # Errors
    /// Any error from [`LayerAggregator::aggregate`]; the event is lost but the
    /// processor can start the next one.
    pub fn end_event<S, R>(&mut self, hits: &S, rng: &mut R) -> Result<EventRecord>
    where
        S: HitSource + ?Sized,
        R: Rng + ?Sized,
    {
        self.aggregator.aggregate(hits, rng, &mut self.accumulator)?;
        let record = self.accumulator.finalize();
        debug!(
            "event finalized: edep={:.4} cee={:.3} che={:.3} ahcal={:.3} total={:.3}",
            record.edep, record.cee_total, record.che_total, record.ahcal_total, record.hgcal_total
        );
        Ok(record)
    }

    /// [`EventProcessor::end_event`], then hands the record to `sink`.
    ///
    /// # Errors
    /// Aggregation errors, or [`Error::Sink`](calosum_core::Error::Sink) from the sink.
    pub fn end_event_into<S, R, K>(
        &mut self,
        hits: &S,
        rng: &mut R,
        sink: &mut K,
    ) -> Result<EventRecord>
    where
        S: HitSource + ?Sized,
        R: Rng + ?Sized,
        K: EventSink + ?Sized,
    {
        let record = self.end_event(hits, rng)?;
        sink.record(&record)?;
        Ok(record)
    }

    /// Runs a complete event from an [`EventInput`] on the run's noise stream.
    ///
    /// # Errors
    /// See [`EventProcessor::end_event`].
    pub fn process(&mut self, input: &EventInput, run: &RunConfig) -> Result<EventRecord> {
        self.begin_event();
        for &step in &input.steps {
            self.add_edep(step);
        }
        self.set_interaction_layer(input.interaction_layer);
        let mut rng = event_rng(run.seed, run.stream, input.event_id);
        self.end_event(&input.hits, &mut rng)
    }
}

/// Applies the failure policy to one event's outcome and feeds the sink.
fn dispatch<K: EventSink + ?Sized>(
    event_id: u64,
    outcome: Result<EventRecord>,
    run: &RunConfig,
    sink: &mut K,
    summary: &mut ProcessingSummary,
) -> Result<()> {
    match outcome {
        Ok(record) => {
            sink.record(&record)?;
            summary.processed += 1;
        }
        Err(err) => match run.failure_policy {
            FailurePolicy::Abort => return Err(err),
            FailurePolicy::Skip => {
                warn!("skipping event {event_id}: {err}");
                summary.skipped += 1;
            }
        },
    }
    Ok(())
}

/// Processes events one after another on the calling thread.
///
/// # Errors
/// Configuration errors, sink errors, and under [`FailurePolicy::Abort`] the
/// first per-event error.
pub fn process_events<I, K>(
    config: &DetectorConfig,
    events: I,
    run: &RunConfig,
    sink: &mut K,
) -> Result<ProcessingSummary>
where
    I: IntoIterator<Item = EventInput>,
    K: EventSink + ?Sized,
{
    let mut processor = EventProcessor::new(config.clone())?;
    let mut summary = ProcessingSummary::default();

    for input in events {
        let outcome = processor.process(&input, run);
        dispatch(input.event_id, outcome, run, sink, &mut summary)?;
    }
    sink.flush()?;

    info!(
        "processed {} events, skipped {}",
        summary.processed, summary.skipped
    );
    Ok(summary)
}

/// Processes events on the rayon pool.
///
/// Every rayon split works on its own clone of one [`EventProcessor`]; the
/// clone is reset before each event. Records reach the sink in input order
/// and are identical to those of [`process_events`] with the same run.
///
/// # Errors
/// Same as [`process_events`].
pub fn process_events_parallel<K>(
    config: &DetectorConfig,
    events: &[EventInput],
    run: &RunConfig,
    sink: &mut K,
) -> Result<ProcessingSummary>
where
    K: EventSink + ?Sized,
{
    let processor = EventProcessor::new(config.clone())?;

    let outcomes: Vec<Result<EventRecord>> = events
        .par_iter()
        .map_init(
            || processor.clone(),
            |worker, input| worker.process(input, run),
        )
        .collect();

    let mut summary = ProcessingSummary::default();
    for (input, outcome) in events.iter().zip(outcomes) {
        dispatch(input.event_id, outcome, run, sink, &mut summary)?;
    }
    sink.flush()?;

    info!(
        "processed {} events in parallel, skipped {}",
        summary.processed, summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use calosum_core::{CalibrationPolicy, Error, Subdetector, SubdetectorConfig};

    fn tiny_config() -> DetectorConfig {
        let policy = CalibrationPolicy::noiseless(0.0);
        DetectorConfig {
            cee: SubdetectorConfig::new("cee", 1, 2, policy),
            che: SubdetectorConfig::new("che", 1, 2, policy),
            ahcal: SubdetectorConfig::new("ahcal", 1, 2, policy),
        }
    }

    struct FailingSink;

    impl EventSink for FailingSink {
        fn record(&mut self, _record: &EventRecord) -> Result<()> {
            Err(Error::Sink("disk full".to_string()))
        }
    }

    #[test]
    fn test_state_machine() {
        let config = tiny_config();
        let mut processor = EventProcessor::new(config.clone()).unwrap();
        let mut hits = EventHits::zeroed(&config);
        hits.insert("cee", vec![vec![1.0, 2.0]].into());

        processor.begin_event();
        processor.add_edep(0.25);
        processor.add_edep(0.5);
        processor.set_interaction_layer(3);
        let mut rng = event_rng(1, 0, 1);
        let mut sink = Vec::new();
        let record = processor.end_event_into(&hits, &mut rng, &mut sink).unwrap();

        assert_relative_eq!(record.edep, 0.75);
        assert_relative_eq!(record.cee_total, 3.0);
        assert_eq!(record.interaction_layer, 3);
        assert_eq!(sink, vec![record]);

        processor.begin_event();
        assert!(processor.accumulator().edep() == 0.0);
        assert_eq!(processor.accumulator().interaction_layer(), 0);
    }

    #[test]
    fn test_skip_policy_counts_failures() {
        let config = tiny_config();
        let good = EventInput {
            event_id: 0,
            hits: EventHits::zeroed(&config),
            ..EventInput::default()
        };
        let bad = EventInput {
            event_id: 1,
            ..EventInput::default()
        };
        let mut sink = Vec::new();
        let summary = process_events(
            &config,
            vec![good.clone(), bad, good],
            &RunConfig::new(5),
            &mut sink,
        )
        .unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_abort_policy_returns_first_error() {
        let config = tiny_config();
        let bad = EventInput::default();
        let run = RunConfig::new(5).with_failure_policy(FailurePolicy::Abort);
        let mut sink = Vec::new();
        let err = process_events(&config, vec![bad], &run, &mut sink).unwrap_err();
        assert!(matches!(err, Error::MissingCollection { .. }));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_sink_errors_are_not_skipped() {
        let config = tiny_config();
        let good = EventInput {
            hits: EventHits::zeroed(&config),
            ..EventInput::default()
        };
        let err = process_events(&config, vec![good], &RunConfig::new(0), &mut FailingSink)
            .unwrap_err();
        assert!(matches!(err, Error::Sink(_)));
    }

    #[test]
    fn test_event_rng_depends_on_seed_stream_and_event() {
        let a = event_rng(1, 0, 2).gen::<u64>();
        assert_eq!(a, event_rng(1, 0, 2).gen::<u64>());
        assert_ne!(a, event_rng(1, 0, 3).gen::<u64>());
        assert_ne!(a, event_rng(2, 0, 2).gen::<u64>());
        assert_ne!(a, event_rng(1, 1, 2).gen::<u64>());
    }

    #[test]
    fn test_event_rng_inputs_do_not_cancel() {
        // Seed and event id must not trade off against each other.
        let golden = 0x9E37_79B9_7F4A_7C15;
        assert_ne!(
            event_rng(golden, 0, 0).gen::<u64>(),
            event_rng(0, 0, 1).gen::<u64>()
        );
        assert_ne!(
            event_rng(1, 0, 0).gen::<u64>(),
            event_rng(0, 0, 1).gen::<u64>()
        );
        assert_ne!(
            event_rng(0, 1, 0).gen::<u64>(),
            event_rng(0, 0, 1).gen::<u64>()
        );

        let mut seen = std::collections::HashSet::new();
        for seed in 0..8 {
            for stream in 0..8 {
                for event_id in 0..8 {
                    assert!(seen.insert(event_rng(seed, stream, event_id).gen::<u64>()));
                }
            }
        }
    }

    #[test]
    fn test_streams_separate_repeated_event_ids() {
        // One MIP in every cell: each total carries the sum of all noise draws.
        let config = DetectorConfig::default();
        let mut hits = EventHits::zeroed(&config);
        for detector in Subdetector::ALL {
            let sub = config.subdetector(detector);
            let collection = hits.collection_mut(&sub.collection).unwrap();
            for layer in 0..sub.layers {
                collection.layer_mut(layer).unwrap().fill(sub.policy.divisor);
            }
        }
        let events: Vec<EventInput> = (0..2)
            .map(|event_id| EventInput {
                event_id,
                hits: hits.clone(),
                ..EventInput::default()
            })
            .collect();

        let run = RunConfig::new(42);
        let mut first = Vec::new();
        let mut again = Vec::new();
        let mut second = Vec::new();
        process_events(&config, events.clone(), &run, &mut first).unwrap();
        process_events(&config, events.clone(), &run, &mut again).unwrap();
        process_events(&config, events, &run.with_stream(1), &mut second).unwrap();

        assert_eq!(first, again);
        assert_ne!(first[0], second[0]);
        assert_ne!(first[1], second[1]);
    }
}
