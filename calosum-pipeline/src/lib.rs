//! calosum-pipeline: Per-event calorimeter signal aggregation.
//!
//! This crate turns one event's raw hit collections into per-layer and
//! per-detector calibrated signals:
//! - **Layer aggregation** - calibration reducer applied to every layer
//! - **Event accumulation** - reset, step deposits, totals
//! - **Processing** - event loop driver, sequential and parallel batches
//!
#![warn(missing_docs)]

mod accumulator;
mod aggregator;
mod processing;

pub use accumulator::EventAccumulator;
pub use aggregator::LayerAggregator;
pub use processing::{
    event_rng, process_events, process_events_parallel, EventInput, EventProcessor,
    FailurePolicy, ProcessingSummary, RunConfig,
};

// Re-export core types used in the pipeline signatures
pub use calosum_core::{DetectorConfig, EventHits, EventRecord, EventSink, HitSource};
