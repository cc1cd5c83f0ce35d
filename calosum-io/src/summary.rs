//! Events file inspection.

use crate::Result;
use calosum_core::{DetectorConfig, HitCollection, HitSource, Subdetector};
use calosum_pipeline::EventInput;
use std::collections::HashSet;

/// What one subdetector's hits collection looked like across a file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionSummary {
    /// Events carrying the collection.
    pub present: usize,
    /// Events without it.
    pub missing: usize,
    /// Fewest layers seen.
    pub min_layers: Option<usize>,
    /// Most layers seen.
    pub max_layers: Option<usize>,
    /// Events whose layer count differs from the configuration.
    pub layer_mismatches: usize,
    /// Sum of all raw cell values.
    pub raw_energy: f64,
}

impl CollectionSummary {
    fn observe(&mut self, collection: Option<&HitCollection>, expected_layers: usize) {
        let Some(collection) = collection else {
            self.missing += 1;
            return;
        };
        let layers = collection.len();
        self.present += 1;
        self.min_layers = Some(self.min_layers.map_or(layers, |min| min.min(layers)));
        self.max_layers = Some(self.max_layers.map_or(layers, |max| max.max(layers)));
        if layers != expected_layers {
            self.layer_mismatches += 1;
        }
        self.raw_energy += collection.raw_energy();
    }
}

/// Totals over an events file, checked against a detector configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFileSummary {
    /// Number of events.
    pub events: usize,
    /// Events whose id already appeared earlier in the file.
    pub duplicate_ids: usize,
    /// Sum of all step deposits.
    pub step_edep: f64,
    /// Per subdetector, indexed like [`Subdetector::ALL`].
    pub collections: [CollectionSummary; 3],
}

impl EventFileSummary {
    /// Summary of one subdetector's collection.
    #[must_use]
    pub fn collection(&self, detector: Subdetector) -> &CollectionSummary {
        &self.collections[detector.index()]
    }
}

/// Scans events and records what each configured collection holds.
///
/// # Errors
/// Returns the first read or parse error of `events`.
pub fn summarize_events<I>(config: &DetectorConfig, events: I) -> Result<EventFileSummary>
where
    I: IntoIterator<Item = Result<EventInput>>,
{
    let mut summary = EventFileSummary::default();
    let mut seen = HashSet::new();

    for event in events {
        let event = event?;
        summary.events += 1;
        if !seen.insert(event.event_id) {
            summary.duplicate_ids += 1;
        }
        summary.step_edep += event.steps.iter().sum::<f64>();
        for detector in Subdetector::ALL {
            let sub = config.subdetector(detector);
            summary.collections[detector.index()]
                .observe(event.hits.collection(&sub.collection), sub.layers);
        }
    }
    Ok(summary)
}
