//! Per-event state: raw deposited energy, per-layer signals and totals.

use calosum_core::{DetectorConfig, EventRecord, Subdetector};

/// Mutable state of the event currently being processed.
///
/// One accumulator serves one event at a time: [`EventAccumulator::reset`]
/// at event start, [`EventAccumulator::add_edep`] for every step, layer
/// signals written by the aggregator at event end, then
/// [`EventAccumulator::finalize`]. Concurrent workers need one accumulator
/// each.
#[derive(Debug, Clone, PartialEq)]
pub struct EventAccumulator {
    edep: f64,
    signals: [Vec<f64>; 3],
    interaction_layer: i32,
}

impl EventAccumulator {
    /// Creates an accumulator sized for `config`.
    #[must_use]
    pub fn new(config: &DetectorConfig) -> Self {
        Self::with_layer_counts(config.layer_counts())
    }

    /// Creates an accumulator with explicit layer counts, indexed like
    /// [`Subdetector::ALL`].
    #[must_use]
    pub fn with_layer_counts(layers: [usize; 3]) -> Self {
        Self {
            edep: 0.0,
            signals: layers.map(|n| vec![0.0; n]),
            interaction_layer: 0,
        }
    }

    /// Zeroes all per-event state. Layer sequences keep their length.
    pub fn reset(&mut self) {
        self.edep = 0.0;
        self.interaction_layer = 0;
        for layer_signals in &mut self.signals {
            layer_signals.fill(0.0);
        }
    }

    /// Adds one step's raw energy deposit.
    #[inline]
    pub fn add_edep(&mut self, step_edep: f64) {
        debug_assert!(step_edep >= 0.0, "negative step deposit {step_edep}");
        self.edep += step_edep;
    }

    /// Raw deposited energy so far.
    #[must_use]
    pub fn edep(&self) -> f64 {
        self.edep
    }

    /// Records the layer of the first hadronic interaction.
    pub fn set_interaction_layer(&mut self, layer: i32) {
        self.interaction_layer = layer;
    }

    /// Layer of the first hadronic interaction.
    #[must_use]
    pub fn interaction_layer(&self) -> i32 {
        self.interaction_layer
    }

    /// Per-layer signals of one subdetector.
    #[must_use]
    pub fn layer_signals(&self, detector: Subdetector) -> &[f64] {
        &self.signals[detector.index()]
    }

    /// Mutable per-layer signals of one subdetector.
    pub fn layer_signals_mut(&mut self, detector: Subdetector) -> &mut [f64] {
        &mut self.signals[detector.index()]
    }

    /// Sum of one subdetector's layer signals.
    #[must_use]
    pub fn detector_total(&self, detector: Subdetector) -> f64 {
        self.layer_signals(detector).iter().sum()
    }

    /// Computes the totals and packages the event record.
    #[must_use]
    pub fn finalize(&self) -> EventRecord {
        let cee_total = self.detector_total(Subdetector::Cee);
        let che_total = self.detector_total(Subdetector::Che);
        let ahcal_total = self.detector_total(Subdetector::Ahcal);
        EventRecord {
            edep: self.edep,
            cee_total,
            che_total,
            ahcal_total,
            hgcal_total: cee_total + che_total + ahcal_total,
            interaction_layer: self.interaction_layer,
        }
    }
}
