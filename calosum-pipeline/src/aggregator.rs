//! Layer aggregation: raw hit collections to per-layer calibrated signals.
//!
//! For every subdetector the configured hits collection is looked up once,
//! checked against the configured geometry, and each layer is passed through
//! [`calosum_core::reduce`] with that subdetector's policy. Subdetectors are
//! processed in [`Subdetector::ALL`] order and layers in index order, which
//! fixes the order in which noise samples are drawn.

use crate::accumulator::EventAccumulator;
use calosum_core::{
    reduce, DetectorConfig, Error, HitCollection, HitSource, Result, Subdetector,
    SubdetectorConfig,
};
use rand::Rng;

/// Applies the calibration reducer to every layer of every subdetector.
#[derive(Debug, Clone)]
pub struct LayerAggregator {
    config: DetectorConfig,
}

impl LayerAggregator {
    /// Creates an aggregator for a validated configuration.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if `config` fails validation.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the detector configuration.
    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Looks up and checks one subdetector's hits collection.
    ///
    /// # Errors
    /// - [`Error::MissingCollection`] if the source has no such collection.
    /// - [`Error::LayerCountMismatch`] if it has the wrong number of layers.
    /// - [`Error::SubsetOutOfRange`] if a single-wafer layer is shorter than
    ///   the subset.
    /// - [`Error::CellCountMismatch`] if a layer has the wrong number of cells.
    pub fn resolve<'s, S: HitSource + ?Sized>(
        &self,
        detector: Subdetector,
        source: &'s S,
    ) -> Result<&'s HitCollection> {
        let sub = self.config.subdetector(detector);
        let collection =
            source
                .collection(&sub.collection)
                .ok_or_else(|| Error::MissingCollection {
                    detector,
                    name: sub.collection.clone(),
                })?;

        if collection.len() != sub.layers {
            return Err(Error::LayerCountMismatch {
                detector,
                expected: sub.layers,
                actual: collection.len(),
            });
        }

        for (layer, cells) in collection.iter().enumerate() {
            if let Some(requested) = sub.selection.subset_len(layer) {
                if requested > cells.len() {
                    return Err(Error::SubsetOutOfRange {
                        detector,
                        layer,
                        requested,
                        available: cells.len(),
                    });
                }
            }
            if cells.len() != sub.cells {
                return Err(Error::CellCountMismatch {
                    detector,
                    layer,
                    expected: sub.cells,
                    actual: cells.len(),
                });
            }
        }

        Ok(collection)
    }

    /// Reduces every layer of one subdetector into `out`.
    ///
    /// `out` is only written once the collection has passed all checks.
    ///
    /// # Errors
    /// See [`LayerAggregator::resolve`]. Returns [`Error::InvalidConfig`] if
    /// `out` does not have one slot per configured layer.
    pub fn aggregate_detector<S, R>(
        &self,
        detector: Subdetector,
        source: &S,
        rng: &mut R,
        out: &mut [f64],
    ) -> Result<()>
    where
        S: HitSource + ?Sized,
        R: Rng + ?Sized,
    {
        let collection = self.resolve(detector, source)?;
        let len = out.len();
        reduce_layers(self.config.subdetector(detector), collection, rng, out).map_err(
            |expected| {
                Error::InvalidConfig(format!(
                    "{detector}: output holds {len} layers, expected {expected}"
                ))
            },
        )
    }

    /// Reduces all three subdetectors into the accumulator's layer signals.
    ///
    /// All collections are resolved before any signal is written, so a
    /// failing event leaves the accumulator's layer signals untouched.
    ///
    /// # Errors
    /// See [`LayerAggregator::resolve`].
    pub fn aggregate<S, R>(
        &self,
        source: &S,
        rng: &mut R,
        accumulator: &mut EventAccumulator,
    ) -> Result<()>
    where
        S: HitSource + ?Sized,
        R: Rng + ?Sized,
    {
        let collections = [
            self.resolve(Subdetector::Cee, source)?,
            self.resolve(Subdetector::Che, source)?,
            self.resolve(Subdetector::Ahcal, source)?,
        ];

        for (detector, collection) in Subdetector::ALL.into_iter().zip(collections) {
            let out = accumulator.layer_signals_mut(detector);
            let len = out.len();
            reduce_layers(self.config.subdetector(detector), collection, rng, out).map_err(
                |expected| {
                    Error::InvalidConfig(format!(
                        "{detector}: accumulator holds {len} layers, expected {expected}"
                    ))
                },
            )?;
        }
        Ok(())
    }
}

/// Reduces a checked collection layer by layer. On a length mismatch,
/// returns the expected layer count without writing.
fn reduce_layers<R: Rng + ?Sized>(
    sub: &SubdetectorConfig,
    collection: &HitCollection,
    rng: &mut R,
    out: &mut [f64],
) -> std::result::Result<(), usize> {
    if out.len() != sub.layers {
        return Err(sub.layers);
    }
    for ((layer, cells), signal) in collection.iter().enumerate().zip(out.iter_mut()) {
        let cells = match sub.selection.subset_len(layer) {
            Some(n) => &cells[..n],
            None => cells,
        };
        *signal = reduce(cells, &sub.policy, rng);
    }
    Ok(())
}
