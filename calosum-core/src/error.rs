//! Error types for calosum-core.

use crate::detector::Subdetector;
use thiserror::Error;

/// Result type alias for calosum operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for calosum operations.
///
/// Everything except [`Error::InvalidConfig`] is a per-event failure: the
/// event that raised it is lost, but the accumulator can be reset and the
/// next event processed normally.
#[derive(Error, Debug)]
pub enum Error {
    /// Detector configuration failed validation.
    #[error("configuration error: {0}")]
    InvalidConfig(String),

    /// The hit source has no collection under the configured name.
    #[error("cannot access hits collection '{name}' for {detector}")]
    MissingCollection {
        detector: Subdetector,
        name: String,
    },

    /// A hit collection does not hold one entry per configured layer.
    #[error("{detector} hits collection has {actual} layers, expected {expected}")]
    LayerCountMismatch {
        detector: Subdetector,
        expected: usize,
        actual: usize,
    },

    /// A layer does not hold one raw value per configured cell.
    #[error("{detector} layer {layer} has {actual} cells, expected {expected}")]
    CellCountMismatch {
        detector: Subdetector,
        layer: usize,
        expected: usize,
        actual: usize,
    },

    /// The single-wafer cell subset asks for more cells than the layer has.
    #[error("{detector} layer {layer}: subset of {requested} cells exceeds {available} available")]
    SubsetOutOfRange {
        detector: Subdetector,
        layer: usize,
        requested: usize,
        available: usize,
    },

    /// The output sink rejected a record.
    #[error("sink error: {0}")]
    Sink(String),
}
