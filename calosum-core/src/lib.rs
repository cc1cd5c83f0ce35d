//! calosum-core: Core types and calibration for calorimeter signal aggregation.
//!
//! This crate provides the detector configuration, the raw hit containers,
//! the per-layer calibration reducer and the output record contract used by
//! the event pipeline.
//!

pub mod calibration;
pub mod detector;
pub mod error;
pub mod hits;
pub mod record;

pub use calibration::{reduce, CalibrationPolicy};
pub use detector::{CellSelection, DetectorConfig, Subdetector, SubdetectorConfig};
pub use error::{Error, Result};
pub use hits::{EventHits, HitCollection, HitSource};
pub use record::{EventRecord, EventSink, RECORD_COLUMNS};
