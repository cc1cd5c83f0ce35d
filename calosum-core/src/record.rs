//! Per-event output record and the sink contract.

use crate::error::Result;
use crate::Subdetector;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Column names of an [`EventRecord`], in output order.
pub const RECORD_COLUMNS: [&str; 6] = [
    "edep",
    "cee_total",
    "che_total",
    "ahcal_total",
    "hgcal_total",
    "interaction_layer",
];

/// Fixed-arity summary of one finalized event.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventRecord {
    /// Raw deposited energy summed over all steps, before calibration.
    pub edep: f64,
    /// Sum of CEE layer signals.
    pub cee_total: f64,
    /// Sum of CHE layer signals.
    pub che_total: f64,
    /// Sum of AHCAL layer signals.
    pub ahcal_total: f64,
    /// `cee_total + che_total + ahcal_total`.
    pub hgcal_total: f64,
    /// Layer of the first hadronic interaction (0 if not set).
    pub interaction_layer: i32,
}

impl EventRecord {
    /// Total of one subdetector.
    #[must_use]
    pub fn detector_total(&self, detector: Subdetector) -> f64 {
        match detector {
            Subdetector::Cee => self.cee_total,
            Subdetector::Che => self.che_total,
            Subdetector::Ahcal => self.ahcal_total,
        }
    }
}

/// Receiver of finalized event records.
///
/// Implementations decide how records are persisted. The pipeline calls
/// [`EventSink::record`] exactly once per successfully finalized event, in
/// event order.
pub trait EventSink {
    /// Records one event.
    ///
    /// # Errors
    /// Returns [`crate::Error::Sink`] if the record cannot be stored.
    fn record(&mut self, record: &EventRecord) -> Result<()>;

    /// Flushes buffered records.
    ///
    /// # Errors
    /// Returns [`crate::Error::Sink`] if buffered records cannot be written.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl EventSink for Vec<EventRecord> {
    fn record(&mut self, record: &EventRecord) -> Result<()> {
        self.push(*record);
        Ok(())
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn record(&mut self, record: &EventRecord) -> Result<()> {
        (**self).record(record)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}
