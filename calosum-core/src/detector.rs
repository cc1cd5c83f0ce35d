//! Detector geometry constants and per-subdetector configuration.
//!
//! The test-beam calorimeter is read out as three subdetectors: the silicon
//! electromagnetic section (CEE), the silicon hadronic section (CHE) and the
//! scintillator-tile hadronic prototype (AHCAL). Layer and cell counts are
//! fixed properties of that instrument; they are configuration, not runtime
//! negotiation.

use crate::calibration::CalibrationPolicy;
use crate::error::{Error, Result};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of CEE layers.
pub const CEE_LAYERS: usize = 28;
/// Number of CHE layers.
pub const CHE_LAYERS: usize = 12;
/// Number of AHCAL layers.
pub const AHCAL_LAYERS: usize = 39;

/// Cells on one hexagonal silicon wafer.
pub const CELLS_PER_WAFER: usize = 133;
/// Cells per CEE layer (one wafer).
pub const CEE_CELLS: usize = CELLS_PER_WAFER;
/// Cells per CHE layer (seven wafers).
pub const CHE_CELLS: usize = 7 * CELLS_PER_WAFER;
/// Tiles per AHCAL layer (24 x 24).
pub const AHCAL_CELLS: usize = 24 * 24;

/// First CHE layer that is instrumented with a single wafer instead of seven.
pub const CHE_SEVEN_WAFER_LAYERS: usize = 9;

/// MIP calibration for 300 um silicon cells (MeV).
pub const MIP_SILICON: f64 = 0.0850;
/// MIP calibration for AHCAL scintillator tiles (MeV).
pub const MIP_TILE: f64 = 0.4929;
/// Silicon noise, in MIP.
pub const SILICON_NOISE_SIGMA: f64 = 0.12;
/// Silicon zero-suppression cut, in MIP.
pub const SILICON_THRESHOLD: f64 = 0.5;
/// AHCAL noise, in MIP.
pub const AHCAL_NOISE_SIGMA: f64 = 0.12;
/// AHCAL zero-suppression cut, in MIP.
pub const AHCAL_THRESHOLD: f64 = 0.5;

/// One of the three calorimeter subdetectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Subdetector {
    /// Silicon electromagnetic section.
    Cee,
    /// Silicon hadronic section.
    Che,
    /// Scintillator-tile hadronic prototype.
    Ahcal,
}

impl Subdetector {
    /// All subdetectors, in readout order.
    pub const ALL: [Subdetector; 3] = [Subdetector::Cee, Subdetector::Che, Subdetector::Ahcal];

    /// Position in [`Subdetector::ALL`].
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Subdetector::Cee => 0,
            Subdetector::Che => 1,
            Subdetector::Ahcal => 2,
        }
    }

    /// Short uppercase name used in logs and errors.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Subdetector::Cee => "CEE",
            Subdetector::Che => "CHE",
            Subdetector::Ahcal => "AHCAL",
        }
    }
}

impl fmt::Display for Subdetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which cells of a layer's raw list enter the layer sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case", tag = "rule"))]
pub enum CellSelection {
    /// Every cell of every layer.
    All,
    /// From `from_layer` on, only the first `cells_per_wafer - 1` cells.
    ///
    /// Models the CHE depth where a single wafer, not the full seven-wafer
    /// layer, is instrumented.
    SingleWafer {
        /// First layer index the rule applies to.
        from_layer: usize,
        /// Cells on one wafer.
        cells_per_wafer: usize,
    },
}

impl CellSelection {
    /// Number of leading cells to keep for `layer`, or `None` for the full list.
    #[inline]
    #[must_use]
    pub fn subset_len(&self, layer: usize) -> Option<usize> {
        match *self {
            CellSelection::All => None,
            CellSelection::SingleWafer {
                from_layer,
                cells_per_wafer,
            } => (layer >= from_layer).then_some(cells_per_wafer.saturating_sub(1)),
        }
    }
}

/// Readout description of one subdetector.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SubdetectorConfig {
    /// Name of the hits collection the sensitive detector registers.
    pub collection: String,
    /// Number of layers.
    pub layers: usize,
    /// Raw cell values per layer.
    pub cells: usize,
    /// Calibration, noise and threshold.
    pub policy: CalibrationPolicy,
    /// Cell subset rule.
    pub selection: CellSelection,
}

impl SubdetectorConfig {
    /// Creates a configuration that reduces every cell of every layer.
    pub fn new(
        collection: impl Into<String>,
        layers: usize,
        cells: usize,
        policy: CalibrationPolicy,
    ) -> Self {
        Self {
            collection: collection.into(),
            layers,
            cells,
            policy,
            selection: CellSelection::All,
        }
    }

    /// Sets the cell subset rule.
    #[must_use]
    pub fn with_selection(mut self, selection: CellSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Sets the calibration policy.
    #[must_use]
    pub fn with_policy(mut self, policy: CalibrationPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn validate(&self, detector: Subdetector) -> Result<()> {
        if self.collection.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "{detector}: collection name must not be empty"
            )));
        }
        if self.layers == 0 {
            return Err(Error::InvalidConfig(format!(
                "{detector}: layer count must be at least 1"
            )));
        }
        if let Some(problem) = self.policy.problem() {
            return Err(Error::InvalidConfig(format!("{detector}: {problem}")));
        }

        if let CellSelection::SingleWafer {
            from_layer,
            cells_per_wafer,
        } = self.selection
        {
            if cells_per_wafer == 0 {
                return Err(Error::InvalidConfig(format!(
                    "{detector}: cells_per_wafer must be at least 1"
                )));
            }
            if cells_per_wafer - 1 > self.cells {
                return Err(Error::InvalidConfig(format!(
                    "{detector}: single-wafer subset of {} cells exceeds {} cells per layer",
                    cells_per_wafer - 1,
                    self.cells
                )));
            }
            if from_layer > self.layers {
                return Err(Error::InvalidConfig(format!(
                    "{detector}: single-wafer boundary {from_layer} beyond {} layers",
                    self.layers
                )));
            }
        }
        Ok(())
    }
}

/// Full readout description of the calorimeter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorConfig {
    /// Silicon electromagnetic section.
    pub cee: SubdetectorConfig,
    /// Silicon hadronic section.
    pub che: SubdetectorConfig,
    /// Scintillator-tile hadronic prototype.
    pub ahcal: SubdetectorConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        let silicon = CalibrationPolicy {
            divisor: MIP_SILICON,
            noise_sigma: SILICON_NOISE_SIGMA,
            threshold: SILICON_THRESHOLD,
        };
        let tile = CalibrationPolicy {
            divisor: MIP_TILE,
            noise_sigma: AHCAL_NOISE_SIGMA,
            threshold: AHCAL_THRESHOLD,
        };
        Self {
            cee: SubdetectorConfig::new("CEEHitsCollection", CEE_LAYERS, CEE_CELLS, silicon),
            che: SubdetectorConfig::new("CHEHitsCollection", CHE_LAYERS, CHE_CELLS, silicon)
                .with_selection(CellSelection::SingleWafer {
                    from_layer: CHE_SEVEN_WAFER_LAYERS,
                    cells_per_wafer: CELLS_PER_WAFER,
                }),
            ahcal: SubdetectorConfig::new("AHCALHitsCollection", AHCAL_LAYERS, AHCAL_CELLS, tile),
        }
    }
}

impl DetectorConfig {
    /// Creates the test-beam configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the configuration of one subdetector.
    #[inline]
    #[must_use]
    pub fn subdetector(&self, detector: Subdetector) -> &SubdetectorConfig {
        match detector {
            Subdetector::Cee => &self.cee,
            Subdetector::Che => &self.che,
            Subdetector::Ahcal => &self.ahcal,
        }
    }

    /// Returns a mutable reference to the configuration of one subdetector.
    pub fn subdetector_mut(&mut self, detector: Subdetector) -> &mut SubdetectorConfig {
        match detector {
            Subdetector::Cee => &mut self.cee,
            Subdetector::Che => &mut self.che,
            Subdetector::Ahcal => &mut self.ahcal,
        }
    }

    /// Replaces the configuration of one subdetector.
    #[must_use]
    pub fn with_subdetector(mut self, detector: Subdetector, config: SubdetectorConfig) -> Self {
        *self.subdetector_mut(detector) = config;
        self
    }

    /// Layer counts, indexed like [`Subdetector::ALL`].
    #[must_use]
    pub fn layer_counts(&self) -> [usize; 3] {
        Subdetector::ALL.map(|d| self.subdetector(d).layers)
    }

    /// Checks every subdetector configuration.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] naming the first offending subdetector.
    pub fn validate(&self) -> Result<()> {
        for detector in Subdetector::ALL {
            self.subdetector(detector).validate(detector)?;
        }
        Ok(())
    }
}
