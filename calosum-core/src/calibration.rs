//! MIP calibration, noise injection and zero suppression.
//!
//! [`reduce`] turns one layer's raw cell energies into a single calibrated
//! signal. It is shared by all three subdetectors; only the
//! [`CalibrationPolicy`] differs between them.

use crate::error::{Error, Result};
use rand::Rng;
use rand_distr::StandardNormal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Calibration parameters of one subdetector.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationPolicy {
    /// Raw energy of one MIP; raw cell values are divided by it.
    pub divisor: f64,
    /// Standard deviation of the Gaussian noise added to every cell (MIP).
    pub noise_sigma: f64,
    /// Cells must be strictly above this value to be summed (MIP).
    pub threshold: f64,
}

impl CalibrationPolicy {
    /// Creates a validated policy.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if `divisor` is not a positive finite
    /// number, `noise_sigma` is negative or non-finite, or `threshold` is
    /// non-finite.
    pub fn new(divisor: f64, noise_sigma: f64, threshold: f64) -> Result<Self> {
        let policy = Self {
            divisor,
            noise_sigma,
            threshold,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Policy with unit divisor and no noise.
    #[must_use]
    pub fn noiseless(threshold: f64) -> Self {
        Self {
            divisor: 1.0,
            noise_sigma: 0.0,
            threshold,
        }
    }

    /// Sets the noise standard deviation.
    #[must_use]
    pub fn with_noise_sigma(mut self, sigma: f64) -> Self {
        self.noise_sigma = sigma;
        self
    }

    /// Checks the policy invariants.
    ///
    /// # Errors
    /// See [`CalibrationPolicy::new`].
    pub fn validate(&self) -> Result<()> {
        match self.problem() {
            Some(problem) => Err(Error::InvalidConfig(problem)),
            None => Ok(()),
        }
    }

    pub(crate) fn problem(&self) -> Option<String> {
        if !(self.divisor.is_finite() && self.divisor > 0.0) {
            return Some(format!("divisor must be positive, got {}", self.divisor));
        }
        if !(self.noise_sigma.is_finite() && self.noise_sigma >= 0.0) {
            return Some(format!(
                "noise sigma must be non-negative, got {}",
                self.noise_sigma
            ));
        }
        if !self.threshold.is_finite() {
            return Some(format!("threshold must be finite, got {}", self.threshold));
        }
        None
    }

    /// Calibrates one raw cell value and adds one noise sample.
    ///
    /// No random number is drawn when `noise_sigma` is zero.
    #[inline]
    pub fn calibrate<R: Rng + ?Sized>(&self, raw: f64, rng: &mut R) -> f64 {
        let signal = raw / self.divisor;
        if self.noise_sigma > 0.0 {
            let z: f64 = rng.sample(StandardNormal);
            signal + self.noise_sigma * z
        } else {
            signal
        }
    }

    /// Returns true if a calibrated value survives the cut.
    ///
    /// Non-finite values never pass.
    #[inline]
    #[must_use]
    pub fn passes(&self, calibrated: f64) -> bool {
        calibrated.is_finite() && calibrated > self.threshold
    }
}

/// Sums the calibrated, noise-smeared cells of one layer that pass the cut.
///
/// Cells are processed in order with one fresh noise sample each, so the
/// result depends only on `cells`, `policy` and the state of `rng`. An empty
/// slice returns exactly `0.0` without touching `rng`.
pub fn reduce<R: Rng + ?Sized>(cells: &[f64], policy: &CalibrationPolicy, rng: &mut R) -> f64 {
    cells.iter().fold(0.0, |sum, &raw| {
        let signal = policy.calibrate(raw, rng);
        if policy.passes(signal) {
            sum + signal
        } else {
            sum
        }
    })
}
