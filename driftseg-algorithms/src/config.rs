//! Reconstruction configuration.

use crate::{CompatibilityWindow, FitModel, UpdatorConfig};
use driftseg_core::{Error, Result, DEFAULT_SEGMENT_CHI2_MAX};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration of the combinatorial pattern recognition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PatternRecoConfig {
    /// Super-layers with more hits are skipped entirely.
    pub max_allowed_hits: usize,
    /// Angular window of the seed direction cut in the theta super-layer (rad).
    pub alpha_max_theta: f64,
    /// Angular window of the seed direction cut in phi super-layers (rad).
    pub alpha_max_phi: f64,
    /// Upper bound on chi-square per degree of freedom of a time-offset fit.
    pub max_chi2: f64,
    /// Chi-square cut applied when the fit resolved no time offset.
    pub no_t0_chi2_cut: f64,
    /// Chi-square margin required to prefer one side of a hit over the other.
    pub lr_chi2_margin: f64,
    /// Chi-square per degree of freedom a stored candidate must stay below.
    pub segment_chi2_max: f64,
    /// Fit model used while searching.
    pub fit_model: FitModel,
    /// Wire-distance admission window.
    pub compatibility: CompatibilityWindow,
    /// Emit detailed search traces at debug level.
    pub debug: bool,
}

impl Default for PatternRecoConfig {
    fn default() -> Self {
        Self {
            max_allowed_hits: 100,
            alpha_max_theta: 0.1,
            alpha_max_phi: 1.0,
            max_chi2: 8.0,
            no_t0_chi2_cut: 200.0,
            lr_chi2_margin: 0.1,
            segment_chi2_max: DEFAULT_SEGMENT_CHI2_MAX,
            fit_model: FitModel::WithT0,
            compatibility: CompatibilityWindow::default(),
            debug: false,
        }
    }
}

impl PatternRecoConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the hit-count ceiling.
    #[must_use]
    pub fn with_max_allowed_hits(mut self, max: usize) -> Self {
        self.max_allowed_hits = max;
        self
    }

    /// Sets the theta super-layer angular window.
    #[must_use]
    pub fn with_alpha_max_theta(mut self, alpha: f64) -> Self {
        self.alpha_max_theta = alpha;
        self
    }

    /// Sets the phi super-layer angular window.
    #[must_use]
    pub fn with_alpha_max_phi(mut self, alpha: f64) -> Self {
        self.alpha_max_phi = alpha;
        self
    }

    /// Sets the chi-square per degree of freedom cut of the fit gate.
    #[must_use]
    pub fn with_max_chi2(mut self, chi2: f64) -> Self {
        self.max_chi2 = chi2;
        self
    }

    /// Sets the left/right arbitration margin.
    #[must_use]
    pub fn with_lr_chi2_margin(mut self, margin: f64) -> Self {
        self.lr_chi2_margin = margin;
        self
    }

    /// Sets the fit model used while searching.
    #[must_use]
    pub fn with_fit_model(mut self, model: FitModel) -> Self {
        self.fit_model = model;
        self
    }

    /// Sets the compatibility window.
    #[must_use]
    pub fn with_compatibility(mut self, window: CompatibilityWindow) -> Self {
        self.compatibility = window;
        self
    }

    /// Enables or disables search traces.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Angular window for super-layer `index`.
    #[must_use]
    pub fn alpha_max(&self, index: u8) -> f64 {
        if index == driftseg_core::THETA_SUPERLAYER {
            self.alpha_max_theta
        } else {
            self.alpha_max_phi
        }
    }

    /// Checks that every cut is usable.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        positive("alpha_max_theta", self.alpha_max_theta)?;
        positive("alpha_max_phi", self.alpha_max_phi)?;
        positive("max_chi2", self.max_chi2)?;
        positive("no_t0_chi2_cut", self.no_t0_chi2_cut)?;
        positive("segment_chi2_max", self.segment_chi2_max)?;
        if !(self.lr_chi2_margin >= 0.0 && self.lr_chi2_margin.is_finite()) {
            return Err(Error::ConfigError(format!(
                "lr_chi2_margin must be non-negative, got {}",
                self.lr_chi2_margin
            )));
        }
        for d in 1..self.compatibility.lower.len() {
            if self.compatibility.lower[d] + 1 >= self.compatibility.upper[d] {
                return Err(Error::ConfigError(format!(
                    "compatibility window for layer distance {d} admits no wire"
                )));
            }
        }
        Ok(())
    }
}

/// How the cleaner settles two candidates built on the same hits with opposite sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConflictMode {
    /// Keep the lower chi-square side of every conflicting hit.
    #[default]
    BestChi2,
    /// Keep the candidate with the smaller angle to the chamber normal.
    SmallerAngle,
    /// Keep both mirror candidates.
    KeepBoth,
}

/// Configuration of the ghost-busting cleaner.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CleanerConfig {
    /// Two candidates sharing this many hits are ghosts of each other.
    pub n_shared_hits_max: usize,
    /// Fewest unshared hits a candidate sharing hits must keep.
    pub n_unshared_hits_min: usize,
    /// Policy for full mirror pairs.
    pub conflict_mode: ConflictMode,
    /// Chi-square per degree of freedom a candidate must stay below after conflict removal.
    pub segment_chi2_max: f64,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            n_shared_hits_max: 2,
            n_unshared_hits_min: 2,
            conflict_mode: ConflictMode::BestChi2,
            segment_chi2_max: DEFAULT_SEGMENT_CHI2_MAX,
        }
    }
}

impl CleanerConfig {
    /// Sets the shared-hit limit.
    #[must_use]
    pub fn with_n_shared_hits_max(mut self, n: usize) -> Self {
        self.n_shared_hits_max = n;
        self
    }

    /// Sets the unshared-hit minimum.
    #[must_use]
    pub fn with_n_unshared_hits_min(mut self, n: usize) -> Self {
        self.n_unshared_hits_min = n;
        self
    }

    /// Sets the mirror-pair policy.
    #[must_use]
    pub fn with_conflict_mode(mut self, mode: ConflictMode) -> Self {
        self.conflict_mode = mode;
        self
    }

    /// Checks that every cut is usable.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.n_shared_hits_max == 0 {
            return Err(Error::ConfigError(
                "n_shared_hits_max must be at least 1".to_string(),
            ));
        }
        positive("segment_chi2_max", self.segment_chi2_max)
    }
}

/// Everything a reconstruction needs.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReconstructionConfig {
    /// Pattern recognition.
    pub pattern: PatternRecoConfig,
    /// Fitting and final refinement.
    pub updator: UpdatorConfig,
    /// Ghost removal.
    pub cleaner: CleanerConfig,
}

impl ReconstructionConfig {
    /// Checks all three parts.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.pattern.validate()?;
        self.cleaner.validate()?;
        positive("drift_velocity", self.updator.drift_velocity)?;
        if let Some(error) = self.updator.hit_error {
            positive("hit_error", error)?;
        }
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(Error::ConfigError(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}
