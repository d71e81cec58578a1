//! Candidate fitting and final segment refinement.
#![allow(clippy::module_name_repetitions)]

use driftseg_core::{
    fit_line, fit_line_with_offset, AssociationPoint, CandidateFit, CellSide, FitPoint, LineFit,
    Segment2D, SegmentCandidate, SegmentHit, FAILED_FIT_CHI2,
};
use nalgebra::{Matrix2, Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Physical model used when fitting a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FitModel {
    /// Position and slope only.
    Linear,
    /// Position, slope and a common time offset.
    #[default]
    WithT0,
}

/// Configuration of the default updator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UpdatorConfig {
    /// Drift velocity (cm/ns).
    pub drift_velocity: f64,
    /// Overrides the per-hit position error when set (cm).
    pub hit_error: Option<f64>,
    /// Model used for the final refinement.
    pub final_model: FitModel,
}

impl Default for UpdatorConfig {
    fn default() -> Self {
        Self {
            drift_velocity: 0.00543,
            hit_error: None,
            final_model: FitModel::WithT0,
        }
    }
}

impl UpdatorConfig {
    /// Sets the drift velocity.
    #[must_use]
    pub fn with_drift_velocity(mut self, velocity: f64) -> Self {
        self.drift_velocity = velocity;
        self
    }

    /// Sets a common hit error.
    #[must_use]
    pub fn with_hit_error(mut self, error: f64) -> Self {
        self.hit_error = Some(error);
        self
    }

    /// Sets the model used by the final refinement.
    #[must_use]
    pub fn with_final_model(mut self, model: FitModel) -> Self {
        self.final_model = model;
        self
    }
}

/// Fits candidates and turns them into finished segments.
///
/// `fit` must leave the candidate without a fit (chi-square `-1`) when the
/// system cannot be solved or the solution is unphysical.
pub trait SegmentUpdator: Send + Sync {
    /// Fits `candidate` in place.
    fn fit(&self, candidate: &mut SegmentCandidate, model: FitModel, debug: bool);

    /// Refines a surviving candidate into a finished segment.
    fn update(&self, candidate: &SegmentCandidate) -> Segment2D;

    /// Returns the name of the updator.
    fn name(&self) -> &'static str;
}

/// Least-squares updator with optional time-offset fit.
///
/// The time offset is fitted only when hits lie on both sides of their
/// wires; otherwise it is unobservable and the plain line is fitted with
/// `t0 = 0`. An offset that would push a corrected drift distance outside
/// the cell fails the fit.
#[derive(Debug, Clone, Default)]
pub struct LinearUpdator {
    config: UpdatorConfig,
}

impl LinearUpdator {
    /// Creates an updator with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an updator with a custom configuration.
    #[must_use]
    pub fn with_config(config: UpdatorConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &UpdatorConfig {
        &self.config
    }

    fn fit_point(&self, point: &AssociationPoint) -> FitPoint {
        let pos = point.position();
        let sigma = self.config.hit_error.unwrap_or_else(|| point.hit.error());
        FitPoint::new(pos.z, pos.x, sigma, point.side.sign())
    }

    fn solve(&self, candidate: &SegmentCandidate, model: FitModel) -> Option<CandidateFit> {
        let points: Vec<FitPoint> = candidate.points().map(|p| self.fit_point(p)).collect();

        let has_left = candidate.points().any(|p| p.side == CellSide::Left);
        let has_right = candidate.points().any(|p| p.side == CellSide::Right);
        let with_offset =
            model == FitModel::WithT0 && points.len() >= 3 && has_left && has_right;

        if with_offset {
            let line = fit_line_with_offset(&points)?;
            // Hits must stay inside their cells on the same side of the wire.
            let inside = candidate.points().all(|p| {
                let corrected = p.hit.drift_distance() - line.offset;
                (0.0..=p.hit.max_drift()).contains(&corrected)
            });
            if !inside {
                return None;
            }
            Some(self.candidate_fit(&line))
        } else {
            fit_line(&points).map(|line| self.candidate_fit(&line))
        }
    }

    fn candidate_fit(&self, line: &LineFit) -> CandidateFit {
        let t0 = if line.n_params == 3 {
            line.offset / self.config.drift_velocity
        } else {
            0.0
        };
        CandidateFit {
            position: line.intercept,
            slope: line.slope,
            t0,
            drift_offset: line.offset,
            chi2: line.chi2,
            covariance: line.covariance,
        }
    }
}

impl SegmentUpdator for LinearUpdator {
    fn fit(&self, candidate: &mut SegmentCandidate, model: FitModel, debug: bool) {
        let result = self.solve(candidate, model);
        if debug {
            match &result {
                Some(fit) => log::debug!(
                    "fit {model:?}: {} hits chi2 {:.4} t0 {:.2} slope {:.4}",
                    candidate.n_hits(),
                    fit.chi2,
                    fit.t0,
                    fit.slope
                ),
                None => log::debug!("fit {model:?}: {} hits failed", candidate.n_hits()),
            }
        }
        candidate.set_fit(result);
    }

    #[allow(clippy::float_cmp)]
    fn update(&self, candidate: &SegmentCandidate) -> Segment2D {
        let mut refined = candidate.clone();
        self.fit(&mut refined, self.config.final_model, false);
        // A refit can fail once the cleaner has stripped hits; keep the search fit then.
        let fit = refined
            .fit()
            .or_else(|| candidate.fit())
            .copied()
            .unwrap_or_else(unfitted);

        let hits: Vec<SegmentHit> = candidate
            .points()
            .map(|p| {
                let drift_distance = p.hit.drift_distance() - fit.drift_offset;
                SegmentHit {
                    wire: p.hit.wire(),
                    side: p.side,
                    local_x: p.hit.wire_x() + p.side.sign() * drift_distance,
                    drift_distance,
                }
            })
            .collect();

        let n_params = if fit.t0 == 0.0 { 2 } else { 3 };
        Segment2D {
            superlayer: candidate.superlayer(),
            position: Point3::new(fit.position, 0.0, 0.0),
            direction: Vector3::new(fit.slope, 0.0, 1.0).normalize(),
            covariance: fit.covariance,
            chi2: fit.chi2,
            degrees_of_freedom: hits.len().saturating_sub(n_params),
            t0: fit.t0,
            hits,
        }
    }

    fn name(&self) -> &'static str {
        "Linear"
    }
}

fn unfitted() -> CandidateFit {
    CandidateFit {
        position: 0.0,
        slope: 0.0,
        t0: 0.0,
        drift_offset: 0.0,
        chi2: FAILED_FIT_CHI2,
        covariance: Matrix2::zeros(),
    }
}
