//! Acceptance policy applied to every trial candidate.

use crate::{FitModel, PatternRecoConfig, SegmentUpdator};
use driftseg_core::{AssociationPoint, SegmentCandidate};

/// Fits a trial association set and decides whether to keep it.
///
/// Rejection is the common outcome of the search and is reported as `None`;
/// the caller's association set is never touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitGate {
    max_chi2: f64,
    no_t0_chi2_cut: f64,
}

impl Default for FitGate {
    fn default() -> Self {
        Self::from_config(&PatternRecoConfig::default())
    }
}

impl FitGate {
    /// Creates a gate with explicit cuts.
    #[must_use]
    pub fn new(max_chi2: f64, no_t0_chi2_cut: f64) -> Self {
        Self {
            max_chi2,
            no_t0_chi2_cut,
        }
    }

    /// Takes the cuts from a pattern recognition configuration.
    #[must_use]
    pub fn from_config(config: &PatternRecoConfig) -> Self {
        Self::new(config.max_chi2, config.no_t0_chi2_cut)
    }

    /// Builds a candidate from `points`, fits it and applies the cuts.
    ///
    /// * failed fit: rejected;
    /// * exactly three points: accepted;
    /// * no time offset resolved: accepted below the loose chi-square cut;
    /// * otherwise: accepted if `chi2 / (n - 3)` is below `max_chi2`.
    #[allow(clippy::float_cmp, clippy::cast_precision_loss)]
    pub fn evaluate<U>(
        &self,
        superlayer: u8,
        points: &[AssociationPoint],
        updator: &U,
        model: FitModel,
        debug: bool,
    ) -> Option<SegmentCandidate>
    where
        U: SegmentUpdator + ?Sized,
    {
        let mut candidate = SegmentCandidate::from_points(superlayer, points.iter().cloned());
        updator.fit(&mut candidate, model, debug);

        let fit = candidate.fit()?;
        let n = candidate.n_hits();
        let accepted = if n == 3 {
            true
        } else if fit.t0 == 0.0 {
            fit.chi2 < self.no_t0_chi2_cut
        } else {
            n > 3 && fit.chi2 / ((n - 3) as f64) < self.max_chi2
        };

        accepted.then_some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftseg_core::{
        CandidateFit, CellSide, HitForFit, HitId, RecHitPair, Segment2D, SuperLayer, WireId,
    };
    use nalgebra::{Matrix2, Point3, Vector3};
    use std::sync::Arc;

    /// Reports a fixed result whatever the input.
    struct FixedFit(Option<(f64, f64)>);

    impl SegmentUpdator for FixedFit {
        fn fit(&self, candidate: &mut SegmentCandidate, _model: FitModel, _debug: bool) {
            candidate.set_fit(self.0.map(|(chi2, t0)| CandidateFit {
                position: 0.0,
                slope: 0.0,
                t0,
                drift_offset: 0.0,
                chi2,
                covariance: Matrix2::identity(),
            }));
        }

        fn update(&self, candidate: &SegmentCandidate) -> Segment2D {
            Segment2D {
                superlayer: candidate.superlayer(),
                position: Point3::origin(),
                direction: Vector3::z(),
                covariance: Matrix2::identity(),
                chi2: candidate.chi2(),
                degrees_of_freedom: 0,
                t0: 0.0,
                hits: Vec::new(),
            }
        }

        fn name(&self) -> &'static str {
            "Fixed"
        }
    }

    fn points(n: u8) -> Vec<AssociationPoint> {
        let sl = SuperLayer::barrel(1, 400.0, 0.0);
        (1..=n)
            .map(|layer| {
                let pair = RecHitPair::new(WireId::new(1, layer, 5), 0.5, 0.0);
                let hit = HitForFit::new(HitId(usize::from(layer)), &pair, &sl);
                AssociationPoint::new(Arc::new(hit), CellSide::Left)
            })
            .collect()
    }

    fn accepts(n: u8, fit: Option<(f64, f64)>) -> bool {
        FitGate::default()
            .evaluate(1, &points(n), &FixedFit(fit), FitModel::WithT0, false)
            .is_some()
    }

    #[test]
    fn test_failed_fit_rejected() {
        assert!(!accepts(3, None));
        assert!(!accepts(4, None));
    }

    #[test]
    fn test_three_points_always_accepted() {
        assert!(accepts(3, Some((1.0e6, 0.0))));
        assert!(accepts(3, Some((1.0e6, 12.0))));
    }

    #[test]
    fn test_no_t0_loose_cut() {
        assert!(accepts(4, Some((199.9, 0.0))));
        assert!(!accepts(4, Some((200.0, 0.0))));
        assert!(!accepts(4, Some((350.0, 0.0))));
    }

    #[test]
    fn test_chi2_per_dof_cut() {
        // Four hits with a time offset leave one degree of freedom.
        assert!(accepts(4, Some((7.9, 3.0))));
        assert!(!accepts(4, Some((8.0, 3.0))));
        // Five hits leave two.
        assert!(accepts(5, Some((15.0, 3.0))));
        assert!(!accepts(5, Some((17.0, 3.0))));
    }

    #[test]
    fn test_duplicate_hits_collapse() {
        let mut pts = points(3);
        pts.push(AssociationPoint::new(Arc::clone(&pts[0].hit), CellSide::Right));
        let candidate = FitGate::default()
            .evaluate(1, &pts, &FixedFit(Some((1.0e6, 3.0))), FitModel::WithT0, false)
            .unwrap();
        assert_eq!(candidate.n_hits(), 3);
        assert_eq!(candidate.side_of(HitId(1)), Some(CellSide::Left));
        assert_eq!(pts.len(), 4);
    }
}
