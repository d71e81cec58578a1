//! Segment candidates and finished segments.

use crate::{CellSide, HitForFit, HitId, SuperLayer, WireId};
use nalgebra::{Matrix2, Point3, Vector3};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Chi-square reported for a candidate whose fit failed or never ran.
pub const FAILED_FIT_CHI2: f64 = -1.0;

/// Default upper bound on chi-square per degree of freedom for a good candidate.
pub const DEFAULT_SEGMENT_CHI2_MAX: f64 = 20.0;

/// A hit together with the side it contributes to a candidate.
#[derive(Debug, Clone)]
pub struct AssociationPoint {
    /// Shared handle to the hit.
    pub hit: Arc<HitForFit>,
    /// Resolved side.
    pub side: CellSide,
}

impl AssociationPoint {
    /// Creates an association point.
    #[inline]
    #[must_use]
    pub fn new(hit: Arc<HitForFit>, side: CellSide) -> Self {
        Self { hit, side }
    }

    /// Identity of the underlying hit.
    #[inline]
    #[must_use]
    pub fn hit_id(&self) -> HitId {
        self.hit.id()
    }

    /// Local position under the associated side.
    #[inline]
    #[must_use]
    pub fn position(&self) -> Point3<f64> {
        self.hit.local_position(self.side)
    }
}

/// Fitted trajectory parameters of a candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateFit {
    /// Local x at `z = 0`.
    pub position: f64,
    /// `dx/dz`.
    pub slope: f64,
    /// Fitted time offset (ns); exactly zero when no timing was resolved.
    pub t0: f64,
    /// Drift-distance shift corresponding to `t0`.
    pub drift_offset: f64,
    /// Chi-square of the fit.
    pub chi2: f64,
    /// Covariance of (slope, position).
    pub covariance: Matrix2<f64>,
}

/// A set of side-resolved hits hypothesised to come from one straight track.
///
/// Points are keyed by hit identity; inserting a hit that is already
/// present keeps the first association.
#[derive(Debug, Clone)]
pub struct SegmentCandidate {
    superlayer: u8,
    points: BTreeMap<HitId, AssociationPoint>,
    fit: Option<CandidateFit>,
}

impl SegmentCandidate {
    /// Creates an empty, unfitted candidate.
    #[must_use]
    pub fn new(superlayer: u8) -> Self {
        Self {
            superlayer,
            points: BTreeMap::new(),
            fit: None,
        }
    }

    /// Builds an unfitted candidate from association points.
    pub fn from_points<I>(superlayer: u8, points: I) -> Self
    where
        I: IntoIterator<Item = AssociationPoint>,
    {
        let mut candidate = Self::new(superlayer);
        for point in points {
            candidate.insert(point);
        }
        candidate
    }

    /// Adds a point unless its hit is already associated. Returns true if inserted.
    pub fn insert(&mut self, point: AssociationPoint) -> bool {
        match self.points.entry(point.hit_id()) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(point);
                true
            }
        }
    }

    /// Removes the association of `hit`. Returns the removed point, if any.
    pub fn remove_hit(&mut self, hit: HitId) -> Option<AssociationPoint> {
        self.points.remove(&hit)
    }

    /// Super-layer index the candidate lives in.
    #[inline]
    #[must_use]
    pub fn superlayer(&self) -> u8 {
        self.superlayer
    }

    /// Association points ordered by hit identity.
    pub fn points(&self) -> impl Iterator<Item = &AssociationPoint> {
        self.points.values()
    }

    /// Side associated with `hit`, if the hit belongs to the candidate.
    #[must_use]
    pub fn side_of(&self, hit: HitId) -> Option<CellSide> {
        self.points.get(&hit).map(|p| p.side)
    }

    /// Number of associated hits.
    #[inline]
    #[must_use]
    pub fn n_hits(&self) -> usize {
        self.points.len()
    }

    /// Returns true if no hit is associated.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Fit result, if a fit succeeded.
    #[inline]
    #[must_use]
    pub fn fit(&self) -> Option<&CandidateFit> {
        self.fit.as_ref()
    }

    /// Records a fit result; `None` marks the fit as failed.
    pub fn set_fit(&mut self, fit: Option<CandidateFit>) {
        self.fit = fit;
    }

    /// Returns true if the last fit succeeded.
    #[inline]
    #[must_use]
    pub fn has_fit(&self) -> bool {
        self.fit.is_some()
    }

    /// Chi-square of the fit, or [`FAILED_FIT_CHI2`] without a valid fit.
    #[inline]
    #[must_use]
    pub fn chi2(&self) -> f64 {
        self.fit.map_or(FAILED_FIT_CHI2, |f| f.chi2)
    }

    /// Fitted time offset, zero without one.
    #[inline]
    #[must_use]
    pub fn t0(&self) -> f64 {
        self.fit.map_or(0.0, |f| f.t0)
    }

    /// Hit count minus fitted parameters (two, or three with a time offset).
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn degrees_of_freedom(&self) -> usize {
        let n_params = if self.t0() == 0.0 { 2 } else { 3 };
        self.n_hits().saturating_sub(n_params)
    }

    /// Chi-square per degree of freedom; the bare chi-square when none is left.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn chi2_ndof(&self) -> f64 {
        match self.degrees_of_freedom() {
            0 => self.chi2(),
            dof => self.chi2() / dof as f64,
        }
    }

    /// At least three hits and an acceptable chi-square per degree of freedom.
    #[must_use]
    pub fn is_good(&self, chi2_max: f64) -> bool {
        self.has_fit() && self.n_hits() >= 3 && self.chi2_ndof() < chi2_max
    }

    /// Number of hits shared with `other`, whatever their sides.
    #[must_use]
    pub fn n_shared_hit_pairs(&self, other: &Self) -> usize {
        self.points
            .keys()
            .filter(|id| other.points.contains_key(id))
            .count()
    }

    /// Hits shared with `other` but associated with opposite sides.
    #[must_use]
    pub fn conflicting_hit_pairs(&self, other: &Self) -> Vec<HitId> {
        self.points
            .iter()
            .filter(|(id, point)| other.side_of(**id).is_some_and(|s| s != point.side))
            .map(|(id, _)| *id)
            .collect()
    }
}

impl PartialEq for SegmentCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.n_hits() == other.n_hits()
            && self
                .points
                .iter()
                .all(|(id, point)| other.side_of(*id) == Some(point.side))
    }
}

impl fmt::Display for SegmentCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SL{} nHits {} chi2 {:.3} t0 {:.2} [",
            self.superlayer,
            self.n_hits(),
            self.chi2(),
            self.t0()
        )?;
        for (i, point) in self.points().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}{}", point.hit.wire(), point.side.tag())?;
        }
        write!(f, "]")
    }
}

/// One hit of a finished segment.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentHit {
    /// Wire of the hit.
    pub wire: WireId,
    /// Resolved side.
    pub side: CellSide,
    /// Local x after time-offset correction.
    pub local_x: f64,
    /// Drift distance after time-offset correction.
    pub drift_distance: f64,
}

/// A finished, fit-refined two-dimensional segment in one super-layer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment2D {
    /// Super-layer index.
    pub superlayer: u8,
    /// Local position at `z = 0`.
    pub position: Point3<f64>,
    /// Local unit direction, pointing away from the interaction region.
    pub direction: Vector3<f64>,
    /// Covariance of (slope, position).
    pub covariance: Matrix2<f64>,
    /// Chi-square of the final fit.
    pub chi2: f64,
    /// Degrees of freedom of the final fit.
    pub degrees_of_freedom: usize,
    /// Fitted time offset (ns).
    pub t0: f64,
    /// Side-resolved hits.
    pub hits: Vec<SegmentHit>,
}

impl Segment2D {
    /// Number of hits.
    #[inline]
    #[must_use]
    pub fn n_hits(&self) -> usize {
        self.hits.len()
    }

    /// Local slope `dx/dz`.
    #[inline]
    #[must_use]
    pub fn slope(&self) -> f64 {
        self.direction.x / self.direction.z
    }

    /// Position in the global frame.
    #[must_use]
    pub fn global_position(&self, superlayer: &SuperLayer) -> Point3<f64> {
        superlayer.to_global(&self.position)
    }

    /// Direction in the global frame.
    #[must_use]
    pub fn global_direction(&self, superlayer: &SuperLayer) -> Vector3<f64> {
        superlayer.to_global_vector(&self.direction)
    }
}

impl fmt::Display for Segment2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SL{} pos ({:.4}, {:.4}) slope {:.4} chi2/ndof {:.3}/{} t0 {:.2} nHits {}",
            self.superlayer,
            self.position.x,
            self.position.z,
            self.slope(),
            self.chi2,
            self.degrees_of_freedom,
            self.t0,
            self.n_hits()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecHitPair;

    fn hits(n: u8) -> Vec<Arc<HitForFit>> {
        let sl = SuperLayer::barrel(1, 400.0, 0.0);
        (1..=n)
            .map(|layer| {
                let pair = RecHitPair::new(WireId::new(1, layer, 5), 0.5, 0.0);
                Arc::new(HitForFit::new(HitId(usize::from(layer)), &pair, &sl))
            })
            .collect()
    }

    fn candidate(hits: &[Arc<HitForFit>], sides: &[CellSide]) -> SegmentCandidate {
        SegmentCandidate::from_points(
            1,
            hits.iter()
                .zip(sides)
                .map(|(h, s)| AssociationPoint::new(Arc::clone(h), *s)),
        )
    }

    fn fitted(mut c: SegmentCandidate, chi2: f64, t0: f64) -> SegmentCandidate {
        c.set_fit(Some(CandidateFit {
            position: 0.0,
            slope: 0.0,
            t0,
            drift_offset: 0.0,
            chi2,
            covariance: Matrix2::identity(),
        }));
        c
    }

    #[test]
    fn test_insert_first_wins() {
        let h = hits(2);
        let mut c = SegmentCandidate::new(1);
        assert!(c.insert(AssociationPoint::new(Arc::clone(&h[0]), CellSide::Left)));
        assert!(!c.insert(AssociationPoint::new(Arc::clone(&h[0]), CellSide::Right)));
        assert_eq!(c.n_hits(), 1);
        assert_eq!(c.side_of(h[0].id()), Some(CellSide::Left));
    }

    #[test]
    fn test_set_equality() {
        use CellSide::{Left, Right};
        let h = hits(3);
        let a = candidate(&h, &[Left, Right, Left]);
        let b = candidate(&h, &[Left, Right, Left]);
        let c = candidate(&h, &[Left, Right, Right]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, candidate(&h[..2], &[Left, Right]));
    }

    #[test]
    fn test_shared_and_conflicting() {
        use CellSide::{Left, Right};
        let h = hits(4);
        let a = candidate(&h[..3], &[Left, Right, Left]);
        let b = candidate(&h[1..], &[Right, Right, Left]);
        assert_eq!(a.n_shared_hit_pairs(&b), 2);
        assert_eq!(a.conflicting_hit_pairs(&b), vec![h[2].id()]);
    }

    #[test]
    fn test_chi2_ndof_and_good() {
        use CellSide::{Left, Right};
        let h = hits(4);
        let unfitted = candidate(&h, &[Left, Right, Left, Right]);
        assert!((unfitted.chi2() - FAILED_FIT_CHI2).abs() < f64::EPSILON);
        assert!(!unfitted.is_good(DEFAULT_SEGMENT_CHI2_MAX));

        let two_par = fitted(unfitted.clone(), 10.0, 0.0);
        assert_eq!(two_par.degrees_of_freedom(), 2);
        assert!((two_par.chi2_ndof() - 5.0).abs() < 1e-12);
        assert!(two_par.is_good(DEFAULT_SEGMENT_CHI2_MAX));

        let three_par = fitted(unfitted, 10.0, 3.5);
        assert_eq!(three_par.degrees_of_freedom(), 1);
        assert!((three_par.chi2_ndof() - 10.0).abs() < 1e-12);
        assert!(!three_par.is_good(8.0));
    }

    #[test]
    fn test_remove_hit() {
        use CellSide::{Left, Right};
        let h = hits(3);
        let mut c = candidate(&h, &[Left, Right, Left]);
        assert!(c.remove_hit(h[1].id()).is_some());
        assert!(c.remove_hit(h[1].id()).is_none());
        assert_eq!(c.n_hits(), 2);
    }
}
