//! Hit types for drift-tube data.

use crate::{CellSide, SuperLayer, WireId};
use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default single-hit resolution (cm).
pub const DEFAULT_HIT_ERROR: f64 = 0.02;

/// A reconstructed drift-cell hit with its left/right ambiguity unresolved.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecHitPair {
    /// Wire that fired.
    pub wire: WireId,
    /// Distance of the track from the wire (cm), before any time-offset correction.
    pub drift_distance: f64,
    /// Raw electronics time (ns).
    pub drift_time: f64,
    /// Position error (cm).
    #[cfg_attr(feature = "serde", serde(default = "default_hit_error"))]
    pub error: f64,
}

#[cfg(feature = "serde")]
fn default_hit_error() -> f64 {
    DEFAULT_HIT_ERROR
}

impl RecHitPair {
    /// Creates a hit pair with the default resolution.
    #[must_use]
    pub fn new(wire: WireId, drift_distance: f64, drift_time: f64) -> Self {
        Self {
            wire,
            drift_distance,
            drift_time,
            error: DEFAULT_HIT_ERROR,
        }
    }

    /// Sets the position error.
    #[must_use]
    pub fn with_error(mut self, error: f64) -> Self {
        self.error = error;
        self
    }
}

/// Identity of a hit within one super-layer reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitId(pub usize);

/// A hit pair resolved in the super-layer frame, ready for fitting.
///
/// Candidates share these through `Arc` and compare them by [`HitId`].
#[derive(Debug, Clone, PartialEq)]
pub struct HitForFit {
    id: HitId,
    wire: WireId,
    left: Point3<f64>,
    right: Point3<f64>,
    drift_distance: f64,
    max_drift: f64,
    error: f64,
    digi_time: f64,
}

impl HitForFit {
    /// Resolves `pair` in the frame of `superlayer`.
    ///
    /// The wire is expected to belong to `superlayer`.
    #[must_use]
    pub fn new(id: HitId, pair: &RecHitPair, superlayer: &SuperLayer) -> Self {
        let wire_pos = superlayer.wire_position(pair.wire);
        let d = pair.drift_distance;
        Self {
            id,
            wire: pair.wire,
            left: Point3::new(wire_pos.x - d, wire_pos.y, wire_pos.z),
            right: Point3::new(wire_pos.x + d, wire_pos.y, wire_pos.z),
            drift_distance: d,
            max_drift: superlayer.cell().max_drift(),
            error: pair.error,
            digi_time: pair.drift_time,
        }
    }

    /// Hit identity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> HitId {
        self.id
    }

    /// Wire that produced the hit.
    #[inline]
    #[must_use]
    pub fn wire(&self) -> WireId {
        self.wire
    }

    /// Local position under the given side hypothesis.
    #[inline]
    #[must_use]
    pub fn local_position(&self, side: CellSide) -> Point3<f64> {
        match side {
            CellSide::Left => self.left,
            CellSide::Right => self.right,
        }
    }

    /// Local z of the hit's layer.
    #[inline]
    #[must_use]
    pub fn z(&self) -> f64 {
        self.left.z
    }

    /// Local x of the wire.
    #[inline]
    #[must_use]
    pub fn wire_x(&self) -> f64 {
        (self.left.x + self.right.x) / 2.0
    }

    /// Uncorrected drift distance.
    #[inline]
    #[must_use]
    pub fn drift_distance(&self) -> f64 {
        self.drift_distance
    }

    /// Largest drift distance the hit's cell allows.
    #[inline]
    #[must_use]
    pub fn max_drift(&self) -> f64 {
        self.max_drift
    }

    /// Position error.
    #[inline]
    #[must_use]
    pub fn error(&self) -> f64 {
        self.error
    }

    /// Raw electronics time of the underlying digi.
    #[inline]
    #[must_use]
    pub fn digi_time(&self) -> f64 {
        self.digi_time
    }
}
