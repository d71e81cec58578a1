//! Geometric compatibility of two hits.
//!
//! Two hits can belong to the same straight segment only if their wires
//! are close enough given the layer separation. The admission window is a
//! per-layer-distance table of exclusive bounds on the signed wire distance.

use driftseg_core::WireId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Largest layer distance inside one super-layer.
pub const MAX_LAYER_DISTANCE: u8 = 3;

/// Exclusive bounds on the signed wire distance, indexed by layer distance.
///
/// Index 0 is unused (hits in the same layer are never compatible).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompatibilityWindow {
    /// Lower bounds; the wire distance must be strictly greater.
    pub lower: [i32; 4],
    /// Upper bounds; the wire distance must be strictly smaller.
    pub upper: [i32; 4],
}

impl Default for CompatibilityWindow {
    fn default() -> Self {
        Self {
            lower: [0, -1, -2, -2],
            upper: [0, 2, 2, 3],
        }
    }
}

impl CompatibilityWindow {
    /// Wider window admitting steeper tracks.
    #[must_use]
    pub fn wide() -> Self {
        Self {
            lower: [0, -2, -4, -5],
            upper: [0, 3, 4, 6],
        }
    }

    /// Returns true if hits on `first` and `second` may lie on one segment.
    ///
    /// Hits in different super-layers are always accepted; hits in the same
    /// layer never are. A layer distance beyond the super-layer depth is a
    /// numbering anomaly: it is logged and rejected.
    #[must_use]
    pub fn is_compatible(&self, first: WireId, second: WireId) -> bool {
        if !first.same_superlayer(&second) {
            return true;
        }

        let delta_layer = first.layer_distance(&second);
        if delta_layer == 0 {
            return false;
        }

        if delta_layer > MAX_LAYER_DISTANCE {
            log::warn!(
                "layer numbers differ by more than {MAX_LAYER_DISTANCE} for hits {first} and {second}"
            );
            return false;
        }

        // Even layers are staggered by half a cell in the opposite direction.
        let mut delta_wire = first.wire_delta(&second);
        if second.layer % 2 == 0 {
            delta_wire = -delta_wire;
        }

        let d = usize::from(delta_layer);
        delta_wire > self.lower[d] && delta_wire < self.upper[d]
    }
}
