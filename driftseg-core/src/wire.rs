//! Wire identifiers and cell-side ambiguity.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifies a single sense wire inside a chamber.
///
/// Layers and wires are numbered from 1, following the detector convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WireId {
    /// Super-layer index (1 and 3 measure phi, 2 measures theta).
    pub superlayer: u8,
    /// Layer within the super-layer.
    pub layer: u8,
    /// Wire within the layer.
    pub wire: u16,
}

impl WireId {
    /// Creates a new wire identifier.
    #[inline]
    #[must_use]
    pub fn new(superlayer: u8, layer: u8, wire: u16) -> Self {
        Self {
            superlayer,
            layer,
            wire,
        }
    }

    /// Returns true if both wires belong to the same super-layer.
    #[inline]
    #[must_use]
    pub fn same_superlayer(&self, other: &Self) -> bool {
        self.superlayer == other.superlayer
    }

    /// Returns true if both wires are in the same layer of the same super-layer.
    #[inline]
    #[must_use]
    pub fn same_layer(&self, other: &Self) -> bool {
        self.same_superlayer(other) && self.layer == other.layer
    }

    /// Absolute layer distance between the two wires.
    #[inline]
    #[must_use]
    pub fn layer_distance(&self, other: &Self) -> u8 {
        self.layer.abs_diff(other.layer)
    }

    /// Signed wire-number difference `self - other`.
    #[inline]
    #[must_use]
    pub fn wire_delta(&self, other: &Self) -> i32 {
        i32::from(self.wire) - i32::from(other.wire)
    }
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SL{}/L{}/W{}", self.superlayer, self.layer, self.wire)
    }
}

/// Which side of the wire a hit is assumed to lie on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CellSide {
    /// Towards smaller local x.
    Left,
    /// Towards larger local x.
    Right,
}

impl CellSide {
    /// Both sides, left first.
    pub const ALL: [CellSide; 2] = [CellSide::Left, CellSide::Right];

    /// Sign of the drift-distance contribution to the local x position.
    #[inline]
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            CellSide::Left => -1.0,
            CellSide::Right => 1.0,
        }
    }

    /// The mirror side.
    #[inline]
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            CellSide::Left => CellSide::Right,
            CellSide::Right => CellSide::Left,
        }
    }

    /// Single-letter tag used in pattern dumps.
    #[inline]
    #[must_use]
    pub fn tag(self) -> char {
        match self {
            CellSide::Left => 'L',
            CellSide::Right => 'R',
        }
    }
}
