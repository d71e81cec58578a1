//! Super-layer geometry.
//!
//! A super-layer is a stack of staggered drift-cell layers sharing one
//! measurement direction. The local frame has `x` along the measured
//! coordinate, `y` along the wires and `z` normal to the layers, pointing
//! away from the interaction region. Even layers are shifted by half a
//! cell towards negative `x`.

use crate::{Error, Result, WireId};
use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of the super-layer measuring the theta coordinate.
pub const THETA_SUPERLAYER: u8 = 2;

/// Drift-cell dimensions of a super-layer (centimetres).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellGeometry {
    /// Cell pitch along local x.
    pub width: f64,
    /// Layer pitch along local z.
    pub height: f64,
    /// Number of layers in the super-layer.
    pub n_layers: u8,
    /// Number of wires per layer.
    pub n_wires: u16,
}

impl Default for CellGeometry {
    fn default() -> Self {
        Self {
            width: 4.2,
            height: 1.3,
            n_layers: 4,
            n_wires: 96,
        }
    }
}

impl CellGeometry {
    /// Largest physical drift distance (half the cell width).
    #[inline]
    #[must_use]
    pub fn max_drift(&self) -> f64 {
        self.width / 2.0
    }
}

/// Read-only description of one super-layer and its placement in space.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SuperLayer {
    index: u8,
    cell: CellGeometry,
    placement: Isometry3<f64>,
}

impl SuperLayer {
    /// Creates a super-layer from an explicit local-to-global placement.
    #[must_use]
    pub fn new(index: u8, cell: CellGeometry, placement: Isometry3<f64>) -> Self {
        Self {
            index,
            cell,
            placement,
        }
    }

    /// Places a super-layer in a barrel station at `radius`, centred at
    /// global `z`, in the sector at azimuth zero.
    ///
    /// Phi super-layers measure along global y with wires parallel to the
    /// beam; the theta super-layer measures along global z. Local z points
    /// radially outward in both cases.
    #[must_use]
    pub fn barrel(index: u8, radius: f64, z: f64) -> Self {
        let outward = Vector3::x();
        let (measured, along_wire) = if index == THETA_SUPERLAYER {
            (Vector3::z(), -Vector3::y())
        } else {
            (Vector3::y(), Vector3::z())
        };
        let rotation =
            Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[measured, along_wire, outward]));
        let placement = Isometry3::from_parts(
            Translation3::new(radius, 0.0, z),
            UnitQuaternion::from_rotation_matrix(&rotation),
        );
        Self::new(index, CellGeometry::default(), placement)
    }

    /// Replaces the cell geometry.
    #[must_use]
    pub fn with_cell(mut self, cell: CellGeometry) -> Self {
        self.cell = cell;
        self
    }

    /// Super-layer index within the chamber.
    #[inline]
    #[must_use]
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Cell dimensions.
    #[inline]
    #[must_use]
    pub fn cell(&self) -> &CellGeometry {
        &self.cell
    }

    /// Returns true for the theta-measuring super-layer.
    #[inline]
    #[must_use]
    pub fn is_theta(&self) -> bool {
        self.index == THETA_SUPERLAYER
    }

    /// Local z of the wire plane of `layer`.
    #[must_use]
    pub fn layer_z(&self, layer: u8) -> f64 {
        let centre = (f64::from(self.cell.n_layers) + 1.0) / 2.0;
        (f64::from(layer) - centre) * self.cell.height
    }

    /// Local x of `wire` in `layer`.
    #[must_use]
    pub fn wire_x(&self, layer: u8, wire: u16) -> f64 {
        let stagger = if layer % 2 == 0 {
            -self.cell.width / 2.0
        } else {
            0.0
        };
        (f64::from(wire) - 1.0) * self.cell.width + stagger
    }

    /// Local position of the wire itself.
    #[must_use]
    pub fn wire_position(&self, wire: WireId) -> Point3<f64> {
        Point3::new(
            self.wire_x(wire.layer, wire.wire),
            0.0,
            self.layer_z(wire.layer),
        )
    }

    /// Checks that `wire` lies inside this super-layer.
    ///
    /// # Errors
    /// Returns an error if the super-layer index, layer or wire number is out of range.
    pub fn validate_wire(&self, wire: WireId) -> Result<()> {
        if wire.superlayer != self.index {
            return Err(Error::InvalidSuperLayer {
                expected: self.index,
                found: wire.superlayer,
            });
        }
        if wire.layer == 0 || wire.layer > self.cell.n_layers {
            return Err(Error::InvalidLayer {
                layer: wire.layer,
                n_layers: self.cell.n_layers,
            });
        }
        if wire.wire == 0 || wire.wire > self.cell.n_wires {
            return Err(Error::InvalidWire {
                layer: wire.layer,
                wire: wire.wire,
            });
        }
        Ok(())
    }

    /// Transforms a local point to the global frame.
    #[inline]
    #[must_use]
    pub fn to_global(&self, local: &Point3<f64>) -> Point3<f64> {
        self.placement.transform_point(local)
    }

    /// Rotates a local vector to the global frame.
    #[inline]
    #[must_use]
    pub fn to_global_vector(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.placement.transform_vector(local)
    }
}

/// Polar angle of `v` with respect to the global z axis, in `[0, pi]`.
#[inline]
#[must_use]
pub fn polar_angle(v: &Vector3<f64>) -> f64 {
    v.x.hypot(v.y).atan2(v.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_layer_and_wire_positions() {
        let sl = SuperLayer::barrel(1, 400.0, 0.0);
        assert_relative_eq!(sl.layer_z(1), -1.95);
        assert_relative_eq!(sl.layer_z(4), 1.95);
        assert_relative_eq!(sl.wire_x(1, 3), 8.4);
        assert_relative_eq!(sl.wire_x(2, 3), 6.3);
    }

    #[test]
    fn test_phi_placement() {
        let sl = SuperLayer::barrel(1, 400.0, 0.0);
        let global = sl.to_global(&Point3::new(5.0, 0.0, 1.0));
        assert_relative_eq!(global.x, 401.0, epsilon = 1e-9);
        assert_relative_eq!(global.y, 5.0, epsilon = 1e-9);
        assert_relative_eq!(global.z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_theta_placement() {
        let sl = SuperLayer::barrel(2, 400.0, 10.0);
        assert!(sl.is_theta());
        let global = sl.to_global(&Point3::new(5.0, 0.0, 1.0));
        assert_relative_eq!(global.x, 401.0, epsilon = 1e-9);
        assert_relative_eq!(global.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(global.z, 15.0, epsilon = 1e-9);
    }

    #[test]
    fn test_validate_wire() {
        let sl = SuperLayer::barrel(3, 400.0, 0.0);
        assert!(sl.validate_wire(WireId::new(3, 4, 96)).is_ok());
        assert!(matches!(
            sl.validate_wire(WireId::new(1, 1, 1)),
            Err(Error::InvalidSuperLayer { .. })
        ));
        assert!(matches!(
            sl.validate_wire(WireId::new(3, 5, 1)),
            Err(Error::InvalidLayer { .. })
        ));
        assert!(matches!(
            sl.validate_wire(WireId::new(3, 1, 0)),
            Err(Error::InvalidWire { .. })
        ));
    }

    #[test]
    fn test_polar_angle() {
        assert_relative_eq!(polar_angle(&Vector3::z()), 0.0);
        assert_relative_eq!(polar_angle(&Vector3::x()), std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(polar_angle(&-Vector3::z()), std::f64::consts::PI);
    }
}
