//! Weighted least-squares straight-line fits.
//!
//! Two models are provided: the plain line `x = a + b z`, and the line with
//! a common drift offset `x = a + b z + s c`, where `s` is the side sign of
//! each point (-1 left, +1 right) and `c` the drift-distance shift shared
//! by all hits. The offset model is what recovers a time offset from
//! hits on both sides of their wires.
#![allow(clippy::many_single_char_names)]

use nalgebra::{Matrix2, Matrix3, Vector3};

/// Relative determinant below which a normal-equation system is considered singular.
const SINGULAR_TOLERANCE: f64 = 1e-10;

/// One measurement entering a line fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitPoint {
    /// Coordinate along the fit axis (local z).
    pub z: f64,
    /// Measured coordinate (local x).
    pub x: f64,
    /// Measurement error.
    pub sigma: f64,
    /// Side sign multiplying the common offset.
    pub lr_sign: f64,
}

impl FitPoint {
    /// Creates a fit point.
    #[inline]
    #[must_use]
    pub fn new(z: f64, x: f64, sigma: f64, lr_sign: f64) -> Self {
        Self {
            z,
            x,
            sigma,
            lr_sign,
        }
    }

    #[inline]
    fn weight(&self) -> f64 {
        1.0 / (self.sigma * self.sigma)
    }
}

/// Result of a line fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    /// Position at `z = 0`.
    pub intercept: f64,
    /// `dx/dz`.
    pub slope: f64,
    /// Common drift offset (zero for the plain line model).
    pub offset: f64,
    /// Weighted sum of squared residuals.
    pub chi2: f64,
    /// Covariance of (slope, intercept).
    pub covariance: Matrix2<f64>,
    /// Number of fitted parameters.
    pub n_params: usize,
}

impl LineFit {
    /// Residual of `point` with respect to the fitted model.
    #[inline]
    #[must_use]
    pub fn residual(&self, point: &FitPoint) -> f64 {
        point.x - self.intercept - self.slope * point.z - point.lr_sign * self.offset
    }
}

/// Fits `x = a + b z`. Returns `None` for fewer than two points or a singular system.
#[must_use]
pub fn fit_line(points: &[FitPoint]) -> Option<LineFit> {
    if points.len() < 2 {
        return None;
    }

    let (mut s, mut sz, mut szz, mut sx, mut szx) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for p in points {
        let w = p.weight();
        s += w;
        sz += w * p.z;
        szz += w * p.z * p.z;
        sx += w * p.x;
        szx += w * p.z * p.x;
    }

    let det = s * szz - sz * sz;
    if det.abs() <= SINGULAR_TOLERANCE * (s * szz).abs() {
        return None;
    }

    let slope = (s * szx - sz * sx) / det;
    let intercept = (szz * sx - sz * szx) / det;
    let covariance = Matrix2::new(s / det, -sz / det, -sz / det, szz / det);

    let mut fit = LineFit {
        intercept,
        slope,
        offset: 0.0,
        chi2: 0.0,
        covariance,
        n_params: 2,
    };
    fit.chi2 = chi2(&fit, points);
    Some(fit)
}

/// Fits `x = a + b z + s c`. Returns `None` for fewer than three points or a
/// singular system (for instance when every point has the same side sign).
#[must_use]
pub fn fit_line_with_offset(points: &[FitPoint]) -> Option<LineFit> {
    if points.len() < 3 {
        return None;
    }

    let mut normal = Matrix3::zeros();
    let mut rhs = Vector3::zeros();
    for p in points {
        let w = p.weight();
        let row = Vector3::new(1.0, p.z, p.lr_sign);
        normal += row * row.transpose() * w;
        rhs += row * (w * p.x);
    }

    let scale = normal.diagonal().product().abs();
    if normal.determinant().abs() <= SINGULAR_TOLERANCE * scale {
        return None;
    }
    let inverse = normal.try_inverse()?;
    let params = inverse * rhs;

    let covariance = Matrix2::new(
        inverse[(1, 1)],
        inverse[(1, 0)],
        inverse[(0, 1)],
        inverse[(0, 0)],
    );

    let mut fit = LineFit {
        intercept: params[0],
        slope: params[1],
        offset: params[2],
        chi2: 0.0,
        covariance,
        n_params: 3,
    };
    fit.chi2 = chi2(&fit, points);
    Some(fit)
}

fn chi2(fit: &LineFit, points: &[FitPoint]) -> f64 {
    points
        .iter()
        .map(|p| {
            let r = fit.residual(p);
            r * r * p.weight()
        })
        .sum()
}
