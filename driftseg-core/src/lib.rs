//! driftseg-core: Core types for drift-tube segment reconstruction.
//!
//! This crate provides the hit model, wire identifiers, super-layer
//! geometry, least-squares line fits and the segment candidate and
//! finished segment types shared by the reconstruction algorithms.
//!

pub mod error;
pub mod fit;
pub mod geometry;
pub mod hit;
pub mod segment;
pub mod wire;

pub use error::{Error, Result};
pub use fit::{fit_line, fit_line_with_offset, FitPoint, LineFit};
pub use geometry::{polar_angle, CellGeometry, SuperLayer, THETA_SUPERLAYER};
pub use hit::{HitForFit, HitId, RecHitPair, DEFAULT_HIT_ERROR};
pub use segment::{
    AssociationPoint, CandidateFit, Segment2D, SegmentCandidate, SegmentHit,
    DEFAULT_SEGMENT_CHI2_MAX, FAILED_FIT_CHI2,
};
pub use wire::{CellSide, WireId};
