//! Error types for driftseg-core.

use thiserror::Error;

/// Result type alias for driftseg operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for driftseg operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Layer number outside the super-layer.
    #[error("invalid layer {layer} (super-layer has {n_layers} layers)")]
    InvalidLayer { layer: u8, n_layers: u8 },

    /// Wire number outside the layer.
    #[error("invalid wire {wire} in layer {layer}")]
    InvalidWire { layer: u8, wire: u16 },

    /// Super-layer index does not match the geometry it is used with.
    #[error("invalid super-layer index: expected {expected}, found {found}")]
    InvalidSuperLayer { expected: u8, found: u8 },

    /// Drift distance outside the cell.
    #[error("invalid drift distance {distance} (cell half-width {max})")]
    InvalidDriftDistance { distance: f64, max: f64 },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
