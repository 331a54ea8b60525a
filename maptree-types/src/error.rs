//! Error type used by the crate.

use thiserror::Error;

/// Error enum.
#[derive(Debug, Error)]
pub enum TypesError {
    /// Geometry conversion error.
    #[error("invalid input geometry: {0}")]
    Conversion(String),
    /// The input has no geometry to compute a result from.
    #[error("input contains no geometry")]
    EmptyGeometry,
}

impl From<geojson::Error> for TypesError {
    fn from(value: geojson::Error) -> Self {
        Self::Conversion(value.to_string())
    }
}
