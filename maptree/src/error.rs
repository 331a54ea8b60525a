//! Error types used by the crate.

use thiserror::Error;

use crate::source::SourceType;

/// Maptree error type.
#[derive(Debug, Error)]
pub enum MapTreeError {
    /// Invalid component configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A component was mounted outside of the provider it depends on.
    #[error("{component} must be mounted inside a {provider}")]
    MissingContext {
        /// Component that failed to mount.
        component: &'static str,
        /// Provider expected among the component's ancestors.
        provider: &'static str,
    },
    /// A source with this id is already present on the map.
    #[error("source `{0}` already exists on the map")]
    DuplicateSource(String),
    /// A layer with this id is already present on the map.
    #[error("layer `{0}` already exists on the map")]
    DuplicateLayer(String),
    /// The layer id is registered as a child of another source.
    #[error("layer `{layer_id}` is already attached to source `{source_id}`")]
    LayerOwnedElsewhere {
        /// Id of the layer.
        layer_id: String,
        /// Id of the source that owns the layer.
        source_id: String,
    },
    /// Source data was replaced with data of a different kind.
    #[error("source `{id}` cannot change its type from {from} to {to}")]
    SourceTypeChanged {
        /// Id of the source.
        id: String,
        /// Type of the registered source.
        from: SourceType,
        /// Requested type.
        to: SourceType,
    },
    /// Error reported by the map engine.
    #[error("engine error: {0}")]
    Engine(String),
    /// The map engine was already destroyed.
    #[error("map has been destroyed")]
    MapDestroyed,
    /// The scope was already unmounted.
    #[error("scope is not mounted")]
    Unmounted,
    /// Several independent operations failed.
    #[error("{} operations failed, first: {}", .0.len(), .0.first().map(ToString::to_string).unwrap_or_default())]
    Multiple(Vec<MapTreeError>),
}

impl MapTreeError {
    /// Combines a list of errors into a single result.
    pub(crate) fn collect(mut errors: Vec<MapTreeError>) -> Result<(), MapTreeError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(MapTreeError::Multiple(errors)),
        }
    }
}
