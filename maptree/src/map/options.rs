use maptree_types::LngLat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MapTreeError;

/// Style of a map: a URL of a style document or the document itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MapStyle {
    /// URL of a style document.
    Url(String),
    /// Inline style document.
    Document(Value),
}

impl From<&str> for MapStyle {
    fn from(value: &str) -> Self {
        Self::Url(value.to_string())
    }
}

impl From<String> for MapStyle {
    fn from(value: String) -> Self {
        Self::Url(value)
    }
}

/// Options a map engine is created with.
///
/// Options not known to this crate are collected into `extra` and passed to the engine as is.
///
/// ```
/// use maptree::map::MapOptions;
/// use maptree_types::lnglat;
///
/// let options = MapOptions::new("map", "https://demotiles.maplibre.org/style.json")
///     .with_center(lnglat!(37.6, 55.7))
///     .with_zoom(9.0)
///     .with_option("hash", true);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapOptions {
    /// Id of the element the map is rendered into.
    pub container: String,
    /// Map style.
    pub style: MapStyle,
    /// Initial center of the map.
    #[serde(default)]
    pub center: LngLat,
    /// Initial zoom level.
    #[serde(default)]
    pub zoom: f64,
    /// Engine specific options.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MapOptions {
    /// Creates options with the map centered at `(0, 0)` at zoom level 0.
    pub fn new(container: impl Into<String>, style: impl Into<MapStyle>) -> Self {
        Self {
            container: container.into(),
            style: style.into(),
            center: LngLat::default(),
            zoom: 0.0,
            extra: Map::new(),
        }
    }

    /// Parses options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, MapTreeError> {
        serde_json::from_str(json)
            .map_err(|err| MapTreeError::Configuration(format!("invalid map options: {err}")))
    }

    /// Sets the initial center.
    pub fn with_center(mut self, center: LngLat) -> Self {
        self.center = center;
        self
    }

    /// Sets the initial zoom level.
    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    /// Adds an engine specific option.
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}
