use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::properties::Properties;
use crate::error::MapTreeError;

/// Rendering type of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerType {
    /// Filled polygons.
    Fill,
    /// Stroked lines.
    Line,
    /// Icons and text labels.
    Symbol,
    /// Filled circles.
    Circle,
    /// Heatmap of point density.
    Heatmap,
    /// Extruded polygons.
    FillExtrusion,
    /// Raster imagery.
    Raster,
    /// Hillshading from elevation data.
    Hillshade,
    /// Background color or pattern. Does not use a source, so it cannot be mounted with a
    /// [`LayerConsumer`](super::LayerConsumer).
    Background,
}

/// Description of a layer to be mounted with a [`LayerConsumer`](super::LayerConsumer).
///
/// ```
/// use maptree::layer::{LayerSpec, LayerType};
///
/// let spec = LayerSpec::new(LayerType::Fill)
///     .with_id("lakes")
///     .with_paint("fill-color", "#3070d0")
///     .with_unset_paint("fill-opacity")
///     .with_maxzoom(14.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    /// Layer id. A unique id is generated if not set.
    pub id: Option<String>,
    /// Rendering type.
    pub layer_type: LayerType,
    /// Paint properties.
    pub paint: Properties,
    /// Layout properties.
    pub layout: Properties,
    /// Filter expression.
    pub filter: Option<Value>,
    /// Minimum zoom level at which the layer is visible.
    pub minzoom: Option<f64>,
    /// Maximum zoom level at which the layer is visible.
    pub maxzoom: Option<f64>,
    /// Layer of a vector tile source to draw.
    pub source_layer: Option<String>,
}

impl LayerSpec {
    /// Creates a spec of the given type with no properties set.
    pub fn new(layer_type: LayerType) -> Self {
        Self {
            id: None,
            layer_type,
            paint: Properties::new(),
            layout: Properties::new(),
            filter: None,
            minzoom: None,
            maxzoom: None,
            source_layer: None,
        }
    }

    /// Sets the layer id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets a paint property.
    pub fn with_paint(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.paint.set(name, value);
        self
    }

    /// Explicitly leaves a paint property to the engine default.
    pub fn with_unset_paint(mut self, name: impl Into<String>) -> Self {
        self.paint.unset(name);
        self
    }

    /// Sets a layout property.
    pub fn with_layout(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.layout.set(name, value);
        self
    }

    /// Explicitly leaves a layout property to the engine default.
    pub fn with_unset_layout(mut self, name: impl Into<String>) -> Self {
        self.layout.unset(name);
        self
    }

    /// Sets the filter expression.
    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the minimum zoom level.
    pub fn with_minzoom(mut self, minzoom: f64) -> Self {
        self.minzoom = Some(minzoom);
        self
    }

    /// Sets the maximum zoom level.
    pub fn with_maxzoom(mut self, maxzoom: f64) -> Self {
        self.maxzoom = Some(maxzoom);
        self
    }

    /// Sets the vector tile layer to draw.
    pub fn with_source_layer(mut self, source_layer: impl Into<String>) -> Self {
        self.source_layer = Some(source_layer.into());
        self
    }

    /// Checks that the configuration is consistent.
    pub fn validate(&self) -> Result<(), MapTreeError> {
        if self.layer_type == LayerType::Background {
            return Err(MapTreeError::Configuration(
                "background layers do not draw a source".into(),
            ));
        }

        if let (Some(min), Some(max)) = (self.minzoom, self.maxzoom) {
            if min > max {
                return Err(MapTreeError::Configuration(format!(
                    "layer minzoom {min} is greater than maxzoom {max}"
                )));
            }
        }

        if let Some(id) = &self.id {
            if id.is_empty() {
                return Err(MapTreeError::Configuration("layer id is empty".into()));
            }
        }

        Ok(())
    }

    /// Resolves the spec into the definition passed to the engine.
    pub fn definition(&self, id: &str, source_id: &str) -> LayerDefinition {
        LayerDefinition {
            id: id.to_string(),
            layer_type: self.layer_type,
            source: source_id.to_string(),
            source_layer: self.source_layer.clone(),
            paint: self.paint.to_json(),
            layout: self.layout.to_json(),
            filter: self.filter.clone(),
            minzoom: self.minzoom,
            maxzoom: self.maxzoom,
        }
    }
}

/// Layer as it is handed to the engine, serialized in the style specification format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDefinition {
    /// Layer id.
    pub id: String,
    /// Rendering type.
    #[serde(rename = "type")]
    pub layer_type: LayerType,
    /// Id of the source the layer draws.
    pub source: String,
    /// Layer of a vector tile source to draw.
    #[serde(
        rename = "source-layer",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_layer: Option<String>,
    /// Paint properties with values.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub paint: Map<String, Value>,
    /// Layout properties with values.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub layout: Map<String, Value>,
    /// Filter expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    /// Minimum zoom level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<f64>,
    /// Maximum zoom level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<f64>,
}
