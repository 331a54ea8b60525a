use std::fmt::{Display, Formatter};

use geojson::{FeatureCollection, GeoJson};
use serde::{Deserialize, Serialize};

use crate::error::MapTreeError;

/// Kind of a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    /// Inline or remote GeoJSON.
    #[serde(rename = "geojson")]
    GeoJson,
    /// Remote vector tiles.
    #[serde(rename = "vector")]
    Vector,
}

impl Display for SourceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::GeoJson => write!(f, "geojson"),
            SourceType::Vector => write!(f, "vector"),
        }
    }
}

/// Type specific configuration of a source, serialized in the style specification format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SourceData {
    /// GeoJSON source.
    #[serde(rename = "geojson")]
    GeoJson(GeoJsonSource),
    /// Vector tile source.
    #[serde(rename = "vector")]
    Vector(VectorSource),
}

/// Configuration of a GeoJSON source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoJsonSource {
    /// Features of the source.
    pub data: GeoJsonData,
    /// Assign numeric ids to features based on their index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_id: Option<bool>,
    /// Feature property to use as the feature id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promote_id: Option<String>,
    /// Attribution text shown for the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
}

/// Data of a GeoJSON source: either the document itself or a URL to load it from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeoJsonData {
    /// URL of a GeoJSON document.
    Url(String),
    /// GeoJSON document.
    Inline(GeoJson),
}

impl GeoJsonData {
    /// Remote GeoJSON document.
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }
}

impl From<GeoJson> for GeoJsonData {
    fn from(value: GeoJson) -> Self {
        Self::Inline(value)
    }
}

impl From<FeatureCollection> for GeoJsonData {
    fn from(value: FeatureCollection) -> Self {
        Self::Inline(GeoJson::FeatureCollection(value))
    }
}

/// Configuration of a vector tile source.
///
/// Either a TileJSON `url` or a list of `tiles` URL templates must be given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorSource {
    /// URL of a TileJSON document describing the tile set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Tile URL templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiles: Option<Vec<String>>,
    /// Minimum zoom level for which tiles are available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<f64>,
    /// Maximum zoom level for which tiles are available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<f64>,
    /// Attribution text shown for the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
}

impl SourceData {
    /// Kind of the source.
    pub fn source_type(&self) -> SourceType {
        match self {
            SourceData::GeoJson(_) => SourceType::GeoJson,
            SourceData::Vector(_) => SourceType::Vector,
        }
    }

    /// Checks that the configuration is complete.
    pub fn validate(&self) -> Result<(), MapTreeError> {
        match self {
            SourceData::GeoJson(source) => match &source.data {
                GeoJsonData::Url(url) if url.trim().is_empty() => Err(MapTreeError::Configuration(
                    "geojson source url is empty".into(),
                )),
                _ => Ok(()),
            },
            SourceData::Vector(source) => {
                let has_url = source.url.as_ref().is_some_and(|url| !url.trim().is_empty());
                let has_tiles = source.tiles.as_ref().is_some_and(|tiles| !tiles.is_empty());
                if !has_url && !has_tiles {
                    return Err(MapTreeError::Configuration(
                        "vector source requires either `url` or `tiles`".into(),
                    ));
                }

                if let (Some(min), Some(max)) = (source.minzoom, source.maxzoom) {
                    if min > max {
                        return Err(MapTreeError::Configuration(format!(
                            "vector source minzoom {min} is greater than maxzoom {max}"
                        )));
                    }
                }

                Ok(())
            }
        }
    }
}

/// Description of a source to be mounted with a [`SourceProvider`](super::SourceProvider).
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    /// Source id. A unique id is generated if not set.
    pub id: Option<String>,
    /// Type specific configuration.
    pub data: SourceData,
}

impl SourceSpec {
    /// Creates a spec with the given data and no explicit id.
    pub fn new(data: SourceData) -> Self {
        Self { id: None, data }
    }

    /// GeoJSON source with the given data.
    pub fn geojson(data: impl Into<GeoJsonData>) -> Self {
        Self::new(SourceData::GeoJson(GeoJsonSource {
            data: data.into(),
            generate_id: None,
            promote_id: None,
            attribution: None,
        }))
    }

    /// Vector tile source described by a TileJSON document.
    pub fn vector_url(url: impl Into<String>) -> Self {
        Self::new(SourceData::Vector(VectorSource {
            url: Some(url.into()),
            ..Default::default()
        }))
    }

    /// Vector tile source with the given URL templates.
    pub fn vector_tiles(tiles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::new(SourceData::Vector(VectorSource {
            tiles: Some(tiles.into_iter().map(Into::into).collect()),
            ..Default::default()
        }))
    }

    /// Sets the id of the source.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}
