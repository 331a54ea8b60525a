use ::geo::Centroid;
use geo_types::GeometryCollection;
use geojson::{FeatureCollection, GeoJson};

use crate::error::TypesError;
use crate::geo::LngLat;

/// Computes the centroid of all geometries in the feature collection.
///
/// Features without geometry are ignored. Returns [`TypesError::EmptyGeometry`] if there is
/// nothing to compute the centroid of.
pub fn centroid(collection: &FeatureCollection) -> Result<LngLat, TypesError> {
    let geometries: GeometryCollection<f64> =
        geojson::quick_collection(&GeoJson::FeatureCollection(collection.clone()))?;

    geometries
        .centroid()
        .map(LngLat::from)
        .ok_or(TypesError::EmptyGeometry)
}
