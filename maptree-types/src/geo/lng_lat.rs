use geojson::Position;
use serde::{Deserialize, Serialize};

use super::point::{GeoPoint, NewGeoPoint};
use crate::error::TypesError;

/// Longitude/latitude pair, serialized as `{"lng": .., "lat": ..}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Deserialize, Serialize)]
pub struct LngLat {
    /// Longitude in degrees.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl LngLat {
    /// Creates a new point.
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

impl GeoPoint for LngLat {
    type Num = f64;

    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lng
    }
}

impl NewGeoPoint<f64> for LngLat {
    fn latlon(lat: f64, lon: f64) -> Self {
        Self { lng: lon, lat }
    }
}

impl From<geo_types::Point<f64>> for LngLat {
    fn from(value: geo_types::Point<f64>) -> Self {
        Self::new(value.x(), value.y())
    }
}

impl From<LngLat> for geo_types::Point<f64> {
    fn from(value: LngLat) -> Self {
        geo_types::Point::new(value.lng, value.lat)
    }
}

impl From<[f64; 2]> for LngLat {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self::new(lng, lat)
    }
}

impl TryFrom<&Position> for LngLat {
    type Error = TypesError;

    fn try_from(value: &Position) -> Result<Self, Self::Error> {
        match value.as_slice() {
            [lng, lat, ..] => Ok(Self::new(*lng, *lat)),
            _ => Err(TypesError::Conversion(
                "point must contain at least 2 dimensions".to_string(),
            )),
        }
    }
}

/// Creates a new [`LngLat`] from longitude and latitude values (in degrees).
///
/// ```
/// use maptree_types::{lnglat, GeoPoint};
///
/// let point = lnglat!(52.0, 38.0);
/// assert_eq!(point.lat(), 38.0);
/// ```
#[macro_export]
macro_rules! lnglat {
    ($lng:expr, $lat:expr) => {
        $crate::geo::LngLat::new($lng, $lat)
    };
}
