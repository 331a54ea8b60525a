//! Points in geographic coordinates (longitude and latitude in degrees).

mod lng_lat;
mod point;

pub use lng_lat::LngLat;
pub use point::{GeoPoint, NewGeoPoint};
