//! Geographic primitives shared by the `maptree` components.
//!
//! * [`LngLat`] and the [`GeoPoint`] traits describe positions on the globe.
//! * [`coordinates_at_click`] moves a feature position to the world copy a user clicked on.
//! * [`centroid`] finds the center of a GeoJSON feature collection.

pub mod error;
pub mod geo;

mod centroid;
mod wrap;

pub use centroid::centroid;
pub use self::geo::{GeoPoint, LngLat, NewGeoPoint};
pub use wrap::{coordinates_at_click, wrap_longitude};
