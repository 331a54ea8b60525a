use crate::geo::{GeoPoint, LngLat};

const FULL_TURN: f64 = 360.0;
const HALF_TURN: f64 = 180.0;

/// Shifts `feature_lon` by whole turns until it is at most 180 degrees away from `click_lon`.
///
/// Every step moves the value 360 degrees towards `click_lon`, so the result is the copy of
/// `feature_lon` closest to the click. When the difference is exactly 180 degrees no shift is made.
/// Non-finite inputs are returned unchanged.
pub fn wrap_longitude(feature_lon: f64, click_lon: f64) -> f64 {
    if !feature_lon.is_finite() || !click_lon.is_finite() {
        return feature_lon;
    }

    let diff = click_lon - feature_lon;
    if diff.abs() <= HALF_TURN {
        return feature_lon;
    }

    let steps = ((diff.abs() - HALF_TURN) / FULL_TURN).ceil();
    feature_lon + diff.signum() * steps * FULL_TURN
}

/// Returns the position of a feature on the world copy that contains the clicked point.
///
/// When a map is zoomed out far enough to show several copies of the world, a popup anchored
/// to a feature should appear over the copy the user pointed at. Latitude passes through as is.
///
/// ```
/// use maptree_types::{coordinates_at_click, LngLat};
///
/// let shown = coordinates_at_click(LngLat::new(-170.0, 10.0), 170.0);
/// assert_eq!(shown, LngLat::new(190.0, 10.0));
/// ```
pub fn coordinates_at_click(feature: impl GeoPoint<Num = f64>, click_lon: f64) -> LngLat {
    LngLat::new(wrap_longitude(feature.lon(), click_lon), feature.lat())
}
