//! Great-circle distance between coordinate pairs.

use crate::error::DispatchError;
use crate::models::GeoPoint;
use geo::prelude::*;
use geo::Point;

/// Great-circle (haversine) distance between two points in kilometers.
///
/// Symmetric, zero for identical points (within floating tolerance), and
/// monotonic with angular separation. Out-of-range coordinates are the
/// caller's responsibility; see [`validate_point`].
pub fn distance_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    // geo points are (x, y) = (longitude, latitude)
    let from = Point::new(a.longitude, a.latitude);
    let to = Point::new(b.longitude, b.latitude);
    from.haversine_distance(&to) / 1000.0
}

/// Rejects coordinates outside the valid WGS84 ranges with a field-level
/// validation message.
pub fn validate_point(point: &GeoPoint, field: &str) -> Result<(), DispatchError> {
    if !point.in_range() {
        return Err(DispatchError::Validation(format!(
            "{}: coordinates out of range (lat {}, lon {})",
            field, point.latitude, point.longitude
        )));
    }
    Ok(())
}
