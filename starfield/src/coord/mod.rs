//! Host-side coordinate types.
//!
//! Provides the observer/waypoint [`Coordinate`] and the kernel's
//! [`ProjectedPoint`] output, plus the degree/radian conversions used at the
//! user-facing boundary. Everything past the boundary works in radians.

mod types;


pub use types::{
    CoordError, Coordinate, ProjectedPoint, MAX_LAT, MAX_LAT_DEG, MAX_LON_DEG, MIN_LAT,
    MIN_LAT_DEG, MIN_LON_DEG,
};

const RAD_PER_DEG: f64 = 0.017453292519943295;
const DEG_PER_RAD: f64 = 57.29577951308232;

/// Converts degrees to radians.
#[inline]
pub fn deg_to_rad(degrees: f64) -> f64 {
    degrees * RAD_PER_DEG
}

/// Converts radians to degrees.
#[inline]
pub fn rad_to_deg(radians: f64) -> f64 {
    radians * DEG_PER_RAD
}

/// Converts a longitude in degrees to radians in 0..2π.
///
/// Negative (western) longitudes are wrapped by adding 360° first.
#[inline]
pub fn deg_to_rad_long(degrees: f64) -> f64 {
    let normalized = if degrees < 0.0 { degrees + 360.0 } else { degrees };
    normalized * RAD_PER_DEG
}

/// Converts a longitude in radians to degrees in -180..180.
#[inline]
pub fn rad_to_deg_long(radians: f64) -> f64 {
    let degrees = rad_to_deg(radians);
    if degrees > 180.0 {
        degrees - 360.0
    } else {
        degrees
    }
}
