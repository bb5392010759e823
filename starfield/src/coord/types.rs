//! Coordinate type definitions

use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::str::FromStr;

/// Valid latitude range in degrees
pub const MIN_LAT_DEG: f64 = -90.0;
pub const MAX_LAT_DEG: f64 = 90.0;

/// Valid longitude range in degrees
pub const MIN_LON_DEG: f64 = -180.0;
pub const MAX_LON_DEG: f64 = 360.0;

/// Valid latitude range in radians
pub const MIN_LAT: f64 = -FRAC_PI_2;
pub const MAX_LAT: f64 = FRAC_PI_2;

/// A position on the globe: an observer location or a waypoint.
///
/// Both angles are in radians. Degrees only appear at the boundary, see
/// [`Coordinate::from_degrees`] and [`Coordinate::to_degrees`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinate {
    /// Latitude in radians, positive north
    pub latitude: f64,
    /// Longitude in radians, positive east
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from radians.
    #[inline]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Creates a coordinate from degrees, validating the ranges.
    ///
    /// Longitude may be given either as -180..180 or 0..360. Negative
    /// longitudes are wrapped into 0..360 before conversion, matching the
    /// convention the kernel expects.
    pub fn from_degrees(latitude: f64, longitude: f64) -> Result<Self, CoordError> {
        if !(MIN_LAT_DEG..=MAX_LAT_DEG).contains(&latitude) {
            return Err(CoordError::InvalidLatitude(latitude));
        }
        if !(MIN_LON_DEG..=MAX_LON_DEG).contains(&longitude) {
            return Err(CoordError::InvalidLongitude(longitude));
        }
        Ok(Self {
            latitude: super::deg_to_rad(latitude),
            longitude: super::deg_to_rad_long(longitude),
        })
    }

    /// Returns `(latitude, longitude)` in degrees, longitude in -180..180.
    #[inline]
    pub fn to_degrees(&self) -> (f64, f64) {
        (
            super::rad_to_deg(self.latitude),
            super::rad_to_deg_long(self.longitude),
        )
    }

    /// Returns true if the latitude lies within the poles.
    #[inline]
    pub fn is_valid(&self) -> bool {
        (MIN_LAT..=MAX_LAT).contains(&self.latitude) && self.longitude.is_finite()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (lat, lon) = self.to_degrees();
        write!(f, "{:.4}°, {:.4}°", lat, lon)
    }
}

/// Parses `"lat,lon"` in degrees.
impl FromStr for Coordinate {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| CoordError::Malformed(s.to_string()))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| CoordError::Malformed(s.to_string()))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| CoordError::Malformed(s.to_string()))?;
        Self::from_degrees(lat, lon)
    }
}

/// One star's screen-space projection result.
///
/// `x` and `y` lie on the unit disk (the horizon maps to radius 1, north
/// up); `brightness` is a normalized intensity in 0..1.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProjectedPoint {
    pub x: f32,
    pub y: f32,
    pub brightness: f32,
}

impl ProjectedPoint {
    #[inline]
    pub const fn new(x: f32, y: f32, brightness: f32) -> Self {
        Self { x, y, brightness }
    }
}

/// Errors that can occur when building coordinates at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude is outside -90..90 degrees
    InvalidLatitude(f64),
    /// Longitude is outside -180..360 degrees
    InvalidLongitude(f64),
    /// Text is not of the form `lat,lon`
    Malformed(String),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidLatitude(lat) => {
                write!(
                    f,
                    "Invalid latitude: {} (must be between {} and {})",
                    lat, MIN_LAT_DEG, MAX_LAT_DEG
                )
            }
            CoordError::InvalidLongitude(lon) => {
                write!(
                    f,
                    "Invalid longitude: {} (must be between {} and {})",
                    lon, MIN_LON_DEG, MAX_LON_DEG
                )
            }
            CoordError::Malformed(text) => {
                write!(f, "Invalid coordinate: '{}' (expected 'lat,lon' in degrees)", text)
            }
        }
    }
}

impl std::error::Error for CoordError {}
