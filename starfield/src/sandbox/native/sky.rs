//! Star catalog parsing and the reference projection math.

use std::f64::consts::TAU;

use crate::coord::{deg_to_rad, Coordinate, ProjectedPoint};

/// Milliseconds in a day.
const MS_PER_DAY: f64 = 86_400_000.0;

/// Julian date of the Unix epoch.
const JD_UNIX_EPOCH: f64 = 2_440_587.5;

/// Julian date of J2000.0.
const JD_J2000: f64 = 2_451_545.0;

/// A catalog star in equatorial coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Star {
    /// Right ascension in radians.
    pub right_ascension: f64,
    /// Declination in radians.
    pub declination: f64,
    pub brightness: f32,
}

impl Star {
    /// Parses `right_ascension_deg,declination_deg,brightness`.
    pub fn parse(row: &str) -> Option<Self> {
        let mut fields = row.split(',').map(str::trim);
        let ra: f64 = fields.next()?.parse().ok()?;
        let dec: f64 = fields.next()?.parse().ok()?;
        let brightness: f32 = fields.next()?.parse().ok()?;
        if fields.next().is_some() || !(-90.0..=90.0).contains(&dec) || !ra.is_finite() {
            return None;
        }
        Some(Self {
            right_ascension: deg_to_rad(ra),
            declination: deg_to_rad(dec),
            brightness: brightness.clamp(0.0, 1.0),
        })
    }
}

/// Parses newline-separated rows, skipping blanks.
///
/// Returns the stars and the number of malformed rows.
pub(crate) fn parse_catalog(text: &str) -> (Vec<Star>, usize) {
    let mut stars = Vec::new();
    let mut malformed = 0;
    for row in text.lines().filter(|row| !row.trim().is_empty()) {
        match Star::parse(row) {
            Some(star) => stars.push(star),
            None => malformed += 1,
        }
    }
    (stars, malformed)
}

/// Earth rotation angle in radians, in `[0, 2π)`.
pub(crate) fn earth_rotation_angle(timestamp_ms: i64) -> f64 {
    let jd = timestamp_ms as f64 / MS_PER_DAY + JD_UNIX_EPOCH;
    let days = jd - JD_J2000;
    (TAU * (0.779_057_273_264 + 1.002_737_811_911_354_5 * days)).rem_euclid(TAU)
}

/// Local sidereal angle in radians for an east-positive longitude.
pub(crate) fn local_sidereal_angle(timestamp_ms: i64, longitude: f64) -> f64 {
    (earth_rotation_angle(timestamp_ms) + longitude).rem_euclid(TAU)
}

/// Projects every star above the observer's horizon onto the unit disk.
///
/// Stereographic projection from the nadir: the zenith maps to the origin,
/// the horizon to the unit circle, north is +y and east is -x (the sky seen
/// from below).
pub(crate) fn project(stars: &[Star], observer: Coordinate, timestamp_ms: i64) -> Vec<ProjectedPoint> {
    let lst = local_sidereal_angle(timestamp_ms, observer.longitude);
    let (sin_lat, cos_lat) = observer.latitude.sin_cos();

    stars
        .iter()
        .filter_map(|star| {
            let hour_angle = lst - star.right_ascension;
            let (sin_h, cos_h) = hour_angle.sin_cos();
            let (sin_dec, cos_dec) = star.declination.sin_cos();

            let east = -cos_dec * sin_h;
            let north = sin_dec * cos_lat - cos_dec * cos_h * sin_lat;
            let up = sin_dec * sin_lat + cos_dec * cos_h * cos_lat;
            if up < 0.0 {
                return None;
            }

            let scale = 1.0 + up;
            Some(ProjectedPoint::new(
                (-east / scale) as f32,
                (north / scale) as f32,
                star.brightness,
            ))
        })
        .collect()
}

/// `count` points along the great circle from `start` to `end`, endpoints
/// included.
pub(crate) fn great_circle(start: Coordinate, end: Coordinate, count: usize) -> Vec<Coordinate> {
    let a = to_unit(start);
    let b = to_unit(end);
    let omega = dot(a, b).clamp(-1.0, 1.0).acos();
    let sin_omega = omega.sin();

    (0..count)
        .map(|i| {
            let t = if count > 1 {
                i as f64 / (count - 1) as f64
            } else {
                0.0
            };
            let v = if sin_omega.abs() < 1e-12 {
                // Coincident or antipodal endpoints: no unique circle.
                lerp(a, b, t)
            } else {
                let wa = ((1.0 - t) * omega).sin() / sin_omega;
                let wb = (t * omega).sin() / sin_omega;
                [
                    wa * a[0] + wb * b[0],
                    wa * a[1] + wb * b[1],
                    wa * a[2] + wb * b[2],
                ]
            };
            from_unit(v).unwrap_or(start)
        })
        .collect()
}

fn to_unit(c: Coordinate) -> [f64; 3] {
    let (sin_lat, cos_lat) = c.latitude.sin_cos();
    let (sin_lon, cos_lon) = c.longitude.sin_cos();
    [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat]
}

fn from_unit(v: [f64; 3]) -> Option<Coordinate> {
    let norm = dot(v, v).sqrt();
    if norm < 1e-12 {
        return None;
    }
    let latitude = (v[2] / norm).clamp(-1.0, 1.0).asin();
    let longitude = v[1].atan2(v[0]);
    Some(Coordinate::new(latitude, longitude))
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn lerp(a: [f64; 3], b: [f64; 3], t: f64) -> [f64; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}
