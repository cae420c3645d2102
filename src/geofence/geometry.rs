//! Geometry primitives for geofencing.
//!
//! Membership decisions use the haversine distance on a spherical Earth.
//! The point-to-edge distances are a local planar approximation and only
//! feed the advisory "nearest zone" message.

use serde::{Deserialize, Serialize};

use crate::error::AttendanceError;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Planar scale used for point-to-edge distances.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// A WGS84 latitude/longitude pair. Always within range once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoint")]
pub struct Point {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawPoint {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawPoint> for Point {
    type Error = AttendanceError;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        Point::new(raw.latitude, raw.longitude)
    }
}

impl Point {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, AttendanceError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(AttendanceError::InvalidCoordinates(format!(
                "latitude {latitude} outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(AttendanceError::InvalidCoordinates(format!(
                "longitude {longitude} outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Great-circle distance in meters (haversine).
pub fn distance(a: Point, b: Point) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lng / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_METERS * c
}

pub fn point_in_circle(p: Point, center: Point, radius_meters: f64, buffer_meters: f64) -> bool {
    distance(p, center) <= radius_meters + buffer_meters
}

/// Ray-casting parity test over the implicitly closed ring.
///
/// Longitude is treated as x and latitude as y. Points exactly on an edge may
/// resolve either way.
pub fn point_in_polygon(p: Point, vertices: &[Point]) -> bool {
    let (x, y) = (p.longitude, p.latitude);
    let mut inside = false;

    let mut j = vertices.len().wrapping_sub(1);
    for i in 0..vertices.len() {
        let (xi, yi) = (vertices[i].longitude, vertices[i].latitude);
        let (xj, yj) = (vertices[j].longitude, vertices[j].latitude);

        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Distance from `p` to the segment `start..end`, projection clamped to the
/// segment, scaled with [`METERS_PER_DEGREE`].
pub fn distance_point_to_segment(p: Point, start: Point, end: Point) -> f64 {
    let a = p.longitude - start.longitude;
    let b = p.latitude - start.latitude;
    let c = end.longitude - start.longitude;
    let d = end.latitude - start.latitude;

    let len_sq = c * c + d * d;
    // degenerate segment collapses to its start point
    let t = if len_sq == 0.0 {
        0.0
    } else {
        ((a * c + b * d) / len_sq).clamp(0.0, 1.0)
    };

    let dx = p.longitude - (start.longitude + t * c);
    let dy = p.latitude - (start.latitude + t * d);
    (dx * dx + dy * dy).sqrt() * METERS_PER_DEGREE
}

/// Minimum edge distance over the closed ring. Infinite for an empty ring.
pub fn distance_point_to_polygon(p: Point, vertices: &[Point]) -> f64 {
    (0..vertices.len())
        .map(|i| {
            let next = vertices[(i + 1) % vertices.len()];
            distance_point_to_segment(p, vertices[i], next)
        })
        .fold(f64::INFINITY, f64::min)
}
