use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AttendanceError;
use crate::geofence::geometry::{self, Point};

pub type ZoneId = u64;

/// Row shape of `work_zones` as the zone-management side stores it.
///
/// `coordinates` is a JSON array of `{"lat": .., "lng": ..}` objects.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ZoneRecord {
    pub id: u64,
    pub name: String,
    pub zone_type: String,
    pub center_lat: Option<f64>,
    pub center_lng: Option<f64>,
    pub radius_meters: Option<f64>,
    pub coordinates: Option<String>,
    pub is_restricted: bool,
    pub buffer_meters: f64,
    pub department: Option<String>,
    pub is_active: bool,
}

#[derive(Deserialize)]
struct Coordinate {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ZoneShape {
    Circle { center: Point, radius_meters: f64 },
    Polygon { vertices: Vec<Point> },
}

/// A validated work zone. Geometry never changes after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub shape: ZoneShape,
    pub is_restricted: bool,
    pub buffer_meters: f64,
    pub department: Option<String>,
}

impl Zone {
    pub fn circle(
        id: ZoneId,
        name: impl Into<String>,
        center: Point,
        radius_meters: f64,
        buffer_meters: f64,
    ) -> Result<Self, AttendanceError> {
        if !radius_meters.is_finite() || radius_meters <= 0.0 {
            return Err(AttendanceError::InvalidZoneGeometry(format!(
                "zone {id}: radius must be positive, got {radius_meters}"
            )));
        }
        Self::build(
            id,
            name.into(),
            ZoneShape::Circle {
                center,
                radius_meters,
            },
            buffer_meters,
        )
    }

    pub fn polygon(
        id: ZoneId,
        name: impl Into<String>,
        vertices: Vec<Point>,
        buffer_meters: f64,
    ) -> Result<Self, AttendanceError> {
        if vertices.len() < 3 {
            return Err(AttendanceError::InvalidZoneGeometry(format!(
                "zone {id}: polygon needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        Self::build(id, name.into(), ZoneShape::Polygon { vertices }, buffer_meters)
    }

    fn build(
        id: ZoneId,
        name: String,
        shape: ZoneShape,
        buffer_meters: f64,
    ) -> Result<Self, AttendanceError> {
        if !buffer_meters.is_finite() || buffer_meters < 0.0 {
            return Err(AttendanceError::InvalidZoneGeometry(format!(
                "zone {id}: buffer must be non-negative, got {buffer_meters}"
            )));
        }
        Ok(Self {
            id,
            name,
            shape,
            is_restricted: false,
            buffer_meters,
            department: None,
        })
    }

    pub fn restricted(mut self) -> Self {
        self.is_restricted = true;
        self
    }

    pub fn for_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    /// Membership test. Circles honour the buffer; polygons are not
    /// buffer-expanded.
    pub fn contains(&self, p: Point) -> bool {
        match &self.shape {
            ZoneShape::Circle {
                center,
                radius_meters,
            } => geometry::point_in_circle(p, *center, *radius_meters, self.buffer_meters),
            ZoneShape::Polygon { vertices } => geometry::point_in_polygon(p, vertices),
        }
    }

    /// Distance to the point where `contains` would start returning true.
    pub fn edge_distance(&self, p: Point) -> f64 {
        match &self.shape {
            ZoneShape::Circle {
                center,
                radius_meters,
            } => (geometry::distance(p, *center) - radius_meters - self.buffer_meters).max(0.0),
            ZoneShape::Polygon { vertices } => geometry::distance_point_to_polygon(p, vertices),
        }
    }

    /// Zones without a department apply to everyone.
    pub fn applies_to(&self, department: Option<&str>) -> bool {
        match self.department.as_deref() {
            None => true,
            Some(scope) => department == Some(scope),
        }
    }
}

impl TryFrom<ZoneRecord> for Zone {
    type Error = AttendanceError;

    fn try_from(record: ZoneRecord) -> Result<Self, Self::Error> {
        let id = record.id;
        let zone = match record.zone_type.to_ascii_lowercase().as_str() {
            "circle" => {
                let (Some(lat), Some(lng)) = (record.center_lat, record.center_lng) else {
                    return Err(AttendanceError::InvalidZoneGeometry(format!(
                        "zone {id}: circle zone without center"
                    )));
                };
                let center = Point::new(lat, lng).map_err(|e| {
                    AttendanceError::InvalidZoneGeometry(format!("zone {id}: {e}"))
                })?;
                let radius = record.radius_meters.unwrap_or(0.0);
                Zone::circle(id, record.name, center, radius, record.buffer_meters)?
            }
            "polygon" => {
                let raw = record.coordinates.as_deref().unwrap_or("[]");
                let coords: Vec<Coordinate> = serde_json::from_str(raw).map_err(|e| {
                    AttendanceError::InvalidZoneGeometry(format!(
                        "zone {id}: unreadable coordinates: {e}"
                    ))
                })?;
                let vertices = coords
                    .into_iter()
                    .map(|c| Point::new(c.lat, c.lng))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| AttendanceError::InvalidZoneGeometry(format!("zone {id}: {e}")))?;
                Zone::polygon(id, record.name, vertices, record.buffer_meters)?
            }
            other => {
                return Err(AttendanceError::InvalidZoneGeometry(format!(
                    "zone {id}: unknown zone type '{other}'"
                )));
            }
        };

        Ok(Zone {
            is_restricted: record.is_restricted,
            department: record.department,
            ..zone
        })
    }
}

/// Turns raw records into the active zone set.
///
/// Inactive records are skipped silently; records with broken geometry are
/// skipped with a warning so one bad zone never blocks validation.
pub fn load_active_zones(records: impl IntoIterator<Item = ZoneRecord>) -> Vec<Zone> {
    records
        .into_iter()
        .filter(|r| r.is_active)
        .filter_map(|r| match Zone::try_from(r) {
            Ok(zone) => Some(zone),
            Err(e) => {
                warn!(error = %e, "Skipping work zone with invalid geometry");
                None
            }
        })
        .collect()
}
