use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AttendanceError;
use crate::geofence::Point;

/// Speed and heading as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Motion {
    pub speed_mps: Option<f64>,
    pub heading_degrees: Option<f64>,
}

impl Motion {
    pub fn new(speed_mps: Option<f64>, heading_degrees: Option<f64>) -> Result<Self, AttendanceError> {
        if let Some(speed) = speed_mps {
            if !speed.is_finite() || speed < 0.0 {
                return Err(AttendanceError::InvalidRequest(format!(
                    "speed must be a non-negative number of m/s, got {speed}"
                )));
            }
        }
        if let Some(heading) = heading_degrees {
            if !heading.is_finite() || !(0.0..360.0).contains(&heading) {
                return Err(AttendanceError::InvalidRequest(format!(
                    "heading must be within [0, 360) degrees, got {heading}"
                )));
            }
        }
        Ok(Self {
            speed_mps,
            heading_degrees,
        })
    }
}

/// One point of a user's location trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationPoint {
    pub id: String,
    pub user_id: u64,
    pub location: Point,
    pub accuracy_meters: Option<f64>,
    pub speed_mps: Option<f64>,
    pub heading_degrees: Option<f64>,
    pub timestamp: DateTime<Utc>,
}
