use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Everything the attendance core can fail with.
///
/// Geofence violations are not errors: a check-in outside every work zone is
/// still recorded, only flagged. The variants here are the cases where no
/// event gets written at all.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum AttendanceError {
    #[display(fmt = "Invalid zone geometry: {}", _0)]
    InvalidZoneGeometry(String),

    #[display(fmt = "Invalid coordinates: {}", _0)]
    InvalidCoordinates(String),

    #[display(fmt = "Invalid request: {}", _0)]
    InvalidRequest(String),

    #[display(fmt = "Already checked in today")]
    AlreadyCheckedIn,

    #[display(fmt = "Already checked out today")]
    AlreadyCheckedOut,

    #[display(fmt = "No check-in found for today")]
    NoCheckInToday,

    #[display(fmt = "Check-out time precedes check-in time")]
    InvalidTimeOrdering,

    #[display(fmt = "Storage error: {}", _0)]
    Storage(String),
}

impl std::error::Error for AttendanceError {}

impl From<sqlx::Error> for AttendanceError {
    fn from(err: sqlx::Error) -> Self {
        AttendanceError::Storage(err.to_string())
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::InvalidZoneGeometry(_)
            | AttendanceError::InvalidCoordinates(_)
            | AttendanceError::InvalidRequest(_)
            | AttendanceError::AlreadyCheckedIn
            | AttendanceError::AlreadyCheckedOut
            | AttendanceError::NoCheckInToday => StatusCode::BAD_REQUEST,
            AttendanceError::InvalidTimeOrdering => StatusCode::UNPROCESSABLE_ENTITY,
            AttendanceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            // storage details stay in the logs
            AttendanceError::Storage(details) => {
                tracing::error!(error = %details, "Attendance storage failure");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}

pub type Result<T> = std::result::Result<T, AttendanceError>;
