use crate::attendance::engine::{AttendanceEngine, CheckIn, CheckOut, LocationReading};
use crate::auth::auth::AuthUser;
use crate::error::AttendanceError;
use crate::geofence::Point;
use crate::model::attendance::{Biometric, BiometricType, DayAttendance};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

const DEFAULT_HISTORY_LIMIT: u32 = 30;
const MAX_HISTORY_LIMIT: u32 = 500;
const MAX_NOTES_LEN: usize = 1000;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckInRequest {
    #[schema(example = 40.7128)]
    pub latitude: f64,
    #[schema(example = -74.0060)]
    pub longitude: f64,
    /// Reported GPS accuracy in meters
    #[schema(example = 8.5)]
    pub accuracy: Option<f64>,
    #[schema(example = "fingerprint")]
    pub biometric_type: Option<BiometricType>,
    #[schema(example = true)]
    pub biometric_verified: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckOutRequest {
    #[schema(example = 40.7128)]
    pub latitude: f64,
    #[schema(example = -74.0060)]
    pub longitude: f64,
    #[schema(example = 8.5)]
    pub accuracy: Option<f64>,
    pub biometric_type: Option<BiometricType>,
    pub biometric_verified: Option<bool>,
    #[schema(example = "Left early for client visit")]
    pub notes: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct HistoryQuery {
    /// First day to include (inclusive)
    #[schema(example = "2026-01-01")]
    pub start_date: Option<NaiveDate>,
    /// Last day to include (inclusive)
    #[schema(example = "2026-01-31")]
    pub end_date: Option<NaiveDate>,
    /// Maximum number of events, newest first (default 30, max 500)
    #[schema(example = 30)]
    pub limit: Option<u32>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct DayQuery {
    /// Day to report (defaults to today)
    #[schema(example = "2026-01-15")]
    pub date: Option<NaiveDate>,
}

#[derive(Serialize)]
struct DayResponse {
    #[serde(flatten)]
    day: DayAttendance,
    is_checked_in: bool,
}

impl From<DayAttendance> for DayResponse {
    fn from(day: DayAttendance) -> Self {
        let is_checked_in = day.is_checked_in();
        Self { day, is_checked_in }
    }
}

fn reading(
    latitude: f64,
    longitude: f64,
    accuracy: Option<f64>,
    biometric_type: Option<BiometricType>,
    biometric_verified: Option<bool>,
) -> Result<LocationReading, AttendanceError> {
    let location = Point::new(latitude, longitude)?;
    let biometric = biometric_type.map(|biometric_type| Biometric {
        biometric_type,
        verified: biometric_verified.unwrap_or(false),
    });
    LocationReading::new(location, accuracy, biometric)
}

impl CheckInRequest {
    fn into_command(self, auth: &AuthUser) -> Result<CheckIn, AttendanceError> {
        Ok(CheckIn {
            user_id: auth.user_id,
            department: auth.department.clone(),
            reading: reading(
                self.latitude,
                self.longitude,
                self.accuracy,
                self.biometric_type,
                self.biometric_verified,
            )?,
        })
    }
}

impl CheckOutRequest {
    fn into_command(self, auth: &AuthUser) -> Result<CheckOut, AttendanceError> {
        let notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
            return Err(AttendanceError::InvalidRequest(format!(
                "notes cannot exceed {MAX_NOTES_LEN} characters"
            )));
        }

        Ok(CheckOut {
            user_id: auth.user_id,
            department: auth.department.clone(),
            reading: reading(
                self.latitude,
                self.longitude,
                self.accuracy,
                self.biometric_type,
                self.biometric_verified,
            )?,
            notes,
        })
    }
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body(
        content = CheckInRequest,
        description = "Current device location",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Check-in recorded (possibly flagged as a violation)", body = Object, example = json!({
            "attendance": {
                "id": "4f1c2a9e-0d4b-4c8e-9a57-2f0e6b1d3c11",
                "user_id": 7,
                "kind": "check_in",
                "timestamp": "2026-01-15T08:52:11Z",
                "location": { "latitude": 40.7128, "longitude": -74.006 },
                "accuracy_meters": 8.5,
                "matched_zone_id": 1,
                "is_within_zone": true,
                "is_violation": false,
                "violation_reason": null,
                "biometric_verified": true,
                "biometric_type": "fingerprint",
                "notes": null
            },
            "location_validation": {
                "is_valid": true,
                "is_in_restricted_zone": false,
                "matched_zone_id": 1,
                "nearest_zone_id": null,
                "nearest_distance_meters": null,
                "violation_reason": null
            }
        })),
        (status = 400, description = "Already checked in today or invalid coordinates", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "api_check_in", skip(engine, payload), fields(user_id = auth.user_id))]
pub async fn check_in(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    payload: web::Json<CheckInRequest>,
) -> actix_web::Result<impl Responder> {
    let command = payload.into_inner().into_command(&auth)?;
    let outcome = engine.check_in(command).await?;

    Ok(HttpResponse::Created().json(outcome))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body(
        content = CheckOutRequest,
        description = "Current device location and optional notes",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Check-out recorded", body = Object, example = json!({
            "attendance": { "kind": "check_out", "is_violation": false },
            "worked_hours": 8.25,
            "location_validation": { "is_valid": true, "is_in_restricted_zone": false }
        })),
        (status = 400, description = "No check-in today or already checked out", body = Object, example = json!({
            "message": "No check-in found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Check-out time precedes check-in time"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "api_check_out", skip(engine, payload), fields(user_id = auth.user_id))]
pub async fn check_out(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    payload: web::Json<CheckOutRequest>,
) -> actix_web::Result<impl Responder> {
    let command = payload.into_inner().into_command(&auth)?;
    let outcome = engine.check_out(command).await?;

    Ok(HttpResponse::Created().json(outcome))
}

/// Today's attendance for the caller
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Derived day status", body = Object, example = json!({
            "user_id": 7,
            "date": "2026-01-15",
            "check_in": null,
            "check_out": null,
            "worked_hours": null,
            "status": "absent",
            "is_checked_in": false
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
) -> actix_web::Result<impl Responder> {
    let day = engine.day_attendance(auth.user_id, None).await?;
    Ok(HttpResponse::Ok().json(DayResponse::from(day)))
}

/// Attendance history for the caller
#[utoipa::path(
    get,
    path = "/api/attendance/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Events, newest first", body = Object, example = json!({
            "records": []
        })),
        (status = 400, description = "start_date after end_date"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    query: web::Query<HistoryQuery>,
) -> actix_web::Result<impl Responder> {
    let policy = engine.policy();
    let from = query.start_date.map(|d| policy.day_start(d));
    let to = query.end_date.map(|d| policy.day_end(d));
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let records = engine.history(auth.user_id, from, to, limit).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "records": records })))
}

/// Day status for any user (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/attendance/users/{user_id}/day",
    params(
        ("user_id" = u64, Path, description = "User whose day to derive"),
        DayQuery
    ),
    responses(
        (status = 200, description = "Derived day status", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn user_day(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    path: web::Path<u64>,
    query: web::Query<DayQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let day = engine.day_attendance(path.into_inner(), query.date).await?;
    Ok(HttpResponse::Ok().json(DayResponse::from(day)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{bearer, test_app};
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    const AT_OFFICE: (f64, f64) = (40.7128, -74.0060);

    fn location_body(lat: f64, lng: f64) -> Value {
        json!({ "latitude": lat, "longitude": lng, "accuracy": 6.0 })
    }

    #[actix_web::test]
    async fn check_in_then_duplicate() {
        let app = test::init_service(test_app()).await;

        let req = test::TestRequest::post()
            .uri("/api/attendance/check-in")
            .insert_header(bearer(7, 3))
            .set_json(location_body(AT_OFFICE.0, AT_OFFICE.1))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["location_validation"]["is_valid"], json!(true));
        assert_eq!(body["attendance"]["kind"], json!("check_in"));
        assert_eq!(body["attendance"]["matched_zone_id"], json!(1));

        let req = test::TestRequest::post()
            .uri("/api/attendance/check-in")
            .insert_header(bearer(7, 3))
            .set_json(location_body(AT_OFFICE.0, AT_OFFICE.1))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], json!("Already checked in today"));
    }

    #[actix_web::test]
    async fn check_out_requires_check_in() {
        let app = test::init_service(test_app()).await;

        let req = test::TestRequest::post()
            .uri("/api/attendance/check-out")
            .insert_header(bearer(8, 3))
            .set_json(location_body(AT_OFFICE.0, AT_OFFICE.1))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], json!("No check-in found for today"));
    }

    #[actix_web::test]
    async fn full_day_over_http() {
        let app = test::init_service(test_app()).await;

        let req = test::TestRequest::post()
            .uri("/api/attendance/check-in")
            .insert_header(bearer(9, 3))
            .set_json(json!({
                "latitude": AT_OFFICE.0,
                "longitude": AT_OFFICE.1,
                "biometric_type": "face",
                "biometric_verified": true
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/attendance/check-out")
            .insert_header(bearer(9, 3))
            .set_json(json!({
                "latitude": AT_OFFICE.0,
                "longitude": AT_OFFICE.1,
                "notes": "  wrapped up  "
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["worked_hours"].as_f64().unwrap() >= 0.0);
        assert_eq!(body["attendance"]["notes"], json!("wrapped up"));

        let req = test::TestRequest::get()
            .uri("/api/attendance/today")
            .insert_header(bearer(9, 3))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["is_checked_in"], json!(false));
        assert_eq!(body["check_in"]["biometric_type"], json!("face"));
        assert!(body["worked_hours"].is_number());

        let req = test::TestRequest::get()
            .uri("/api/attendance/history?limit=1")
            .insert_header(bearer(9, 3))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["records"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn rejects_out_of_range_coordinates() {
        let app = test::init_service(test_app()).await;

        let req = test::TestRequest::post()
            .uri("/api/attendance/check-in")
            .insert_header(bearer(7, 3))
            .set_json(location_body(123.0, 0.0))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn requires_a_token() {
        let app = test::init_service(test_app()).await;

        let req = test::TestRequest::get()
            .uri("/api/attendance/today")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn user_day_is_hr_only() {
        let app = test::init_service(test_app()).await;

        let req = test::TestRequest::get()
            .uri("/api/attendance/users/7/day")
            .insert_header(bearer(8, 3))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/api/attendance/users/7/day?date=2026-01-15")
            .insert_header(bearer(1, 2))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], json!("absent"));
        assert_eq!(body["date"], json!("2026-01-15"));
    }
}
