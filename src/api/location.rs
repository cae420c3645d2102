use crate::attendance::engine::{AttendanceEngine, LocationReading};
use crate::auth::auth::AuthUser;
use crate::geofence::Point;
use crate::model::location::Motion;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

const DEFAULT_TRAIL_LIMIT: u32 = 100;
const MAX_TRAIL_LIMIT: u32 = 500;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordLocationRequest {
    #[schema(example = 40.7128)]
    pub latitude: f64,
    #[schema(example = -74.0060)]
    pub longitude: f64,
    /// Reported GPS accuracy in meters
    #[schema(example = 8.5)]
    pub accuracy: Option<f64>,
    /// Meters per second
    #[schema(example = 1.4)]
    pub speed: Option<f64>,
    /// Degrees clockwise from north
    #[schema(example = 270.0)]
    pub heading: Option<f64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LocationHistoryQuery {
    /// First day to include (inclusive)
    #[schema(example = "2026-01-01")]
    pub start_date: Option<NaiveDate>,
    /// Last day to include (inclusive)
    #[schema(example = "2026-01-31")]
    pub end_date: Option<NaiveDate>,
    /// Maximum number of points, newest first (default 100, max 500)
    #[schema(example = 100)]
    pub limit: Option<u32>,
}

/// Record a tracking point
#[utoipa::path(
    post,
    path = "/api/location",
    request_body(
        content = RecordLocationRequest,
        description = "Current device location",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Point recorded", body = Object, example = json!({
            "location": {
                "id": "9b2d7f4e-3c1a-4e8b-a0f5-6d2c1b7e9a30",
                "user_id": 7,
                "location": { "latitude": 40.7128, "longitude": -74.006 },
                "accuracy_meters": 8.5,
                "speed_mps": 1.4,
                "heading_degrees": 270.0,
                "timestamp": "2026-01-15T10:12:40Z"
            }
        })),
        (status = 400, description = "Invalid coordinates, accuracy, speed or heading"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Location"
)]
#[instrument(name = "api_record_location", skip(engine, payload), fields(user_id = auth.user_id))]
pub async fn record_location(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    payload: web::Json<RecordLocationRequest>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();
    let reading = LocationReading::new(
        Point::new(payload.latitude, payload.longitude)?,
        payload.accuracy,
        None,
    )?;
    let motion = Motion::new(payload.speed, payload.heading)?;

    let location = engine.record_location(auth.user_id, reading, motion).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({ "location": location })))
}

/// Location trail for the caller
#[utoipa::path(
    get,
    path = "/api/location/history",
    params(LocationHistoryQuery),
    responses(
        (status = 200, description = "Points, newest first", body = Object, example = json!({
            "locations": []
        })),
        (status = 400, description = "start_date after end_date"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Location"
)]
pub async fn location_history(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    query: web::Query<LocationHistoryQuery>,
) -> actix_web::Result<impl Responder> {
    let policy = engine.policy();
    let from = query.start_date.map(|d| policy.day_start(d));
    let to = query.end_date.map(|d| policy.day_end(d));
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TRAIL_LIMIT)
        .clamp(1, MAX_TRAIL_LIMIT);

    let locations = engine
        .location_history(auth.user_id, from, to, limit)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "locations": locations })))
}
