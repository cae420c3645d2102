use crate::attendance::engine::AttendanceEngine;
use crate::auth::auth::AuthUser;
use crate::geofence::Point;
use crate::model::zone::ZoneId;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateLocationRequest {
    #[schema(example = 40.7128)]
    pub latitude: f64,
    #[schema(example = -74.0060)]
    pub longitude: f64,
}

/// Active work zones visible to the caller
#[utoipa::path(
    get,
    path = "/api/geofence",
    responses(
        (status = 200, description = "Active zones for the caller's department", body = Object, example = json!({
            "zones": [{
                "id": 1,
                "name": "Head Office",
                "shape": {
                    "kind": "circle",
                    "center": { "latitude": 40.7128, "longitude": -74.006 },
                    "radius_meters": 100.0
                },
                "is_restricted": false,
                "buffer_meters": 10.0,
                "department": null
            }]
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Geofence"
)]
pub async fn list_zones(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
) -> actix_web::Result<impl Responder> {
    let zones = engine.active_zones(auth.department.as_deref()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "zones": &*zones })))
}

/// One active zone by id
#[utoipa::path(
    get,
    path = "/api/geofence/{id}",
    params(
        ("id" = u64, Path, description = "Zone id")
    ),
    responses(
        (status = 200, description = "Zone found", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No active zone with this id for the caller")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Geofence"
)]
pub async fn get_zone(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    path: web::Path<ZoneId>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();
    let zones = engine.active_zones(auth.department.as_deref()).await?;
    let zone = zones
        .iter()
        .find(|z| z.id == id)
        .ok_or_else(|| actix_web::error::ErrorNotFound(format!("Work zone {id} not found")))?;

    Ok(HttpResponse::Ok().json(zone))
}

/// Dry-run a location against the caller's zones
#[utoipa::path(
    post,
    path = "/api/geofence/validate",
    request_body(
        content = ValidateLocationRequest,
        description = "Location to resolve; nothing is recorded",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Resolution result", body = crate::geofence::ValidationResult),
        (status = 400, description = "Invalid coordinates", body = Object, example = json!({
            "message": "Invalid coordinates: latitude 123 outside [-90, 90]"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Geofence"
)]
#[instrument(name = "api_validate_location", skip(engine, payload), fields(user_id = auth.user_id))]
pub async fn validate_location(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    payload: web::Json<ValidateLocationRequest>,
) -> actix_web::Result<impl Responder> {
    let location = Point::new(payload.latitude, payload.longitude)?;
    let result = engine
        .validate_location(location, auth.department.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(result))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{bearer, bearer_in, test_app};
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn validate_inside_and_outside() {
        let app = test::init_service(test_app()).await;

        let req = test::TestRequest::post()
            .uri("/api/geofence/validate")
            .insert_header(bearer(7, 3))
            .set_json(json!({ "latitude": 40.7128, "longitude": -74.0060 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["is_valid"], json!(true));
        assert_eq!(body["matched_zone_id"], json!(1));

        let req = test::TestRequest::post()
            .uri("/api/geofence/validate")
            .insert_header(bearer(7, 3))
            .set_json(json!({ "latitude": 40.7200, "longitude": -74.0060 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["is_valid"], json!(false));
        assert_eq!(body["nearest_zone_id"], json!(1));
        assert!(
            body["violation_reason"]
                .as_str()
                .unwrap()
                .starts_with("Location is outside allowed work zones")
        );
    }

    #[actix_web::test]
    async fn validate_rejects_bad_coordinates() {
        let app = test::init_service(test_app()).await;

        let req = test::TestRequest::post()
            .uri("/api/geofence/validate")
            .insert_header(bearer(7, 3))
            .set_json(json!({ "latitude": 0.0, "longitude": 181.0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn zones_follow_the_department_claim() {
        let app = test::init_service(test_app()).await;

        let req = test::TestRequest::get()
            .uri("/api/geofence")
            .insert_header(bearer(7, 3))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["zones"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::get()
            .uri("/api/geofence")
            .insert_header(bearer_in(7, 3, "warehouse"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let zones = body["zones"].as_array().unwrap();
        assert_eq!(zones.len(), 2);
        assert!(zones.iter().any(|z| z["department"] == json!("warehouse")));
    }

    #[actix_web::test]
    async fn scoped_zone_is_hidden_from_other_departments() {
        let app = test::init_service(test_app()).await;

        let req = test::TestRequest::get()
            .uri("/api/geofence/2")
            .insert_header(bearer_in(7, 3, "warehouse"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["name"], json!("Warehouse"));
        assert_eq!(body["shape"]["kind"], json!("circle"));

        let req = test::TestRequest::get()
            .uri("/api/geofence/2")
            .insert_header(bearer(7, 3))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
