use crate::{
    api::{attendance, geofence, location},
    auth::middleware::auth_middleware,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Context, Result};
use std::sync::Arc;

pub type Limiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP limiter allowing `requests_per_min` with an equal burst.
pub fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        60_000 / requests_per_min as u64
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms.max(1))
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .context("invalid rate limiter configuration")?;
    Ok(Governor::new(&cfg))
}

/// Attendance, geofence and location resources, relative to the API prefix.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/attendance")
            // /attendance/check-in
            .service(web::resource("/check-in").route(web::post().to(attendance::check_in)))
            // /attendance/check-out
            .service(web::resource("/check-out").route(web::post().to(attendance::check_out)))
            // /attendance/today
            .service(web::resource("/today").route(web::get().to(attendance::today)))
            // /attendance/history
            .service(web::resource("/history").route(web::get().to(attendance::history)))
            // /attendance/users/{user_id}/day
            .service(
                web::resource("/users/{user_id}/day").route(web::get().to(attendance::user_day)),
            ),
    )
    .service(
        web::scope("/geofence")
            // /geofence
            .service(web::resource("").route(web::get().to(geofence::list_zones)))
            // /geofence/validate
            .service(
                web::resource("/validate").route(web::post().to(geofence::validate_location)),
            )
            // /geofence/{id}
            .service(web::resource("/{id}").route(web::get().to(geofence::get_zone))),
    )
    .service(
        web::scope("/location")
            // /location
            .service(web::resource("").route(web::post().to(location::record_location)))
            // /location/history
            .service(web::resource("/history").route(web::get().to(location::location_history))),
    );
}

pub fn configure(cfg: &mut web::ServiceConfig, api_prefix: &str, limiter: Arc<Limiter>) {
    // Protected routes
    cfg.service(
        web::scope(api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiter) // rate limiting
            .configure(api_routes),
    );
}
