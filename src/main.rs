use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

mod api;
mod attendance;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod geofence;
mod model;
mod models;
mod routes;
mod store;
mod utils;

use config::Config;
use db::init_db;

use crate::attendance::engine::AttendanceEngine;
use crate::attendance::notify::TracingEventSink;
use crate::docs::ApiDoc;
use crate::store::mysql::{MySqlEventRepository, MySqlLocationTrail, MySqlZoneProvider};
use crate::utils::zone_cache::CachedZoneProvider;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Geofence attendance service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(true) // attendance_update records are routed by target
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(addr = %config.server_addr, timezone = %config.timezone, "Server starting...");

    let pool = init_db(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let zones = CachedZoneProvider::new(
        Arc::new(MySqlZoneProvider::new(pool.clone())),
        Duration::from_secs(config.zone_cache_ttl_secs),
    );
    let engine = Data::new(AttendanceEngine::new(
        Arc::new(MySqlEventRepository::new(pool.clone())),
        Arc::new(zones),
        Arc::new(MySqlLocationTrail::new(pool)),
        Arc::new(TracingEventSink),
        config.attendance_policy(),
    ));

    let limiter = Arc::new(routes::build_limiter(config.rate_protected_per_min)?);
    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config);

    HttpServer::new(move || {
        let api_prefix = config_data.api_prefix.clone();
        let limiter = limiter.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(config_data.clone())
            .app_data(engine.clone())
            .service(index)
            // protected routes with rate limiting
            .configure(move |cfg| routes::configure(cfg, &api_prefix, limiter))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
