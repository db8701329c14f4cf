use actix_web::{http, web, App, HttpServer};
use actix_web::dev::Server;
use tracing_actix_web::TracingLogger;
use std::net::TcpListener;
use std::sync::Arc;
use actix_cors::Cors;

pub mod config;
pub mod db;
pub mod errors;
mod handlers;
pub mod models;
mod routes;
pub mod services;
pub mod telemetry;
use crate::config::settings::PaginationSettings;
use crate::db::record_store::RecordStore;
use crate::routes::init_routes;
use crate::services::metrics::{PrometheusMetrics, MetricsReporter};

pub fn run(
    listener: TcpListener,
    store: Arc<dyn RecordStore>,
    metrics: Arc<PrometheusMetrics>,
    pagination: PaginationSettings,
    allowed_origins: Vec<String>,
) -> Result<Server, std::io::Error> {
    tracing::info!(backend = store.backend_type(), "Serving heart rate data");

    // Wrap using web::Data, which boils down to an Arc smart pointer
    let store_data: web::Data<dyn RecordStore> = web::Data::from(store);
    let reporter: Arc<dyn MetricsReporter> = metrics.clone();
    let reporter_data: web::Data<dyn MetricsReporter> = web::Data::from(reporter);
    let counters_data = web::Data::from(metrics);
    let pagination_data = web::Data::new(pagination);

    let server = HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![http::header::ACCEPT, http::header::CONTENT_TYPE])
            .max_age(3600);
        if allowed_origins.is_empty() {
            cors = cors.allow_any_origin();
        }
        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            // Get a pointer copy and attach it to the application state
            .app_data(store_data.clone())
            .app_data(reporter_data.clone())
            .app_data(counters_data.clone())
            .app_data(pagination_data.clone())
            .configure(init_routes)
    })
    .listen(listener)?
    .run();

    Ok(server)
}

/// Stand-alone `/metrics` endpoint for processes without the data API.
pub fn run_metrics_exporter(
    listener: TcpListener,
    metrics: Arc<PrometheusMetrics>,
) -> Result<Server, std::io::Error> {
    let counters_data = web::Data::from(metrics);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(counters_data.clone())
            .service(routes::metrics::metrics)
    })
    .workers(1)
    .listen(listener)?
    .run();

    Ok(server)
}
