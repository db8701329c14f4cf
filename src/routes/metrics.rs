use actix_web::{get, web, HttpResponse};

use crate::handlers::metrics::render_metrics;
use crate::services::metrics::PrometheusMetrics;

#[get("/metrics")]
async fn metrics(counters: web::Data<PrometheusMetrics>) -> HttpResponse {
    render_metrics(counters).await
}
