use actix_web::{web, HttpResponse};

use crate::services::metrics::PrometheusMetrics;

pub async fn render_metrics(counters: web::Data<PrometheusMetrics>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(counters.render())
}
