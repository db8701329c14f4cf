use actix_web::{get, web, HttpRequest, HttpResponse};

use crate::db::record_store::RecordStore;
use crate::handlers::dashboard;
use crate::services::metrics::MetricsReporter;

#[get("/dashboard/summary")]
async fn dashboard_summary(
    req: HttpRequest,
    store: web::Data<dyn RecordStore>,
    metrics: web::Data<dyn MetricsReporter>,
) -> HttpResponse {
    dashboard::get_dashboard_summary(req, store, metrics).await
}

#[get("/adherence")]
async fn adherence(
    req: HttpRequest,
    store: web::Data<dyn RecordStore>,
    metrics: web::Data<dyn MetricsReporter>,
) -> HttpResponse {
    dashboard::get_adherence(req, store, metrics).await
}
