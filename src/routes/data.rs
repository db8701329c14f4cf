use actix_web::{get, web, HttpRequest, HttpResponse};

use crate::config::settings::PaginationSettings;
use crate::db::record_store::RecordStore;
use crate::handlers::data;
use crate::services::metrics::MetricsReporter;

#[get("/data")]
async fn get_data(
    req: HttpRequest,
    store: web::Data<dyn RecordStore>,
    metrics: web::Data<dyn MetricsReporter>,
    pagination: web::Data<PaginationSettings>,
) -> HttpResponse {
    data::get_data(req, store, metrics, pagination).await
}

#[get("/data/stats")]
async fn get_data_stats(
    req: HttpRequest,
    store: web::Data<dyn RecordStore>,
    metrics: web::Data<dyn MetricsReporter>,
) -> HttpResponse {
    data::get_data_stats(req, store, metrics).await
}

#[get("/data/impute")]
async fn impute_data(
    req: HttpRequest,
    store: web::Data<dyn RecordStore>,
    metrics: web::Data<dyn MetricsReporter>,
) -> HttpResponse {
    data::impute_data(req, store, metrics).await
}
