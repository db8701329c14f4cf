use actix_web::{get, web, HttpRequest, HttpResponse};

use crate::db::record_store::RecordStore;
use crate::handlers::participants;
use crate::services::metrics::MetricsReporter;

#[get("/participants")]
async fn list_participants(
    store: web::Data<dyn RecordStore>,
    metrics: web::Data<dyn MetricsReporter>,
) -> HttpResponse {
    participants::list_participants(store, metrics).await
}

#[get("/participants/{participant_id}/metrics")]
async fn participant_metrics(
    req: HttpRequest,
    path: web::Path<i32>,
    store: web::Data<dyn RecordStore>,
    metrics: web::Data<dyn MetricsReporter>,
) -> HttpResponse {
    participants::participant_metrics(req, path.into_inner(), store, metrics).await
}
