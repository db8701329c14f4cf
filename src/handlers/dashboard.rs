use actix_web::{web, HttpRequest, HttpResponse};

use crate::db::record_store::RecordStore;
use crate::errors::QueryError;
use crate::handlers::finish;
use crate::handlers::query_params::QueryParams;
use crate::services::adherence::{adherence_report, dashboard_summary, window_start};
use crate::services::metrics::MetricsReporter;

#[tracing::instrument(
    name = "Get dashboard summary",
    skip(req, store, metrics),
    fields(query = %req.query_string())
)]
pub async fn get_dashboard_summary(
    req: HttpRequest,
    store: web::Data<dyn RecordStore>,
    metrics: web::Data<dyn MetricsReporter>,
) -> HttpResponse {
    let params = QueryParams::from_request(&req);
    let result = summary(&params, store.get_ref()).await;
    finish("dashboard_summary", result, metrics.get_ref())
}

async fn summary(params: &QueryParams, store: &dyn RecordStore) -> Result<HttpResponse, QueryError> {
    let as_of = params.as_of()?;
    let participants = store.list_participants().await?;
    let activity = store.activity(window_start(as_of), as_of).await?;
    let overview = store.data_overview().await?;

    Ok(HttpResponse::Ok().json(dashboard_summary(&participants, &activity, &overview, as_of)))
}

#[tracing::instrument(
    name = "Get adherence",
    skip(req, store, metrics),
    fields(query = %req.query_string())
)]
pub async fn get_adherence(
    req: HttpRequest,
    store: web::Data<dyn RecordStore>,
    metrics: web::Data<dyn MetricsReporter>,
) -> HttpResponse {
    let params = QueryParams::from_request(&req);
    let result = adherence(&params, store.get_ref()).await;
    finish("adherence", result, metrics.get_ref())
}

async fn adherence(params: &QueryParams, store: &dyn RecordStore) -> Result<HttpResponse, QueryError> {
    let as_of = params.as_of()?;
    let participants = store.list_participants().await?;
    let activity = store.activity(window_start(as_of), as_of).await?;

    let report = adherence_report(&participants, &activity, as_of);
    tracing::info!(
        participants = report.total_participants,
        issues = report.issues_count,
        "Assessed adherence"
    );

    Ok(HttpResponse::Ok().json(report))
}
