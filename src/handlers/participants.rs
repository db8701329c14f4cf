use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use serde_json::json;

use crate::db::record_store::RecordStore;
use crate::errors::QueryError;
use crate::handlers::data::date_range;
use crate::handlers::finish;
use crate::handlers::query_params::QueryParams;
use crate::services::metrics::MetricsReporter;

#[tracing::instrument(name = "List participants", skip(store, metrics))]
pub async fn list_participants(
    store: web::Data<dyn RecordStore>,
    metrics: web::Data<dyn MetricsReporter>,
) -> HttpResponse {
    let response = match store.list_participants().await {
        Ok(participants) => {
            tracing::info!(count = participants.len(), "Listed participants");
            HttpResponse::Ok().json(participants)
        }
        Err(e) => {
            tracing::error!("Failed to list participants: {}", e);
            QueryError::StoreUnavailable(e).error_response()
        }
    };
    metrics.request_served("participants", response.status().as_u16());
    response
}

#[tracing::instrument(
    name = "Get participant metrics",
    skip(req, store, metrics),
    fields(query = %req.query_string())
)]
pub async fn participant_metrics(
    req: HttpRequest,
    participant_id: i32,
    store: web::Data<dyn RecordStore>,
    metrics: web::Data<dyn MetricsReporter>,
) -> HttpResponse {
    let params = QueryParams::from_request(&req);
    let result = metrics_for(participant_id, &params, store.get_ref()).await;
    finish("participant_metrics", result, metrics.get_ref())
}

async fn metrics_for(
    participant_id: i32,
    params: &QueryParams,
    store: &dyn RecordStore,
) -> Result<HttpResponse, QueryError> {
    let (start_date, end_date) = date_range(params)?;
    let participant = store
        .list_participants()
        .await?
        .into_iter()
        .find(|p| p.participant_id == participant_id)
        .ok_or_else(|| QueryError::NotFound(format!("Participant {} not found.", participant_id)))?;

    let heart_rate_summary = store
        .heart_rate_summary(participant_id, start_date, end_date)
        .await?;
    let daily_summaries = store
        .daily_summaries(participant_id, start_date, end_date)
        .await?;
    let heart_rate_zones = store
        .zone_averages(participant_id, start_date, end_date)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "participant_id": participant.participant_id,
        "participant_name": participant.name,
        "date_range": {
            "start_date": start_date,
            "end_date": end_date,
        },
        "heart_rate_summary": heart_rate_summary,
        "daily_summaries": daily_summaries,
        "heart_rate_zones": heart_rate_zones,
    })))
}
