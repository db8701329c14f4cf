//! Outreach to participants. Delivery is mocked: requests are validated,
//! logged and acknowledged, nothing leaves the process.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::db::record_store::RecordStore;
use crate::errors::QueryError;
use crate::handlers::finish;
use crate::services::metrics::MetricsReporter;

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub participant_ids: Vec<i32>,
    pub subject: String,
    pub message: String,
}

#[tracing::instrument(
    name = "Send participant email",
    skip(body, store, metrics),
    fields(recipients = body.participant_ids.len())
)]
pub async fn send_email(
    body: web::Json<EmailRequest>,
    store: web::Data<dyn RecordStore>,
    metrics: web::Data<dyn MetricsReporter>,
) -> HttpResponse {
    let result = mock_send(&body, store.get_ref()).await;
    finish("email_send", result, metrics.get_ref())
}

async fn mock_send(request: &EmailRequest, store: &dyn RecordStore) -> Result<HttpResponse, QueryError> {
    if request.participant_ids.is_empty() {
        return Err(QueryError::invalid("At least one recipient is required."));
    }
    if request.subject.trim().is_empty() || request.message.trim().is_empty() {
        return Err(QueryError::invalid("Subject and message must not be empty."));
    }

    let known = store.list_participants().await?;
    let unknown: Vec<i32> = request
        .participant_ids
        .iter()
        .copied()
        .filter(|id| !known.iter().any(|p| p.participant_id == *id))
        .collect();
    if !unknown.is_empty() {
        return Err(QueryError::invalid(format!("Unknown participant ids: {:?}.", unknown)));
    }

    for participant_id in &request.participant_ids {
        tracing::info!(participant_id, subject = %request.subject, "Mock email sent");
    }

    Ok(HttpResponse::Ok().json(json!({
        "status": "sent",
        "delivery": "mock",
        "recipients": request.participant_ids,
        "subject": request.subject,
    })))
}
