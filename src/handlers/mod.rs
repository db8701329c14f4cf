use actix_web::{HttpResponse, ResponseError};

use crate::errors::QueryError;
use crate::services::metrics::MetricsReporter;

pub mod backend_health;
pub mod dashboard;
pub mod data;
pub mod email;
pub mod metrics;
pub mod participants;
pub mod query_params;

/// Turn a handler result into a response and count it under `endpoint`.
pub(crate) fn finish(
    endpoint: &'static str,
    result: Result<HttpResponse, QueryError>,
    metrics: &dyn MetricsReporter,
) -> HttpResponse {
    let response = result.unwrap_or_else(|e| {
        tracing::warn!(endpoint, error = %e, "Request rejected");
        e.error_response()
    });
    metrics.request_served(endpoint, response.status().as_u16());
    response
}
