use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::db::record_store::RecordStore;

pub async fn backend_health_check(store: web::Data<dyn RecordStore>) -> HttpResponse {
    match store.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "ok"
        })),
        Err(e) => {
            tracing::error!(backend = store.backend_type(), "Health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "unavailable",
                "detail": e.to_string()
            }))
        }
    }
}
