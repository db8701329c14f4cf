use actix_web::{post, web, HttpResponse};

use crate::db::record_store::RecordStore;
use crate::handlers::email::{self, EmailRequest};
use crate::services::metrics::MetricsReporter;

#[post("/email/send")]
async fn send_email(
    body: web::Json<EmailRequest>,
    store: web::Data<dyn RecordStore>,
    metrics: web::Data<dyn MetricsReporter>,
) -> HttpResponse {
    email::send_email(body, store, metrics).await
}
