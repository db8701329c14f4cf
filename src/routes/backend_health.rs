use actix_web::{get, web, Responder};

use crate::db::record_store::RecordStore;
use crate::handlers::backend_health::backend_health_check;

#[get("/status")]
async fn backend_health(store: web::Data<dyn RecordStore>) -> impl Responder {
    backend_health_check(store).await
}
