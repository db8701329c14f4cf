use actix_web::web;

pub mod backend_health;
pub mod dashboard;
pub mod data;
pub mod email;
pub mod metrics;
pub mod participants;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(backend_health::backend_health)
        .service(metrics::metrics);

    // Heart rate read API
    cfg.service(data::get_data)
        .service(data::get_data_stats)
        .service(data::impute_data);

    cfg.service(participants::list_participants)
        .service(participants::participant_metrics);

    // Study dashboard
    cfg.service(dashboard::dashboard_summary)
        .service(dashboard::adherence)
        .service(email::send_email);
}
