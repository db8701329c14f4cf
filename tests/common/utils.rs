use std::net::TcpListener;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use once_cell::sync::Lazy;
use secrecy::ExposeSecret;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;

use hr_telemetry_backend::config::settings::{get_config, DatabaseSettings, PaginationSettings};
use hr_telemetry_backend::db::InMemoryRecordStore;
use hr_telemetry_backend::models::participant::Participant;
use hr_telemetry_backend::run;
use hr_telemetry_backend::services::metrics::PrometheusMetrics;
use hr_telemetry_backend::telemetry::{get_subscriber, init_subscriber};

// Ensure that the `tracing` stack is only initialised once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(
            subscriber_name,
            default_filter_level,
            std::io::stdout
        );
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(
            subscriber_name,
            default_filter_level,
            std::io::sink
        );
        init_subscriber(subscriber);
    }
});

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryRecordStore>,
    pub metrics: Arc<PrometheusMetrics>,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_store(InMemoryRecordStore::new()).await
}

pub async fn spawn_app_with_store(store: InMemoryRecordStore) -> TestApp {
    // The first time `initialize` is invoked the code in `TRACING` is executed.
    // All other invocations will instead skip execution.
    Lazy::force(&TRACING);

    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    // Get port assigned by the OS
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = Arc::new(store);
    let metrics = Arc::new(PrometheusMetrics::new().expect("Failed to build the metrics registry"));
    let server = run(
        listener,
        store.clone(),
        metrics.clone(),
        PaginationSettings::default(),
        vec![],
    )
        .expect("Failed to bind address");
    // Launch the server as a background task
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        metrics,
    }
}

pub fn jan_first_at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
}

/// Ten minute-spaced samples for participant 1 on 2024-01-01, 00:00 to 00:09.
pub fn ten_minute_store() -> InMemoryRecordStore {
    let store = InMemoryRecordStore::new();
    for m in 0..10 {
        store.insert(1, jan_first_at(m), 60.0 + m as f64);
    }
    store.add_participant(Participant {
        participant_id: 1,
        name: "Participant 1".to_string(),
        token: None,
    });
    store
}

/// Fresh, migrated database named after a random uuid.
pub async fn fresh_database() -> PgPool {
    Lazy::force(&TRACING);

    let mut configuration = get_config().expect("Failed to read configuration.");
    configuration.database.db_name = Uuid::new_v4().to_string();
    configuration.database.db_url = None;
    configure_db(&configuration.database).await
}

pub async fn configure_db(config: &DatabaseSettings) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect(
            &config.connection_string_without_db()
        )
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.db_name).as_str())
        .await
        .expect("Failed to create database.");

    // Migrate database
    let connection_pool = PgPool::connect(&config.connection_string().expose_secret())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database");

    connection_pool
}

pub async fn insert_sample(pool: &PgPool, participant_id: i32, timestamp: DateTime<Utc>, value: f64) {
    sqlx::query(
        "INSERT INTO raw_data (participant_id, timestamp, metric_type, value) VALUES ($1, $2, 'heart_rate', $3)",
    )
    .bind(participant_id)
    .bind(timestamp)
    .bind(value)
    .execute(pool)
    .await
    .expect("Failed to insert sample.");
}
