use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use hr_telemetry_backend::config::settings::get_config;
use hr_telemetry_backend::run_metrics_exporter;
use hr_telemetry_backend::services::metrics::PrometheusMetrics;
use hr_telemetry_backend::services::{DataIngestion, IngestionScheduler};
use hr_telemetry_backend::telemetry::{get_subscriber, init_subscriber};

/// Replay recorded heart-rate days into the database.
#[derive(Parser, Debug)]
#[command(name = "ingest", version)]
struct Cli {
    /// Reset the simulation to start from day 0
    #[arg(long)]
    reset: bool,
    /// Print the current simulation status
    #[arg(long)]
    status: bool,
    /// Check database connectivity
    #[arg(long)]
    health: bool,
    /// Number of days to ingest
    #[arg(long, default_value_t = 1)]
    days: u32,
    /// Keep running and ingest one day per configured schedule tick
    #[arg(long)]
    daemon: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = get_config().expect("Failed to read the config.");
    let settings = config.ingestion.clone();

    let log_dir = settings.log_dir.clone();
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Failed to create log directory {}: {}", log_dir.display(), e);
        std::process::exit(1);
    }
    let log_file = log_dir.join(format!(
        "ingestion_{}.log",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ));
    let file = match std::fs::File::create(&log_file) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to create log file {}: {}", log_file.display(), e);
            std::process::exit(1);
        }
    };
    println!("Logging to {}", log_file.display());

    let subscriber = get_subscriber(
        "ingest".into(),
        config.application.log_level.clone(),
        std::io::stdout.and(Mutex::new(file)),
    );
    init_subscriber(subscriber);

    let pool = PgPoolOptions::new()
        .max_connections(4)
        .acquire_timeout(Duration::from_secs(10))
        .connect_lazy(config.database.connection_string().expose_secret())
        .expect("Failed to create Postgres connection pool");

    let metrics = match PrometheusMetrics::new() {
        Ok(metrics) => Arc::new(metrics),
        Err(e) => {
            tracing::error!("Failed to build metrics registry: {}", e);
            std::process::exit(1);
        }
    };
    let ingestion = Arc::new(DataIngestion::new(pool, settings.clone(), metrics.clone()));

    if cli.reset {
        match ingestion.reset() {
            Ok(()) => {
                println!("Simulation reset successfully.");
                std::process::exit(0);
            }
            Err(e) => {
                tracing::error!("Failed to reset simulation: {}", e);
                std::process::exit(1);
            }
        }
    }

    if cli.status {
        print_status(&ingestion);
        std::process::exit(0);
    }

    if cli.health {
        match ingestion.health_check().await {
            Ok(()) => {
                println!("Health Status: healthy (database connected)");
                std::process::exit(0);
            }
            Err(e) => {
                println!("Health Status: unhealthy ({})", e);
                std::process::exit(1);
            }
        }
    }

    serve_metrics(metrics.clone(), settings.metrics_port);

    if cli.daemon {
        run_daemon(ingestion, &settings.schedule).await;
        return;
    }

    print_status(&ingestion);
    match ingestion.ingest(cli.days).await {
        Ok(reports) => {
            let points: usize = reports.iter().map(|r| r.data_points).sum();
            tracing::info!(
                days = reports.len(),
                data_points = points,
                "Ingestion run finished"
            );
        }
        Err(e) => {
            tracing::error!("Fatal error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Exposes the run's counters while the process is alive. A port already
/// in use is logged and skipped.
fn serve_metrics(metrics: Arc<PrometheusMetrics>, port: u16) {
    let address = format!("0.0.0.0:{}", port);
    let listener = match TcpListener::bind(&address) {
        Ok(listener) => listener,
        Err(e) => {
            tracing::warn!("Metrics endpoint not started on {}: {}", address, e);
            return;
        }
    };
    match run_metrics_exporter(listener, metrics) {
        Ok(server) => {
            tracing::info!("Prometheus metrics served on {}/metrics", address);
            tokio::spawn(server);
        }
        Err(e) => tracing::warn!("Metrics endpoint not started on {}: {}", address, e),
    }
}

fn print_status(ingestion: &DataIngestion) {
    match ingestion.status() {
        Ok(status) => {
            println!("Simulation Status: {}", status.progress);
            println!("Next Date to Process: {}", status.current_date);
        }
        Err(e) => {
            tracing::error!("Failed to read simulation status: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_daemon(ingestion: Arc<DataIngestion>, schedule: &str) {
    let scheduler = match IngestionScheduler::new(ingestion).await {
        Ok(scheduler) => scheduler,
        Err(e) => {
            tracing::error!("❌ Failed to create ingestion scheduler: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = scheduler.schedule_daily(schedule).await {
        tracing::error!("❌ Invalid ingestion schedule '{}': {}", schedule, e);
        std::process::exit(1);
    }
    if let Err(e) = scheduler.start().await {
        tracing::error!("❌ Failed to start scheduler: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    if let Err(e) = scheduler.stop().await {
        tracing::error!("Failed to stop scheduler: {}", e);
    }
}
