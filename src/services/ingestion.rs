//! Replays a recorded intraday heart-rate export into the raw tables, one
//! simulated day per run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;

use crate::config::settings::IngestionSettings;
use crate::db::ingestion::{upsert_daily_summary, upsert_heart_rate_zone, upsert_raw_point};
use crate::models::ingestion::{DayReport, HeartRateDay, RecordedDay, SimulationState, SimulationStatus};
use crate::services::metrics::MetricsReporter;

const HEART_RATE_EXPORT: &str = "hr.json";

#[derive(thiserror::Error, Debug)]
pub enum IngestionError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed export {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid recorded day: {0}")]
    InvalidRecord(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IngestionError {
    /// Label used for the error counter.
    pub fn error_type(&self) -> &'static str {
        match self {
            IngestionError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                "file_not_found"
            }
            IngestionError::Io { .. } => "io",
            IngestionError::Json { .. } => "json_decode",
            IngestionError::InvalidRecord(_) => "invalid_record",
            IngestionError::Database(_) => "database",
        }
    }
}

pub fn load_recorded_days(path: &Path) -> Result<Vec<RecordedDay>, IngestionError> {
    let content = std::fs::read_to_string(path).map_err(|source| IngestionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| IngestionError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Missing or unreadable state means the replay starts from day 0.
pub fn read_state(path: &Path) -> SimulationState {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|content| serde_json::from_str(&content).ok())
        .unwrap_or_default()
}

pub fn write_state(path: &Path, state: &SimulationState) -> Result<(), IngestionError> {
    let io_error = |source| IngestionError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    let content = serde_json::to_string_pretty(state).map_err(|source| IngestionError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, content).map_err(io_error)
}

/// Instant of an intraday sample recorded at `time` (`HH:MM:SS`) on `date`, in UTC.
pub fn sample_timestamp(date: NaiveDate, time: &str) -> Result<DateTime<Utc>, IngestionError> {
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S")
        .map_err(|_| IngestionError::InvalidRecord(format!("bad sample time '{}'", time)))?;
    Ok(date.and_time(time).and_utc())
}

fn heart_rate_day(recorded: &RecordedDay) -> Result<&HeartRateDay, IngestionError> {
    let day = recorded
        .heart_rate_day
        .first()
        .ok_or_else(|| IngestionError::InvalidRecord("empty heart_rate_day".into()))?;
    if day.activities_heart.is_empty() {
        return Err(IngestionError::InvalidRecord("empty activities-heart".into()));
    }
    Ok(day)
}

pub struct DataIngestion {
    pool: PgPool,
    settings: IngestionSettings,
    metrics: Arc<dyn MetricsReporter>,
}

impl DataIngestion {
    pub fn new(pool: PgPool, settings: IngestionSettings, metrics: Arc<dyn MetricsReporter>) -> Self {
        Self {
            pool,
            settings,
            metrics,
        }
    }

    fn export_path(&self) -> PathBuf {
        self.settings.data_dir.join(HEART_RATE_EXPORT)
    }

    fn load_days(&self) -> Result<Vec<RecordedDay>, IngestionError> {
        load_recorded_days(&self.export_path()).map_err(|e| {
            self.metrics.ingestion_error(e.error_type());
            e
        })
    }

    fn simulation_date(&self, day: u32) -> NaiveDate {
        self.settings.simulation_start + Duration::days(i64::from(day))
    }

    pub fn status(&self) -> Result<SimulationStatus, IngestionError> {
        let current_day = read_state(&self.settings.state_file).simulation_day;
        let total_days = self.load_days()?.len() as u32;
        Ok(SimulationStatus {
            current_day,
            total_days,
            current_date: self.simulation_date(current_day),
            progress: format!("{}/{} days processed", current_day, total_days),
        })
    }

    pub fn reset(&self) -> Result<(), IngestionError> {
        match std::fs::remove_file(&self.settings.state_file) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(IngestionError::Io {
                    path: self.settings.state_file.clone(),
                    source,
                })
            }
        }
        tracing::info!(
            "Simulation reset to start from {}",
            self.settings.simulation_start
        );
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), IngestionError> {
        let result = sqlx::query("SELECT 1").execute(&self.pool).await;
        self.report_connections();
        result.map_err(|e| {
            self.metrics.ingestion_error("health_check");
            IngestionError::from(e)
        })?;
        Ok(())
    }

    fn report_connections(&self) {
        let active = (self.pool.size() as usize).saturating_sub(self.pool.num_idle());
        self.metrics.database_connections(active);
    }

    /// Replay up to `days` recorded days, stopping early once the export is
    /// exhausted. Each day is committed on its own.
    #[tracing::instrument(name = "Ingest recorded days", skip(self))]
    pub async fn ingest(&self, days: u32) -> Result<Vec<DayReport>, IngestionError> {
        let recorded_days = self.load_days()?;
        let mut reports = Vec::new();

        for _ in 0..days {
            let current_day = read_state(&self.settings.state_file).simulation_day;
            let Some(recorded) = recorded_days.get(current_day as usize) else {
                tracing::info!(
                    "Simulation complete! All {} days of data have been processed.",
                    recorded_days.len()
                );
                break;
            };

            let started = Instant::now();
            let date = self.simulation_date(current_day);
            tracing::info!("Processing simulation day {}: {}", current_day + 1, date);

            let result = self.ingest_day(date, recorded).await;
            self.metrics.ingestion_duration(started.elapsed().as_secs_f64());
            self.report_connections();

            match result {
                Ok(report) => {
                    write_state(
                        &self.settings.state_file,
                        &SimulationState {
                            simulation_day: current_day + 1,
                            last_run: Some(Utc::now()),
                            simulation_date: Some(date),
                        },
                    )?;
                    self.metrics.ingestion_run("success");
                    tracing::info!(
                        data_points = report.data_points,
                        zones = report.zones,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Ingestion completed successfully for {}",
                        date
                    );
                    reports.push(report);
                }
                Err(e) => {
                    self.metrics.ingestion_error(e.error_type());
                    self.metrics.ingestion_run("error");
                    tracing::error!("Error during ingestion of {}: {}", date, e);
                    return Err(e);
                }
            }
        }

        Ok(reports)
    }

    async fn ingest_day(&self, date: NaiveDate, recorded: &RecordedDay) -> Result<DayReport, IngestionError> {
        let day = heart_rate_day(recorded)?;
        let summary = &day.activities_heart[0].value;
        let participant_id = self.settings.participant_id;

        // Rolled back on drop if any statement fails
        let mut tx = self.pool.begin().await?;
        self.report_connections();

        upsert_daily_summary(
            &mut tx,
            participant_id,
            date,
            summary.resting_heart_rate,
            day.intraday.dataset_interval,
            &day.intraday.dataset_type,
        )
        .await?;

        for zone in &summary.heart_rate_zones {
            upsert_heart_rate_zone(&mut tx, participant_id, date, zone).await?;
        }

        for sample in &day.intraday.dataset {
            let timestamp = sample_timestamp(date, &sample.time)?;
            upsert_raw_point(&mut tx, participant_id, timestamp, sample.value).await?;
        }

        tx.commit().await?;

        self.metrics.records_processed("daily_summary", 1);
        self.metrics
            .records_processed("heart_rate_zone", summary.heart_rate_zones.len() as u64);
        self.metrics
            .records_processed("raw_data", day.intraday.dataset.len() as u64);
        self.metrics
            .data_points_processed(day.intraday.dataset.len() as u64);

        Ok(DayReport {
            date,
            zones: summary.heart_rate_zones.len(),
            data_points: day.intraday.dataset.len(),
        })
    }
}
