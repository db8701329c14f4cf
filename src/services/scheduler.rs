use std::error::Error;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::services::ingestion::DataIngestion;

/// Runs one simulated day of ingestion on a cron schedule.
pub struct IngestionScheduler {
    scheduler: Arc<Mutex<JobScheduler>>,
    ingestion: Arc<DataIngestion>,
}

impl IngestionScheduler {
    pub async fn new(ingestion: Arc<DataIngestion>) -> Result<Self, JobSchedulerError> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
            ingestion,
        })
    }

    pub async fn schedule_daily(&self, cron_expr: &str) -> Result<(), JobSchedulerError> {
        let scheduler = self.scheduler.lock().await;
        let ingestion = self.ingestion.clone();

        let job = Job::new_async(cron_expr, move |_uuid, _l| {
            let ingestion = ingestion.clone();

            Box::pin(async move {
                tracing::info!("📅 Running scheduled ingestion");
                match ingestion.ingest(1).await {
                    Ok(reports) if reports.is_empty() => {
                        tracing::info!("✅ Nothing left to ingest, simulation complete");
                    }
                    Ok(reports) => {
                        for report in reports {
                            tracing::info!(
                                "✅ Ingested {} data points for {}",
                                report.data_points,
                                report.date
                            );
                        }
                    }
                    Err(e) => {
                        tracing::error!("❌ Scheduled ingestion failed: {}", e);
                    }
                }
            })
        })?;

        scheduler.add(job).await?;
        tracing::info!("✅ Scheduled daily ingestion ({})", cron_expr);

        Ok(())
    }

    pub async fn start(&self) -> Result<(), Box<dyn Error>> {
        let scheduler = self.scheduler.lock().await;
        scheduler.start().await?;

        tracing::info!("✅ Ingestion scheduler started");
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), Box<dyn Error>> {
        let mut scheduler = self.scheduler.lock().await;
        scheduler.shutdown().await?;

        tracing::info!("🛑 Ingestion scheduler stopped");
        Ok(())
    }
}
