pub mod adherence;
pub mod aggregation_selector;
pub mod ingestion;
pub mod metrics;
pub mod range_query;
pub mod scheduler;

pub use ingestion::DataIngestion;
pub use metrics::{MetricsReporter, NoopMetrics, PrometheusMetrics};
pub use scheduler::IngestionScheduler;
