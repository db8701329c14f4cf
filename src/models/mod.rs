pub mod granularity;
pub mod ingestion;
pub mod metric_point;
pub mod participant;
pub mod summary;
