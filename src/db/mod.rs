pub mod ingestion;
pub mod memory_store;
pub mod pg_store;
pub mod record_store;

pub use memory_store::InMemoryRecordStore;
pub use pg_store::PgRecordStore;
pub use record_store::{RangeScan, RecordStore};
