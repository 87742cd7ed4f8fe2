//! Broker state: partition logs, consumer offsets and their snapshot files.

mod log_store;
mod offset_table;
mod snapshot;

pub use log_store::PartitionLogStore;
pub use offset_table::{ConsumerOffsetTable, OffsetEntry};
pub use snapshot::SnapshotFile;
