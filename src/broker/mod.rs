//! Single-node broker implementing the [`Handler`] trait.
//!
//! The broker owns both stores and their snapshot files. Request handling is
//! split into submodules by request kind:
//! - `metadata` - Metadata request handling
//! - `produce` - Produce request handling
//! - `fetch` - Fetch request handling
//! - `offsets` - Offset commit and fetch
//!
//! Each store sits behind its own mutex. A mutating request keeps the lock
//! until the snapshot capturing its change has been written, so snapshots land
//! on disk in mutation order.

mod fetch;
mod metadata;
mod offsets;
mod produce;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::BrokerConfig;
use crate::error::Result;
use crate::server::request::*;
use crate::server::response::*;
use crate::server::{Handler, RequestContext};
use crate::storage::{ConsumerOffsetTable, PartitionLogStore, SnapshotFile};

pub struct Broker {
    config: BrokerConfig,
    logs: Mutex<PartitionLogStore>,
    offsets: Mutex<ConsumerOffsetTable>,
    logs_file: SnapshotFile,
    offsets_file: SnapshotFile,
}

impl Broker {
    /// Create a broker, restoring both stores from the configured data path.
    ///
    /// Missing or unreadable snapshots start the corresponding store empty.
    pub async fn open(config: BrokerConfig) -> Self {
        let logs_file = SnapshotFile::new(config.partition_logs_path());
        let offsets_file = SnapshotFile::new(config.consumer_offsets_path());

        let logs: PartitionLogStore = logs_file.load_or_default().await;
        let offsets: ConsumerOffsetTable = offsets_file.load_or_default().await;

        info!(
            broker_id = config.broker_id,
            data_path = %config.data_path.display(),
            topics = logs.topics().count(),
            "Broker state restored"
        );

        Self {
            config,
            logs: Mutex::new(logs),
            offsets: Mutex::new(offsets),
            logs_file,
            offsets_file,
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Write both snapshots. Called once more at shutdown.
    pub async fn flush(&self) -> Result<()> {
        let logs = self.logs.lock().await;
        let logs_result = self.logs_file.save(&*logs).await;
        drop(logs);

        let offsets = self.offsets.lock().await;
        let offsets_result = self.offsets_file.save(&*offsets).await;
        drop(offsets);

        logs_result?;
        offsets_result?;
        info!("Broker state flushed");
        Ok(())
    }

    /// Snapshot the partition logs; failures are logged and serving continues.
    async fn persist_logs(&self, logs: &PartitionLogStore) {
        if let Err(e) = self.logs_file.save(logs).await {
            error!(
                path = %self.logs_file.path().display(),
                error = %e,
                "Failed to write partition log snapshot"
            );
        }
    }

    /// Snapshot the consumer offsets; failures are logged and serving continues.
    async fn persist_offsets(&self, offsets: &ConsumerOffsetTable) {
        if let Err(e) = self.offsets_file.save(offsets).await {
            error!(
                path = %self.offsets_file.path().display(),
                error = %e,
                "Failed to write consumer offset snapshot"
            );
        }
    }
}

#[async_trait]
impl Handler for Broker {
    async fn handle_metadata(
        &self,
        ctx: &RequestContext,
        request: MetadataRequestData,
    ) -> MetadataResponseData {
        metadata::handle_metadata(self, ctx, request).await
    }

    async fn handle_produce(
        &self,
        ctx: &RequestContext,
        request: ProduceRequestData,
    ) -> ProduceResponseData {
        produce::handle_produce(self, ctx, request).await
    }

    async fn handle_fetch(
        &self,
        ctx: &RequestContext,
        request: FetchRequestData,
    ) -> FetchResponseData {
        fetch::handle_fetch(self, ctx, request).await
    }

    async fn handle_offset_commit(
        &self,
        ctx: &RequestContext,
        request: OffsetCommitRequestData,
    ) -> OffsetCommitResponseData {
        offsets::handle_offset_commit(self, ctx, request).await
    }

    async fn handle_offset_fetch(
        &self,
        ctx: &RequestContext,
        request: OffsetFetchRequestData,
    ) -> OffsetFetchResponseData {
        offsets::handle_offset_fetch(self, ctx, request).await
    }
}
