//! Offset commit and fetch.
//!
//! Commits are last-writer-wins per (group, topic, partition). Generation and
//! member ids are accepted and ignored.

use tracing::{debug, warn};

use crate::error::KafkaCode;
use crate::server::RequestContext;
use crate::server::request::{OffsetCommitRequestData, OffsetFetchRequestData};
use crate::server::response::{
    OffsetCommitPartitionResponse, OffsetCommitResponseData, OffsetCommitTopicResponse,
    OffsetFetchPartitionResponse, OffsetFetchResponseData, OffsetFetchTopicResponse,
};
use crate::storage::OffsetEntry;

use super::Broker;

/// Handle an OffsetCommit request.
///
/// An empty group id rejects every partition with `INVALID_GROUP_ID` and
/// stores nothing. Otherwise every entry is stored and the offsets snapshot
/// is written once.
pub(super) async fn handle_offset_commit(
    broker: &Broker,
    ctx: &RequestContext,
    request: OffsetCommitRequestData,
) -> OffsetCommitResponseData {
    let group_id = request.group_id;

    if group_id.is_empty() {
        warn!(client = %ctx.client_addr, "Offset commit with empty group id");
        return OffsetCommitResponseData {
            throttle_time_ms: 0,
            topics: request
                .topics
                .into_iter()
                .map(|topic| OffsetCommitTopicResponse {
                    name: topic.name,
                    partitions: topic
                        .partitions
                        .into_iter()
                        .map(|p| OffsetCommitPartitionResponse {
                            partition_index: p.partition_index,
                            error_code: KafkaCode::InvalidGroupId,
                        })
                        .collect(),
                })
                .collect(),
        };
    }

    let now = chrono::Utc::now().timestamp_millis();
    let mut offsets = broker.offsets.lock().await;

    let topics: Vec<_> = request
        .topics
        .into_iter()
        .map(|topic| {
            let partitions = topic
                .partitions
                .into_iter()
                .map(|p| {
                    let timestamp = if p.commit_timestamp == -1 {
                        now
                    } else {
                        p.commit_timestamp
                    };
                    debug!(
                        group = %group_id,
                        topic = %topic.name,
                        partition = p.partition_index,
                        offset = p.committed_offset,
                        "Committing offset"
                    );
                    offsets.commit(
                        &group_id,
                        &topic.name,
                        p.partition_index,
                        OffsetEntry::new(p.committed_offset, p.committed_metadata, timestamp),
                    );
                    OffsetCommitPartitionResponse {
                        partition_index: p.partition_index,
                        error_code: KafkaCode::None,
                    }
                })
                .collect();
            OffsetCommitTopicResponse {
                name: topic.name,
                partitions,
            }
        })
        .collect();

    broker.persist_offsets(&offsets).await;
    drop(offsets);

    OffsetCommitResponseData {
        throttle_time_ms: 0,
        topics,
    }
}

/// Handle an OffsetFetch request. Never-committed partitions report -1.
///
/// Metadata is always reported empty: it is not part of the offsets snapshot,
/// so answering with it would change the reply across a restart.
pub(super) async fn handle_offset_fetch(
    broker: &Broker,
    ctx: &RequestContext,
    request: OffsetFetchRequestData,
) -> OffsetFetchResponseData {
    debug!(
        client = %ctx.client_addr,
        group = %request.group_id,
        topic_count = request.topics.len(),
        "Offset fetch request"
    );

    let offsets = broker.offsets.lock().await;
    let group_id = request.group_id;

    let topics = request
        .topics
        .into_iter()
        .map(|topic| {
            let partitions = topic
                .partition_indexes
                .iter()
                .map(|&partition_index| {
                    match offsets.fetch(&group_id, &topic.name, partition_index) {
                        Some(entry) => OffsetFetchPartitionResponse {
                            partition_index,
                            committed_offset: entry.offset,
                            metadata: String::new(),
                            error_code: KafkaCode::None,
                        },
                        None => OffsetFetchPartitionResponse {
                            partition_index,
                            committed_offset: -1,
                            metadata: String::new(),
                            error_code: KafkaCode::None,
                        },
                    }
                })
                .collect();
            OffsetFetchTopicResponse {
                name: topic.name,
                partitions,
            }
        })
        .collect();

    OffsetFetchResponseData {
        throttle_time_ms: 0,
        topics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::test_support::*;
    use crate::server::request::{
        ApiKey, OffsetCommitPartitionData, OffsetCommitTopicData, OffsetFetchTopicData,
    };
    use crate::storage::ConsumerOffsetTable;

    fn commit(group: &str, partition: i32, offset: i64, timestamp: i64) -> OffsetCommitRequestData {
        OffsetCommitRequestData {
            group_id: group.to_string(),
            generation_id: -1,
            member_id: String::new(),
            group_instance_id: String::new(),
            topics: vec![OffsetCommitTopicData {
                name: "t".to_string(),
                partitions: vec![OffsetCommitPartitionData {
                    partition_index: partition,
                    committed_offset: offset,
                    committed_metadata: "meta".to_string(),
                    commit_timestamp: timestamp,
                }],
            }],
        }
    }

    fn fetch(group: &str, partitions: Vec<i32>) -> OffsetFetchRequestData {
        OffsetFetchRequestData {
            group_id: group.to_string(),
            topics: vec![OffsetFetchTopicData {
                name: "t".to_string(),
                partition_indexes: partitions,
            }],
        }
    }

    #[tokio::test]
    async fn test_commit_then_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let broker = broker_in(dir.path()).await;

        let response = handle_offset_commit(
            &broker,
            &ctx(ApiKey::OffsetCommit, 1),
            commit("g", 0, 42, 1_700_000_000_000),
        )
        .await;
        assert_eq!(
            response.topics[0].partitions[0].error_code,
            KafkaCode::None
        );

        let response =
            handle_offset_fetch(&broker, &ctx(ApiKey::OffsetFetch, 1), fetch("g", vec![0, 1]))
                .await;
        let partitions = &response.topics[0].partitions;
        assert_eq!(partitions[0].committed_offset, 42);
        assert_eq!(partitions[0].metadata, "");
        assert_eq!(partitions[1].committed_offset, -1);
        assert_eq!(partitions[1].metadata, "");
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let broker = broker_in(dir.path()).await;
        let ctx = ctx(ApiKey::OffsetCommit, 1);

        handle_offset_commit(&broker, &ctx, commit("g", 0, 10, -1)).await;
        handle_offset_commit(&broker, &ctx, commit("g", 0, 5, -1)).await;

        let offsets = broker.offsets.lock().await;
        let entry = offsets.fetch("g", "t", 0).unwrap();
        assert_eq!(entry.offset, 5);
        assert!(entry.commit_timestamp > 0);
    }

    #[tokio::test]
    async fn test_groups_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let broker = broker_in(dir.path()).await;

        handle_offset_commit(&broker, &ctx(ApiKey::OffsetCommit, 1), commit("g1", 0, 7, -1))
            .await;

        let response =
            handle_offset_fetch(&broker, &ctx(ApiKey::OffsetFetch, 1), fetch("g2", vec![0])).await;
        assert_eq!(response.topics[0].partitions[0].committed_offset, -1);
    }

    #[tokio::test]
    async fn test_empty_group_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let broker = broker_in(dir.path()).await;

        let response =
            handle_offset_commit(&broker, &ctx(ApiKey::OffsetCommit, 1), commit("", 0, 7, -1))
                .await;
        assert_eq!(
            response.topics[0].partitions[0].error_code,
            KafkaCode::InvalidGroupId
        );
        assert!(broker.offsets.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_is_identical_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let broker = broker_in(dir.path()).await;
        handle_offset_commit(&broker, &ctx(ApiKey::OffsetCommit, 1), commit("g", 0, 5, -1)).await;

        let before =
            handle_offset_fetch(&broker, &ctx(ApiKey::OffsetFetch, 1), fetch("g", vec![0, 1]))
                .await;
        drop(broker);

        let reopened = broker_in(dir.path()).await;
        let after =
            handle_offset_fetch(&reopened, &ctx(ApiKey::OffsetFetch, 1), fetch("g", vec![0, 1]))
                .await;
        assert_eq!(before.topics[0].partitions, after.topics[0].partitions);
        assert_eq!(after.topics[0].partitions[0].committed_offset, 5);
    }

    #[tokio::test]
    async fn test_commit_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let broker = broker_in(dir.path()).await;

        handle_offset_commit(&broker, &ctx(ApiKey::OffsetCommit, 1), commit("g", 3, 9, -1)).await;

        let snapshot: ConsumerOffsetTable = broker.offsets_file.load().await.unwrap().unwrap();
        assert_eq!(snapshot.fetch("g", "t", 3).map(|e| e.offset), Some(9));
    }
}
