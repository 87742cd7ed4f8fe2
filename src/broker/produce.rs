//! Produce request handling.
//!
//! Record sets are decoded before the log lock is taken. A partition whose
//! record set fails to decode appends nothing and reports `CORRUPT_MESSAGE`;
//! the other partitions of the same request are unaffected. Every accepted
//! partition is appended and the log snapshot is written once, before the lock
//! is released.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{KafkaCode, Result};
use crate::protocol::RecordBatch;
use crate::server::RequestContext;
use crate::server::request::ProduceRequestData;
use crate::server::response::{
    ProducePartitionResponse, ProduceResponseData, ProduceTopicResponse,
};

use super::Broker;

/// Outcome of validating one partition of a produce request.
enum PartitionWrite {
    Rejected(KafkaCode),
    Append(Vec<String>),
}

fn decode_payloads(records: &Bytes) -> Result<Vec<String>> {
    let batches = RecordBatch::decode_all(records)?;
    Ok(batches
        .iter()
        .flat_map(|batch| batch.payloads.iter())
        .map(|payload| String::from_utf8_lossy(payload).into_owned())
        .collect())
}

fn validate(topic: &str, partition: i32, records: Option<&Bytes>) -> PartitionWrite {
    if topic.is_empty() {
        return PartitionWrite::Rejected(KafkaCode::InvalidTopic);
    }
    if partition < 0 {
        return PartitionWrite::Rejected(KafkaCode::UnknownTopicOrPartition);
    }
    match records {
        None => PartitionWrite::Append(Vec::new()),
        Some(records) => match decode_payloads(records) {
            Ok(payloads) => PartitionWrite::Append(payloads),
            Err(e) => {
                warn!(topic, partition, error = %e, "Rejecting undecodable record set");
                PartitionWrite::Rejected(KafkaCode::CorruptMessage)
            }
        },
    }
}

/// Handle a produce request.
pub(super) async fn handle_produce(
    broker: &Broker,
    ctx: &RequestContext,
    request: ProduceRequestData,
) -> ProduceResponseData {
    debug!(
        client = %ctx.client_addr,
        topic_count = request.topics.len(),
        acks = request.acks,
        "Produce request received"
    );

    let writes: Vec<(String, Vec<(i32, PartitionWrite)>)> = request
        .topics
        .into_iter()
        .map(|topic| {
            let partitions = topic
                .partitions
                .iter()
                .map(|p| {
                    let write = validate(&topic.name, p.partition_index, p.records.as_ref());
                    (p.partition_index, write)
                })
                .collect();
            (topic.name, partitions)
        })
        .collect();

    let mut logs = broker.logs.lock().await;
    let mut appended = 0usize;

    let responses = writes
        .into_iter()
        .map(|(name, partitions)| {
            let partitions = partitions
                .into_iter()
                .map(|(index, write)| match write {
                    PartitionWrite::Rejected(code) => ProducePartitionResponse::error(index, code),
                    PartitionWrite::Append(payloads) => {
                        let count = payloads.len();
                        let base_offset = logs.append_all(&name, index, payloads);
                        appended += count;
                        debug!(
                            topic = %name,
                            partition = index,
                            base_offset,
                            records = count,
                            "Appended records"
                        );
                        ProducePartitionResponse::success(index, base_offset)
                    }
                })
                .collect();
            ProduceTopicResponse { name, partitions }
        })
        .collect();

    if appended > 0 {
        broker.persist_logs(&logs).await;
    }
    drop(logs);

    ProduceResponseData {
        responses,
        throttle_time_ms: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::test_support::*;
    use crate::protocol::Compression;
    use crate::server::request::{ApiKey, ProducePartitionData, ProduceTopicData};
    use crate::storage::PartitionLogStore;

    fn produce(topic: &str, partition: i32, records: Option<Bytes>) -> ProduceRequestData {
        ProduceRequestData {
            transactional_id: String::new(),
            acks: 1,
            timeout_ms: 1000,
            topics: vec![ProduceTopicData {
                name: topic.to_string(),
                partitions: vec![ProducePartitionData {
                    partition_index: partition,
                    records,
                }],
            }],
        }
    }

    fn batch(payloads: &[&str]) -> Bytes {
        RecordBatch::encode(0, payloads, Compression::None).unwrap()
    }

    #[tokio::test]
    async fn test_first_produce_gets_offset_zero() {
        let dir = tempfile::tempdir().unwrap();
        let broker = broker_in(dir.path()).await;
        let ctx = ctx(ApiKey::Produce, 9);

        let response =
            handle_produce(&broker, &ctx, produce("t", 0, Some(batch(&["a", "b"])))).await;
        let partition = &response.responses[0].partitions[0];
        assert_eq!(partition.error_code, KafkaCode::None);
        assert_eq!(partition.base_offset, 0);

        let response = handle_produce(&broker, &ctx, produce("t", 0, Some(batch(&["c"])))).await;
        assert_eq!(response.responses[0].partitions[0].base_offset, 2);
        assert_eq!(broker.logs.lock().await.high_watermark("t", 0), 3);
    }

    #[tokio::test]
    async fn test_produce_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let broker = broker_in(dir.path()).await;

        handle_produce(
            &broker,
            &ctx(ApiKey::Produce, 9),
            produce("t", 1, Some(batch(&["x"]))),
        )
        .await;

        let snapshot: PartitionLogStore = broker.logs_file.load().await.unwrap().unwrap();
        assert_eq!(snapshot.high_watermark("t", 1), 1);
    }

    #[tokio::test]
    async fn test_empty_record_set_reports_high_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let broker = broker_in(dir.path()).await;
        broker.logs.lock().await.append("t", 0, "old".to_string());

        let response =
            handle_produce(&broker, &ctx(ApiKey::Produce, 9), produce("t", 0, None)).await;
        let partition = &response.responses[0].partitions[0];
        assert_eq!(partition.error_code, KafkaCode::None);
        assert_eq!(partition.base_offset, 1);

        let response = handle_produce(
            &broker,
            &ctx(ApiKey::Produce, 9),
            produce("fresh", 0, Some(Bytes::new())),
        )
        .await;
        assert_eq!(response.responses[0].partitions[0].base_offset, 0);
        assert!(!broker.logs.lock().await.contains_topic("fresh"));
    }

    #[tokio::test]
    async fn test_invalid_topic_and_partition() {
        let dir = tempfile::tempdir().unwrap();
        let broker = broker_in(dir.path()).await;
        let ctx = ctx(ApiKey::Produce, 9);

        let response = handle_produce(&broker, &ctx, produce("", 0, Some(batch(&["a"])))).await;
        assert_eq!(
            response.responses[0].partitions[0].error_code,
            KafkaCode::InvalidTopic
        );

        let response = handle_produce(&broker, &ctx, produce("t", -1, Some(batch(&["a"])))).await;
        assert_eq!(
            response.responses[0].partitions[0].error_code,
            KafkaCode::UnknownTopicOrPartition
        );
        assert_eq!(broker.logs.lock().await.topics().count(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_batch_appends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let broker = broker_in(dir.path()).await;

        let mut records = batch(&["a", "b"]).to_vec();
        let last = records.len() - 1;
        records[last] ^= 0xFF;

        let response = handle_produce(
            &broker,
            &ctx(ApiKey::Produce, 9),
            produce("t", 0, Some(Bytes::from(records))),
        )
        .await;
        assert_eq!(
            response.responses[0].partitions[0].error_code,
            KafkaCode::CorruptMessage
        );
        assert_eq!(broker.logs.lock().await.high_watermark("t", 0), 0);
    }

    #[tokio::test]
    async fn test_oversized_decompression_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let broker = broker_in(dir.path()).await;

        // Inflate the lz4 size prefix past the cap and re-seal the batch
        let mut records = RecordBatch::encode(0, &["a"], Compression::Lz4)
            .unwrap()
            .to_vec();
        records[61..65].copy_from_slice(&u32::MAX.to_le_bytes());
        let crc = crate::protocol::crc32c(&records[21..]);
        records[17..21].copy_from_slice(&crc.to_be_bytes());

        let response = handle_produce(
            &broker,
            &ctx(ApiKey::Produce, 9),
            produce("t", 0, Some(Bytes::from(records))),
        )
        .await;
        assert_eq!(
            response.responses[0].partitions[0].error_code,
            KafkaCode::CorruptMessage
        );
        assert_eq!(broker.logs.lock().await.high_watermark("t", 0), 0);
    }

    #[tokio::test]
    async fn test_concatenated_batches_append_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let broker = broker_in(dir.path()).await;

        let mut records = batch(&["1", "2"]).to_vec();
        records.extend_from_slice(&RecordBatch::encode(2, &["3"], Compression::Gzip).unwrap());

        handle_produce(
            &broker,
            &ctx(ApiKey::Produce, 9),
            produce("t", 0, Some(Bytes::from(records))),
        )
        .await;

        let logs = broker.logs.lock().await;
        let stored: Vec<_> = logs.read("t", 0, 0).collect();
        assert_eq!(stored, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let payload: &[u8] = b"f\xFFo";
        let records = RecordBatch::encode(0, &[payload], Compression::None).unwrap();
        let payloads = decode_payloads(&records).unwrap();
        assert_eq!(payloads, vec!["f\u{FFFD}o".to_string()]);
    }
}
