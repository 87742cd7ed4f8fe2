//! Fetch request handling.
//!
//! Each requested partition returns the log tail starting at `fetch_offset`
//! as a single record batch whose base offset is `fetch_offset`. The tail is
//! capped by the partition's `partition_max_bytes` and by what is left of the
//! request-level `max_bytes`, counting payload bytes. A partition with
//! records available always returns at least one, even when it alone exceeds
//! the cap.

use bytes::Bytes;
use tracing::{debug, error};

use crate::error::KafkaCode;
use crate::protocol::{Compression, RecordBatch};
use crate::server::RequestContext;
use crate::server::request::FetchRequestData;
use crate::server::response::{FetchPartitionResponse, FetchResponseData, FetchTopicResponse};
use crate::storage::PartitionLogStore;

use super::Broker;

/// Non-positive limits mean "no limit".
fn byte_limit(limit: i32) -> usize {
    if limit > 0 { limit as usize } else { usize::MAX }
}

/// Clone payloads from `from_offset` while they fit in `budget`.
fn collect_tail(
    logs: &PartitionLogStore,
    topic: &str,
    partition: i32,
    from_offset: i64,
    budget: usize,
) -> Vec<String> {
    let mut used = 0usize;
    let mut payloads = Vec::new();
    for payload in logs.read(topic, partition, from_offset) {
        if !payloads.is_empty() && used.saturating_add(payload.len()) > budget {
            break;
        }
        used = used.saturating_add(payload.len());
        payloads.push(payload.to_string());
    }
    payloads
}

fn encode_tail(
    fetch_offset: i64,
    payloads: &[String],
    codec: Compression,
) -> Result<Bytes, KafkaCode> {
    let compression = if payloads.len() > 1 {
        codec
    } else {
        Compression::None
    };
    RecordBatch::encode(fetch_offset, payloads, compression).map_err(|e| {
        error!(error = %e, codec = %compression, "Failed to encode fetch batch");
        KafkaCode::Unknown
    })
}

/// Handle a fetch request.
pub(super) async fn handle_fetch(
    broker: &Broker,
    ctx: &RequestContext,
    request: FetchRequestData,
) -> FetchResponseData {
    let codec = broker.config.fetch_compression;
    let mut remaining = byte_limit(request.max_bytes);

    let mut responses = Vec::with_capacity(request.topics.len());
    for topic in request.topics {
        let mut partitions = Vec::with_capacity(topic.partitions.len());
        for p in topic.partitions {
            let index = p.partition_index;

            let (high_watermark, payloads) = {
                let logs = broker.logs.lock().await;
                let high_watermark = logs.high_watermark(&topic.name, index);
                if p.fetch_offset < 0 || p.fetch_offset > high_watermark {
                    debug!(
                        topic = %topic.name,
                        partition = index,
                        fetch_offset = p.fetch_offset,
                        high_watermark,
                        "Fetch offset out of range"
                    );
                    partitions.push(FetchPartitionResponse::error(
                        index,
                        KafkaCode::OffsetOutOfRange,
                        high_watermark,
                    ));
                    continue;
                }
                let budget = byte_limit(p.partition_max_bytes).min(remaining);
                let payloads = collect_tail(&logs, &topic.name, index, p.fetch_offset, budget);
                (high_watermark, payloads)
            };

            let used: usize = payloads.iter().map(String::len).sum();
            remaining = remaining.saturating_sub(used);

            let response = match encode_tail(p.fetch_offset, &payloads, codec) {
                Ok(records) => FetchPartitionResponse::success(index, high_watermark, records),
                Err(code) => FetchPartitionResponse::error(index, code, high_watermark),
            };
            debug!(
                client = %ctx.client_addr,
                topic = %topic.name,
                partition = index,
                fetch_offset = p.fetch_offset,
                records = payloads.len(),
                high_watermark,
                "Fetched records"
            );
            partitions.push(response);
        }
        responses.push(FetchTopicResponse {
            name: topic.name,
            partitions,
        });
    }

    FetchResponseData {
        throttle_time_ms: 0,
        error_code: KafkaCode::None,
        session_id: request.session_id,
        responses,
    }
}
