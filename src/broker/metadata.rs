//! Metadata request handling.

use tracing::debug;

use crate::server::RequestContext;
use crate::server::request::MetadataRequestData;
use crate::server::response::{BrokerData, MetadataResponseData, TopicMetadata};

use super::Broker;

/// Describe this broker and the requested topics.
///
/// An empty topic list asks for every topic in the log store. Requested
/// topics that were never produced to come back with
/// `UNKNOWN_TOPIC_OR_PARTITION` and no partitions.
pub(super) async fn handle_metadata(
    broker: &Broker,
    ctx: &RequestContext,
    request: MetadataRequestData,
) -> MetadataResponseData {
    let broker_id = broker.config.broker_id;

    let topics = {
        let logs = broker.logs.lock().await;
        let describe = |name: &str| match logs.partitions(name) {
            Some(partitions) => TopicMetadata::led_by(name, &partitions, broker_id),
            None => TopicMetadata::unknown(name),
        };

        if request.topics.is_empty() {
            logs.topics().map(describe).collect::<Vec<_>>()
        } else {
            request.topics.iter().map(|t| describe(t)).collect()
        }
    };

    debug!(
        client = %ctx.client_addr,
        requested = request.topics.len(),
        returned = topics.len(),
        "Metadata request"
    );

    MetadataResponseData {
        throttle_time_ms: 0,
        brokers: vec![BrokerData {
            node_id: broker_id,
            host: broker.config.advertised_host.clone(),
            port: i32::from(broker.config.port),
            rack: None,
        }],
        cluster_id: None,
        controller_id: broker_id,
        topics,
    }
}
