//! Metadata response encoding.

use bytes::BufMut;

use crate::constants::TOPIC_ID_SIZE;
use crate::encode::{ToByte, encode_compact_array, encode_empty_tagged_fields};
use crate::error::{KafkaCode, Result};

/// Metadata response data.
#[derive(Debug, Clone)]
pub struct MetadataResponseData {
    pub throttle_time_ms: i32,
    pub brokers: Vec<BrokerData>,
    pub cluster_id: Option<String>,
    pub controller_id: i32,
    pub topics: Vec<TopicMetadata>,
}

#[derive(Debug, Clone)]
pub struct BrokerData {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
    pub rack: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TopicMetadata {
    pub error_code: KafkaCode,
    pub name: String,
    pub topic_id: [u8; TOPIC_ID_SIZE],
    pub is_internal: bool,
    pub partitions: Vec<PartitionMetadata>,
}

impl TopicMetadata {
    /// A topic the broker has never seen.
    pub fn unknown(name: impl Into<String>) -> Self {
        Self {
            error_code: KafkaCode::UnknownTopicOrPartition,
            name: name.into(),
            topic_id: [0; TOPIC_ID_SIZE],
            is_internal: false,
            partitions: vec![],
        }
    }

    /// An existing topic whose partitions are all led by `leader_id`.
    pub fn led_by(name: impl Into<String>, partitions: &[i32], leader_id: i32) -> Self {
        Self {
            error_code: KafkaCode::None,
            name: name.into(),
            topic_id: [0; TOPIC_ID_SIZE],
            is_internal: false,
            partitions: partitions
                .iter()
                .map(|&partition_index| PartitionMetadata {
                    error_code: KafkaCode::None,
                    partition_index,
                    leader_id,
                    leader_epoch: -1,
                    replica_nodes: vec![leader_id],
                    isr_nodes: vec![leader_id],
                    offline_replicas: vec![],
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PartitionMetadata {
    pub error_code: KafkaCode,
    pub partition_index: i32,
    pub leader_id: i32,
    pub leader_epoch: i32,
    pub replica_nodes: Vec<i32>,
    pub isr_nodes: Vec<i32>,
    pub offline_replicas: Vec<i32>,
}

impl ToByte for BrokerData {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.node_id.encode(buffer)?;
        self.host.encode(buffer)?;
        self.port.encode(buffer)?;
        self.rack.encode(buffer)?;
        encode_empty_tagged_fields(buffer);
        Ok(())
    }
}

impl ToByte for PartitionMetadata {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        i16::from(self.error_code).encode(buffer)?;
        self.partition_index.encode(buffer)?;
        self.leader_id.encode(buffer)?;
        self.leader_epoch.encode(buffer)?;
        self.replica_nodes.encode(buffer)?;
        self.isr_nodes.encode(buffer)?;
        self.offline_replicas.encode(buffer)?;
        encode_empty_tagged_fields(buffer);
        Ok(())
    }
}

impl ToByte for TopicMetadata {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        i16::from(self.error_code).encode(buffer)?;
        self.name.encode(buffer)?;
        buffer.put_slice(&self.topic_id);
        self.is_internal.encode(buffer)?;
        encode_compact_array(buffer, &self.partitions, |buf, p| p.encode(buf))?;
        encode_empty_tagged_fields(buffer);
        Ok(())
    }
}

impl ToByte for MetadataResponseData {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.throttle_time_ms.encode(buffer)?;
        encode_compact_array(buffer, &self.brokers, |buf, b| b.encode(buf))?;
        self.cluster_id.encode(buffer)?;
        self.controller_id.encode(buffer)?;
        encode_compact_array(buffer, &self.topics, |buf, t| t.encode(buf))?;
        encode_empty_tagged_fields(buffer);
        Ok(())
    }
}
