//! Offset commit and offset fetch response encoding.
//!
//! Only the top level of each response ends in a tagged field section.

use bytes::BufMut;

use crate::encode::{ToByte, encode_compact_array, encode_empty_tagged_fields};
use crate::error::{KafkaCode, Result};

/// OffsetCommit response data.
#[derive(Debug, Clone, Default)]
pub struct OffsetCommitResponseData {
    pub throttle_time_ms: i32,
    pub topics: Vec<OffsetCommitTopicResponse>,
}

#[derive(Debug, Clone)]
pub struct OffsetCommitTopicResponse {
    pub name: String,
    pub partitions: Vec<OffsetCommitPartitionResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetCommitPartitionResponse {
    pub partition_index: i32,
    pub error_code: KafkaCode,
}

impl ToByte for OffsetCommitPartitionResponse {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.partition_index.encode(buffer)?;
        i16::from(self.error_code).encode(buffer)
    }
}

impl ToByte for OffsetCommitTopicResponse {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.name.encode(buffer)?;
        self.partitions.encode(buffer)
    }
}

impl ToByte for OffsetCommitResponseData {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.throttle_time_ms.encode(buffer)?;
        encode_compact_array(buffer, &self.topics, |buf, t| t.encode(buf))?;
        encode_empty_tagged_fields(buffer);
        Ok(())
    }
}

/// OffsetFetch response data.
#[derive(Debug, Clone, Default)]
pub struct OffsetFetchResponseData {
    pub throttle_time_ms: i32,
    pub topics: Vec<OffsetFetchTopicResponse>,
}

#[derive(Debug, Clone)]
pub struct OffsetFetchTopicResponse {
    pub name: String,
    pub partitions: Vec<OffsetFetchPartitionResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetFetchPartitionResponse {
    pub partition_index: i32,
    /// -1 when the group never committed this partition.
    pub committed_offset: i64,
    pub metadata: String,
    pub error_code: KafkaCode,
}

impl ToByte for OffsetFetchPartitionResponse {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.partition_index.encode(buffer)?;
        self.committed_offset.encode(buffer)?;
        self.metadata.encode(buffer)?;
        i16::from(self.error_code).encode(buffer)
    }
}

impl ToByte for OffsetFetchTopicResponse {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.name.encode(buffer)?;
        self.partitions.encode(buffer)
    }
}

impl ToByte for OffsetFetchResponseData {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.throttle_time_ms.encode(buffer)?;
        encode_compact_array(buffer, &self.topics, |buf, t| t.encode(buf))?;
        encode_empty_tagged_fields(buffer);
        Ok(())
    }
}
