//! Fetch response encoding.

use bytes::{BufMut, Bytes};

use crate::encode::{ToByte, encode_compact_array, encode_empty_tagged_fields};
use crate::error::{KafkaCode, Result};

/// Fetch response data.
#[derive(Debug, Clone, Default)]
pub struct FetchResponseData {
    pub throttle_time_ms: i32,
    pub error_code: KafkaCode,
    pub session_id: i32,
    pub responses: Vec<FetchTopicResponse>,
}

#[derive(Debug, Clone)]
pub struct FetchTopicResponse {
    pub name: String,
    pub partitions: Vec<FetchPartitionResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPartitionResponse {
    pub partition_index: i32,
    pub error_code: KafkaCode,
    pub high_watermark: i64,
    pub last_stable_offset: i64,
    pub log_start_offset: i64,
    pub preferred_read_replica: i32,
    /// Encoded record batch; empty when nothing is returned.
    pub records: Bytes,
}

impl FetchPartitionResponse {
    pub fn success(partition_index: i32, high_watermark: i64, records: Bytes) -> Self {
        Self {
            partition_index,
            error_code: KafkaCode::None,
            high_watermark,
            last_stable_offset: high_watermark,
            log_start_offset: 0,
            preferred_read_replica: -1,
            records,
        }
    }

    pub fn error(partition_index: i32, error_code: KafkaCode, high_watermark: i64) -> Self {
        Self {
            error_code,
            ..Self::success(partition_index, high_watermark, Bytes::new())
        }
    }
}

impl ToByte for FetchPartitionResponse {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.partition_index.encode(buffer)?;
        i16::from(self.error_code).encode(buffer)?;
        self.high_watermark.encode(buffer)?;
        self.last_stable_offset.encode(buffer)?;
        self.log_start_offset.encode(buffer)?;
        encode_compact_array::<i32, _, _>(buffer, &[], |buf, a| a.encode(buf))?; // aborted
        self.preferred_read_replica.encode(buffer)?;
        self.records.encode(buffer)?;
        encode_empty_tagged_fields(buffer);
        Ok(())
    }
}

impl ToByte for FetchTopicResponse {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.name.encode(buffer)?;
        encode_compact_array(buffer, &self.partitions, |buf, p| p.encode(buf))?;
        encode_empty_tagged_fields(buffer);
        Ok(())
    }
}

impl ToByte for FetchResponseData {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.throttle_time_ms.encode(buffer)?;
        i16::from(self.error_code).encode(buffer)?;
        self.session_id.encode(buffer)?;
        encode_compact_array(buffer, &self.responses, |buf, t| t.encode(buf))?;
        encode_empty_tagged_fields(buffer);
        Ok(())
    }
}
