//! Produce response encoding.

use bytes::BufMut;

use crate::encode::{ToByte, encode_compact_array, encode_empty_tagged_fields};
use crate::error::{KafkaCode, Result};

/// Produce response data.
#[derive(Debug, Clone, Default)]
pub struct ProduceResponseData {
    pub responses: Vec<ProduceTopicResponse>,
    pub throttle_time_ms: i32,
}

#[derive(Debug, Clone)]
pub struct ProduceTopicResponse {
    pub name: String,
    pub partitions: Vec<ProducePartitionResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducePartitionResponse {
    pub partition_index: i32,
    pub error_code: KafkaCode,
    pub base_offset: i64,
    pub log_append_time: i64,
    pub log_start_offset: i64,
    pub error_message: Option<String>,
}

impl ProducePartitionResponse {
    pub fn success(partition_index: i32, base_offset: i64) -> Self {
        Self {
            partition_index,
            error_code: KafkaCode::None,
            base_offset,
            log_append_time: -1,
            log_start_offset: 0,
            error_message: None,
        }
    }

    pub fn error(partition_index: i32, error_code: KafkaCode) -> Self {
        Self {
            partition_index,
            error_code,
            base_offset: -1,
            log_append_time: -1,
            log_start_offset: 0,
            error_message: None,
        }
    }
}

impl ToByte for ProducePartitionResponse {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.partition_index.encode(buffer)?;
        i16::from(self.error_code).encode(buffer)?;
        self.base_offset.encode(buffer)?;
        self.log_append_time.encode(buffer)?;
        self.log_start_offset.encode(buffer)?;
        encode_compact_array::<i32, _, _>(buffer, &[], |buf, e| e.encode(buf))?; // record_errors
        self.error_message.encode(buffer)?;
        encode_empty_tagged_fields(buffer);
        Ok(())
    }
}

impl ToByte for ProduceTopicResponse {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.name.encode(buffer)?;
        encode_compact_array(buffer, &self.partitions, |buf, p| p.encode(buf))?;
        encode_empty_tagged_fields(buffer);
        Ok(())
    }
}

impl ToByte for ProduceResponseData {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        encode_compact_array(buffer, &self.responses, |buf, t| t.encode(buf))?;
        self.throttle_time_ms.encode(buffer)?;
        encode_empty_tagged_fields(buffer);
        Ok(())
    }
}
