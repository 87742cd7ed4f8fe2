//! API versions response encoding.

use bytes::BufMut;

use crate::encode::{ToByte, encode_compact_array, encode_empty_tagged_fields};
use crate::error::{KafkaCode, Result};

use super::super::request::ApiKey;

/// ApiVersions response data.
#[derive(Debug, Clone)]
pub struct ApiVersionsResponseData {
    pub error_code: KafkaCode,
    pub api_keys: Vec<ApiVersionData>,
    pub throttle_time_ms: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiVersionData {
    pub api_key: ApiKey,
    pub min_version: i16,
    pub max_version: i16,
}

impl ToByte for ApiVersionData {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        i16::from(self.api_key).encode(buffer)?;
        self.min_version.encode(buffer)?;
        self.max_version.encode(buffer)?;
        encode_empty_tagged_fields(buffer);
        Ok(())
    }
}

impl ToByte for ApiVersionsResponseData {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        i16::from(self.error_code).encode(buffer)?;
        encode_compact_array(buffer, &self.api_keys, |buf, item| item.encode(buf))?;
        self.throttle_time_ms.encode(buffer)?;
        encode_empty_tagged_fields(buffer);
        Ok(())
    }
}
