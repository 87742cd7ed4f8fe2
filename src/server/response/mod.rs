//! Response encoding for outgoing protocol messages.

mod fetch;
mod metadata;
mod offsets;
mod produce;
mod versions;

use bytes::BufMut;

use crate::encode::{ToByte, encode_empty_tagged_fields};
use crate::error::{KafkaCode, Result};

pub use fetch::*;
pub use metadata::*;
pub use offsets::*;
pub use produce::*;
pub use versions::*;

/// Body sent for any (api key, version) pair the broker does not serve:
/// error code, an empty array, throttle time and a tagged field section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedResponseData {
    pub error_code: KafkaCode,
}

impl Default for UnsupportedResponseData {
    fn default() -> Self {
        Self {
            error_code: KafkaCode::UnsupportedVersion,
        }
    }
}

impl ToByte for UnsupportedResponseData {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        i16::from(self.error_code).encode(buffer)?;
        Vec::<i32>::new().encode(buffer)?;
        0i32.encode(buffer)?;
        encode_empty_tagged_fields(buffer);
        Ok(())
    }
}

/// Response wrapper that includes correlation ID and response body.
pub struct Response {
    pub correlation_id: i32,
    body: Vec<u8>,
}

impl Response {
    pub fn new<T: ToByte>(correlation_id: i32, body: &T) -> Result<Self> {
        let mut buf = Vec::new();
        body.encode(&mut buf)?;
        Ok(Self {
            correlation_id,
            body: buf,
        })
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Encode the response as a frame: `i32` size, correlation id, body.
    pub fn encode_with_size(&self) -> Result<Vec<u8>> {
        let total_size = (4 + self.body.len()) as i32;
        let mut result = Vec::with_capacity(4 + total_size as usize);
        total_size.encode(&mut result)?;
        self.correlation_id.encode(&mut result)?;
        result.extend_from_slice(&self.body);
        Ok(result)
    }
}
