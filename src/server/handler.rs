//! Handler trait for processing broker requests.
//!
//! Implement the `Handler` trait to provide the logic behind each supported
//! request kind. The connection layer parses frames, builds a
//! [`RequestContext`] and calls the matching method; the returned response
//! body is encoded and written back in request order.

use std::net::SocketAddr;

use async_trait::async_trait;

use crate::error::KafkaCode;

use super::request::*;
use super::response::*;
use super::versions;

/// Context for a request, containing connection information.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The client's address.
    pub client_addr: SocketAddr,
    /// The API version of the request.
    pub api_version: i16,
    /// Correlation id echoed in the response frame.
    pub correlation_id: i32,
    /// Unique request ID for correlation across logs.
    pub request_id: uuid::Uuid,
}

impl RequestContext {
    pub fn new(client_addr: SocketAddr, header: &RequestHeader) -> Self {
        Self {
            client_addr,
            api_version: header.api_version,
            correlation_id: header.correlation_id,
            request_id: uuid::Uuid::new_v4(),
        }
    }
}

/// Trait for handling broker protocol requests.
///
/// ApiVersions and unsupported requests have default answers that need no
/// state: the supported version table and `UNSUPPORTED_VERSION`. Every other
/// request kind must be implemented.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handle an ApiVersions request.
    async fn handle_api_versions(
        &self,
        _ctx: &RequestContext,
        _request: ApiVersionsRequestData,
    ) -> ApiVersionsResponseData {
        ApiVersionsResponseData {
            error_code: KafkaCode::None,
            api_keys: versions::default_api_versions(),
            throttle_time_ms: 0,
        }
    }

    async fn handle_metadata(
        &self,
        ctx: &RequestContext,
        request: MetadataRequestData,
    ) -> MetadataResponseData;

    async fn handle_produce(
        &self,
        ctx: &RequestContext,
        request: ProduceRequestData,
    ) -> ProduceResponseData;

    async fn handle_fetch(&self, ctx: &RequestContext, request: FetchRequestData)
    -> FetchResponseData;

    async fn handle_offset_commit(
        &self,
        ctx: &RequestContext,
        request: OffsetCommitRequestData,
    ) -> OffsetCommitResponseData;

    async fn handle_offset_fetch(
        &self,
        ctx: &RequestContext,
        request: OffsetFetchRequestData,
    ) -> OffsetFetchResponseData;

    /// Handle a request whose (api key, version) pair is not served.
    async fn handle_unsupported(
        &self,
        _ctx: &RequestContext,
        _api_key: ApiKey,
    ) -> UnsupportedResponseData {
        UnsupportedResponseData::default()
    }
}
