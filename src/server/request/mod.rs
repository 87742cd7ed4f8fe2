//! Request parsing for incoming protocol messages.
//!
//! A frame body starts with an 8-byte header (`api_key`, `api_version`,
//! `correlation_id`) and the request body follows immediately.

mod fetch;
mod metadata;
mod offsets;
mod produce;
mod versions;

use bytes::Bytes;
use nom::{
    IResult,
    number::complete::{be_i16, be_i32},
};
use nombytes::NomBytes;

use crate::error::{Error, Result};

pub use fetch::*;
pub use metadata::*;
pub use offsets::*;
pub use produce::*;
pub use versions::*;

/// API keys known to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKey {
    Produce,
    Fetch,
    Metadata,
    OffsetCommit,
    OffsetFetch,
    ApiVersions,
    Unknown(i16),
}

impl From<i16> for ApiKey {
    fn from(value: i16) -> Self {
        match value {
            0 => ApiKey::Produce,
            1 => ApiKey::Fetch,
            3 => ApiKey::Metadata,
            8 => ApiKey::OffsetCommit,
            9 => ApiKey::OffsetFetch,
            18 => ApiKey::ApiVersions,
            n => ApiKey::Unknown(n),
        }
    }
}

impl From<ApiKey> for i16 {
    fn from(key: ApiKey) -> Self {
        match key {
            ApiKey::Produce => 0,
            ApiKey::Fetch => 1,
            ApiKey::Metadata => 3,
            ApiKey::OffsetCommit => 8,
            ApiKey::OffsetFetch => 9,
            ApiKey::ApiVersions => 18,
            ApiKey::Unknown(n) => n,
        }
    }
}

impl ApiKey {
    /// Returns a static string name for this API key.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiKey::Produce => "Produce",
            ApiKey::Fetch => "Fetch",
            ApiKey::Metadata => "Metadata",
            ApiKey::OffsetCommit => "OffsetCommit",
            ApiKey::OffsetFetch => "OffsetFetch",
            ApiKey::ApiVersions => "ApiVersions",
            ApiKey::Unknown(_) => "Unknown",
        }
    }
}

/// Parsed request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub api_key: ApiKey,
    pub api_version: i16,
    pub correlation_id: i32,
}

pub fn parse_request_header(s: NomBytes) -> IResult<NomBytes, RequestHeader> {
    let (s, api_key) = be_i16(s)?;
    let (s, api_version) = be_i16(s)?;
    let (s, correlation_id) = be_i32(s)?;

    Ok((
        s,
        RequestHeader {
            api_key: ApiKey::from(api_key),
            api_version,
            correlation_id,
        },
    ))
}

/// Parsed request with header and body.
#[derive(Debug)]
pub enum Request {
    ApiVersions(RequestHeader, ApiVersionsRequestData),
    Metadata(RequestHeader, MetadataRequestData),
    Produce(RequestHeader, ProduceRequestData),
    Fetch(RequestHeader, FetchRequestData),
    OffsetCommit(RequestHeader, OffsetCommitRequestData),
    OffsetFetch(RequestHeader, OffsetFetchRequestData),
    /// Any (api key, version) pair the broker does not serve. The body is kept
    /// unparsed.
    Unsupported(RequestHeader, Bytes),
}

impl Request {
    pub fn header(&self) -> &RequestHeader {
        match self {
            Request::ApiVersions(h, _) => h,
            Request::Metadata(h, _) => h,
            Request::Produce(h, _) => h,
            Request::Fetch(h, _) => h,
            Request::OffsetCommit(h, _) => h,
            Request::OffsetFetch(h, _) => h,
            Request::Unsupported(h, _) => h,
        }
    }

    /// Parse a request from a frame body.
    ///
    /// Unsupported (api key, version) pairs parse successfully as
    /// [`Request::Unsupported`]; a truncated header or a malformed body of a
    /// supported request is an error.
    pub fn parse(data: Bytes) -> Result<Self> {
        let input = NomBytes::new(data.clone());
        let (remaining, header) =
            parse_request_header(input).map_err(|_| Error::ParsingError(data.clone()))?;

        if !crate::server::versions::is_version_supported(header.api_key, header.api_version) {
            return Ok(Request::Unsupported(header, remaining.into_bytes()));
        }

        match header.api_key {
            ApiKey::ApiVersions => {
                let (_, body) = versions::parse_api_versions_request(remaining)
                    .map_err(|_| Error::ParsingError(data))?;
                Ok(Request::ApiVersions(header, body))
            }
            ApiKey::Metadata => {
                let (_, body) = metadata::parse_metadata_request(remaining)
                    .map_err(|_| Error::ParsingError(data))?;
                Ok(Request::Metadata(header, body))
            }
            ApiKey::Produce => {
                let (_, body) = produce::parse_produce_request(remaining)
                    .map_err(|_| Error::ParsingError(data))?;
                Ok(Request::Produce(header, body))
            }
            ApiKey::Fetch => {
                let (_, body) = fetch::parse_fetch_request(remaining)
                    .map_err(|_| Error::ParsingError(data))?;
                Ok(Request::Fetch(header, body))
            }
            ApiKey::OffsetCommit => {
                let (_, body) = offsets::parse_offset_commit_request(remaining)
                    .map_err(|_| Error::ParsingError(data))?;
                Ok(Request::OffsetCommit(header, body))
            }
            ApiKey::OffsetFetch => {
                let (_, body) = offsets::parse_offset_fetch_request(remaining)
                    .map_err(|_| Error::ParsingError(data))?;
                Ok(Request::OffsetFetch(header, body))
            }
            ApiKey::Unknown(_) => Ok(Request::Unsupported(header, remaining.into_bytes())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_header(api_key: i16, api_version: i16, correlation_id: i32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&api_key.to_be_bytes());
        data.extend_from_slice(&api_version.to_be_bytes());
        data.extend_from_slice(&correlation_id.to_be_bytes());
        data
    }

    fn push_compact_str(data: &mut Vec<u8>, s: &str) {
        data.push(s.len() as u8);
        data.extend_from_slice(s.as_bytes());
    }

    #[test]
    fn test_api_key_from_i16() {
        assert_eq!(ApiKey::from(0), ApiKey::Produce);
        assert_eq!(ApiKey::from(1), ApiKey::Fetch);
        assert_eq!(ApiKey::from(3), ApiKey::Metadata);
        assert_eq!(ApiKey::from(8), ApiKey::OffsetCommit);
        assert_eq!(ApiKey::from(9), ApiKey::OffsetFetch);
        assert_eq!(ApiKey::from(18), ApiKey::ApiVersions);
        assert_eq!(ApiKey::from(999), ApiKey::Unknown(999));
    }

    #[test]
    fn test_api_key_roundtrip() {
        for i in 0..=40 {
            assert_eq!(i16::from(ApiKey::from(i)), i);
        }
    }

    #[test]
    fn test_parse_request_header() {
        let data = build_header(18, 4, 12345);
        let (rest, header) = parse_request_header(NomBytes::new(Bytes::from(data))).unwrap();

        assert_eq!(header.api_key, ApiKey::ApiVersions);
        assert_eq!(header.api_version, 4);
        assert_eq!(header.correlation_id, 12345);
        assert!(rest.into_bytes().is_empty());
    }

    #[test]
    fn test_truncated_header_is_error() {
        let data = Bytes::from_static(&[0, 18, 0]);
        assert!(matches!(Request::parse(data), Err(Error::ParsingError(_))));
    }

    #[test]
    fn test_parse_api_versions_ignores_body() {
        let mut data = build_header(18, 4, 1);
        data.extend_from_slice(b"anything at all");

        match Request::parse(Bytes::from(data)).unwrap() {
            Request::ApiVersions(header, _) => assert_eq!(header.correlation_id, 1),
            other => panic!("Expected ApiVersions request, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_version_is_not_an_error() {
        let data = build_header(18, 3, 7);
        match Request::parse(Bytes::from(data)).unwrap() {
            Request::Unsupported(header, _) => {
                assert_eq!(header.api_key, ApiKey::ApiVersions);
                assert_eq!(header.correlation_id, 7);
            }
            other => panic!("Expected Unsupported request, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_api_key_is_unsupported() {
        let mut data = build_header(2, 0, 8);
        data.extend_from_slice(&[1, 2, 3]);
        match Request::parse(Bytes::from(data)).unwrap() {
            Request::Unsupported(header, body) => {
                assert_eq!(header.api_key, ApiKey::Unknown(2));
                assert_eq!(body, Bytes::from_static(&[1, 2, 3]));
            }
            other => panic!("Expected Unsupported request, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_metadata_request() {
        let mut data = build_header(3, 9, 100);
        data.push(2);
        push_compact_str(&mut data, "foo");
        data.push(0);
        push_compact_str(&mut data, "bar");
        data.push(0);
        data.push(1); // allow auto creation
        data.push(0);
        data.push(0);

        match Request::parse(Bytes::from(data)).unwrap() {
            Request::Metadata(header, body) => {
                assert_eq!(header.correlation_id, 100);
                assert_eq!(body.topics, vec!["foo".to_string(), "bar".to_string()]);
                assert!(body.allow_auto_topic_creation);
                assert!(!body.include_topic_authorized_operations);
            }
            other => panic!("Expected Metadata request, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_metadata_request_all_topics() {
        let mut data = build_header(3, 9, 101);
        data.extend_from_slice(&[0, 0, 0, 0]);

        match Request::parse(Bytes::from(data)).unwrap() {
            Request::Metadata(_, body) => assert!(body.topics.is_empty()),
            other => panic!("Expected Metadata request, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_produce_request() {
        let mut data = build_header(0, 9, 5);
        data.push(0); // transactional id
        data.extend_from_slice(&1i16.to_be_bytes());
        data.extend_from_slice(&30_000i32.to_be_bytes());
        data.push(1);
        push_compact_str(&mut data, "events");
        data.push(2);
        data.extend_from_slice(&0i32.to_be_bytes());
        data.extend_from_slice(&3i32.to_be_bytes());
        data.extend_from_slice(&[9, 9, 9]);
        data.extend_from_slice(&1i32.to_be_bytes());
        data.extend_from_slice(&(-1i32).to_be_bytes());
        data.push(0); // topic tags
        data.push(0); // request tags

        match Request::parse(Bytes::from(data)).unwrap() {
            Request::Produce(_, body) => {
                assert_eq!(body.transactional_id, "");
                assert_eq!(body.acks, 1);
                assert_eq!(body.timeout_ms, 30_000);
                assert_eq!(body.topics.len(), 1);
                let topic = &body.topics[0];
                assert_eq!(topic.name, "events");
                assert_eq!(topic.partitions[0].partition_index, 0);
                assert_eq!(
                    topic.partitions[0].records,
                    Some(Bytes::from_static(&[9, 9, 9]))
                );
                assert_eq!(topic.partitions[1].partition_index, 1);
                assert_eq!(topic.partitions[1].records, None);
            }
            other => panic!("Expected Produce request, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_produce_request_truncated_records() {
        let mut data = build_header(0, 9, 5);
        data.push(0);
        data.extend_from_slice(&1i16.to_be_bytes());
        data.extend_from_slice(&0i32.to_be_bytes());
        data.push(1);
        push_compact_str(&mut data, "events");
        data.push(1);
        data.extend_from_slice(&0i32.to_be_bytes());
        data.extend_from_slice(&100i32.to_be_bytes());
        data.extend_from_slice(&[1, 2]);

        assert!(matches!(
            Request::parse(Bytes::from(data)),
            Err(Error::ParsingError(_))
        ));
    }

    #[test]
    fn test_parse_fetch_request() {
        let mut data = build_header(1, 12, 6);
        data.extend_from_slice(&(-1i32).to_be_bytes()); // replica
        data.extend_from_slice(&500i32.to_be_bytes()); // max wait
        data.extend_from_slice(&1i32.to_be_bytes()); // min bytes
        data.extend_from_slice(&1_048_576i32.to_be_bytes()); // max bytes
        data.push(0); // isolation
        data.extend_from_slice(&0i32.to_be_bytes()); // session id
        data.extend_from_slice(&(-1i32).to_be_bytes()); // session epoch
        data.push(1);
        push_compact_str(&mut data, "events");
        data.push(1);
        data.extend_from_slice(&2i32.to_be_bytes());
        data.extend_from_slice(&(-1i32).to_be_bytes());
        data.extend_from_slice(&42i64.to_be_bytes());
        data.extend_from_slice(&(-1i32).to_be_bytes());
        data.extend_from_slice(&0i64.to_be_bytes());
        data.extend_from_slice(&65_536i32.to_be_bytes());
        data.push(0); // partition tags
        data.push(0); // topic tags
        data.push(0); // forgotten topics
        push_compact_str(&mut data, "rack-a");
        data.push(0);

        match Request::parse(Bytes::from(data)).unwrap() {
            Request::Fetch(_, body) => {
                assert_eq!(body.max_bytes, 1_048_576);
                assert_eq!(body.session_epoch, -1);
                assert_eq!(body.rack_id, "rack-a");
                assert!(body.forgotten_topics.is_empty());
                let partition = &body.topics[0].partitions[0];
                assert_eq!(body.topics[0].name, "events");
                assert_eq!(partition.partition_index, 2);
                assert_eq!(partition.fetch_offset, 42);
                assert_eq!(partition.partition_max_bytes, 65_536);
            }
            other => panic!("Expected Fetch request, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_offset_commit_request() {
        let mut data = build_header(8, 1, 9);
        push_compact_str(&mut data, "group-1");
        data.extend_from_slice(&3i32.to_be_bytes());
        push_compact_str(&mut data, "member");
        data.push(0); // null group instance
        data.push(1);
        push_compact_str(&mut data, "events");
        data.push(1);
        data.extend_from_slice(&0i32.to_be_bytes());
        data.extend_from_slice(&17i64.to_be_bytes());
        push_compact_str(&mut data, "m");
        data.extend_from_slice(&(-1i64).to_be_bytes());

        match Request::parse(Bytes::from(data)).unwrap() {
            Request::OffsetCommit(_, body) => {
                assert_eq!(body.group_id, "group-1");
                assert_eq!(body.generation_id, 3);
                assert_eq!(body.member_id, "member");
                assert_eq!(body.group_instance_id, "");
                let partition = &body.topics[0].partitions[0];
                assert_eq!(partition.committed_offset, 17);
                assert_eq!(partition.committed_metadata, "m");
                assert_eq!(partition.commit_timestamp, -1);
            }
            other => panic!("Expected OffsetCommit request, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_offset_fetch_request() {
        let mut data = build_header(9, 1, 10);
        push_compact_str(&mut data, "group-1");
        data.push(1);
        push_compact_str(&mut data, "events");
        data.push(2);
        data.extend_from_slice(&0i32.to_be_bytes());
        data.extend_from_slice(&4i32.to_be_bytes());

        match Request::parse(Bytes::from(data)).unwrap() {
            Request::OffsetFetch(_, body) => {
                assert_eq!(body.group_id, "group-1");
                assert_eq!(body.topics[0].name, "events");
                assert_eq!(body.topics[0].partition_indexes, vec![0, 4]);
            }
            other => panic!("Expected OffsetFetch request, got {:?}", other),
        }
    }
}
