//! Crate & protocol level errors.
//!
//! # Error Hierarchy
//!
//! - [`Error`]: connection, parsing, record batch, configuration and snapshot
//!   errors raised inside the broker.
//! - [`KafkaCode`]: wire protocol error codes carried in response bodies.
//!
//! An [`Error`] never travels over the wire; handlers translate failures into a
//! [`KafkaCode`] for the affected partition or request.

use bytes::Bytes;
use num_derive::FromPrimitive;
use std::{io, result};
use thiserror::Error as ThisError;

pub type Result<T> = result::Result<T, Error>;

/// Broker level errors.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
    /// An error in the network or the filesystem.
    #[error("IO error: {0:?}")]
    IoError(io::ErrorKind),

    /// Could not parse the data.
    #[error("Parsing error: invalid data ({} bytes)", .0.len())]
    ParsingError(Bytes),

    /// Missing data or connection closed.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A record batch payload could not be compressed or decompressed.
    #[error("Compression error: {0}")]
    Compression(String),

    /// A record batch failed structural or checksum validation.
    #[error("Corrupt record batch: {0}")]
    CorruptBatch(String),

    /// A snapshot file could not be read, decoded or written.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Error::IoError(a), Error::IoError(b)) => a == b,
            (Error::ParsingError(a), Error::ParsingError(b)) => a == b,
            (Error::MissingData(a), Error::MissingData(b)) => a == b,
            (Error::Config(a), Error::Config(b)) => a == b,
            (Error::Compression(a), Error::Compression(b)) => a == b,
            (Error::CorruptBatch(a), Error::CorruptBatch(b)) => a == b,
            (Error::Snapshot(a), Error::Snapshot(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::IoError(e.kind())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Snapshot(e.to_string())
    }
}

/// Error codes reported to clients.
/// See also [Kafka Errors](http://kafka.apache.org/protocol.html)
///
/// Only the codes this broker can actually produce are listed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, Default)]
pub enum KafkaCode {
    /// An unexpected server error
    Unknown = -1,
    #[default]
    None = 0,
    /// The requested offset is outside the range of offsets
    /// maintained by the server for the given topic/partition
    OffsetOutOfRange = 1,
    /// This indicates that a message contents does not match its CRC
    CorruptMessage = 2,
    /// This request is for a topic or partition that does not exist
    /// on this broker.
    UnknownTopicOrPartition = 3,
    /// For a request which attempts to access an invalid topic
    /// (e.g. one which has an illegal name).
    InvalidTopic = 17,
    /// Returned when the group id is empty or null.
    InvalidGroupId = 24,
    /// The (api key, api version) pair is not supported.
    UnsupportedVersion = 35,
}

impl From<KafkaCode> for i16 {
    fn from(code: KafkaCode) -> Self {
        code as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn test_error_io_error() {
        let err = Error::IoError(io::ErrorKind::ConnectionRefused);
        assert_eq!(err, Error::IoError(io::ErrorKind::ConnectionRefused));
    }

    #[test]
    fn test_error_from_io() {
        let err: Error = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert_eq!(err, Error::IoError(io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_error_display() {
        let err = Error::MissingData("test".to_string());
        let display = format!("{}", err);
        assert!(display.contains("Missing data"));
        assert!(display.contains("test"));
    }

    #[test]
    fn test_parsing_error_display_reports_length() {
        let err = Error::ParsingError(Bytes::from_static(b"abc"));
        assert_eq!(err.to_string(), "Parsing error: invalid data (3 bytes)");
    }

    #[test]
    fn test_snapshot_error_from_serde() {
        let err: Error = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, Error::Snapshot(_)));
    }

    #[test]
    fn test_kafka_code_from_primitive() {
        assert_eq!(KafkaCode::from_i16(-1), Some(KafkaCode::Unknown));
        assert_eq!(KafkaCode::from_i16(0), Some(KafkaCode::None));
        assert_eq!(KafkaCode::from_i16(1), Some(KafkaCode::OffsetOutOfRange));
        assert_eq!(KafkaCode::from_i16(2), Some(KafkaCode::CorruptMessage));
        assert_eq!(
            KafkaCode::from_i16(3),
            Some(KafkaCode::UnknownTopicOrPartition)
        );
        assert_eq!(KafkaCode::from_i16(17), Some(KafkaCode::InvalidTopic));
        assert_eq!(KafkaCode::from_i16(24), Some(KafkaCode::InvalidGroupId));
        assert_eq!(KafkaCode::from_i16(35), Some(KafkaCode::UnsupportedVersion));
        assert_eq!(KafkaCode::from_i16(999), None);
    }

    #[test]
    fn test_kafka_code_into_i16() {
        let raw: i16 = KafkaCode::UnsupportedVersion.into();
        assert_eq!(raw, 35);
        assert_eq!(i16::from(KafkaCode::None), 0);
    }
}
