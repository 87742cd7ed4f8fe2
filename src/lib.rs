//! # minnow
//! A single-broker message server speaking a subset of the Kafka wire protocol.
//!
//! The broker serves six request kinds (ApiVersions, Metadata, Produce,
//! Fetch, OffsetCommit and OffsetFetch), keeps topic-partition logs and
//! consumer offsets in memory, and snapshots both to JSON files so a restart
//! does not lose data.
//!
//! ## Running a broker
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use minnow::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let config = BrokerConfig::from_env()?;
//!     let broker = Arc::new(Broker::open(config.clone()).await);
//!     let server =
//!         server::KafkaServer::with_config(&config.bind_addr(), broker, config.connection_config())
//!             .await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Custom handlers
//! The [`KafkaServer`](server::KafkaServer) accepts any implementation of the
//! [`Handler`](server::Handler) trait; [`Broker`](broker::Broker) is the one
//! backed by the in-memory stores.
//!
//! ## Resources
//! - [Kafka Protocol Spec](https://kafka.apache.org/protocol.html)

#![forbid(unsafe_code)]

pub mod broker;
pub mod config;
pub mod constants;
mod encode;
pub mod error;
mod parser;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod telemetry;

pub mod prelude {
    //! Main export of broker and server structures
    pub use crate::broker::Broker;
    pub use crate::config::BrokerConfig;
    pub use crate::error::{Error, KafkaCode, Result};
    pub use crate::protocol::{Compression, CrcValidationResult, RecordBatch, validate_batch_crc};

    pub use bytes;

    pub mod server {
        //! Broker TCP server.
        //!
        //! See [`KafkaServer`] for the main entry point.
        pub use crate::server::*;
    }
}
