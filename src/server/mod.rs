//! Broker TCP server.
//!
//! This module provides a TCP server that speaks the broker's subset of the
//! Kafka wire protocol. Request handling is delegated to a [`Handler`].
//!
//! # Example
//! ```rust,no_run
//! use minnow::broker::Broker;
//! use minnow::config::BrokerConfig;
//! use minnow::server::KafkaServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let broker = Broker::open(BrokerConfig::default()).await;
//!     let server = KafkaServer::bind("127.0.0.1:9092", broker).await.unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

mod connection;
mod handler;
pub mod request;
pub mod response;
pub mod versions;

pub use connection::{ClientConnection, ConnectionConfig};
pub use handler::{Handler, RequestContext};

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::error::{Error, Result};

/// A broker TCP server with graceful shutdown support.
pub struct KafkaServer<H: Handler> {
    listener: TcpListener,
    handler: Arc<H>,
    config: ConnectionConfig,
    /// Shutdown flag; flips to `true` once and stays there.
    shutdown_tx: Arc<watch::Sender<bool>>,
    /// Active connection counter
    active_connections: Arc<AtomicUsize>,
}

impl<H: Handler + 'static> KafkaServer<H> {
    /// Bind a new server to the given address with default framing limits.
    pub async fn bind(addr: &str, handler: H) -> Result<Self> {
        Self::with_config(addr, Arc::new(handler), ConnectionConfig::default()).await
    }

    /// Bind a new server sharing an existing handler.
    ///
    /// # Arguments
    /// * `addr` - Address to bind to (e.g., "127.0.0.1:9092")
    /// * `handler` - Request handler implementation
    /// * `config` - Frame read timeout and size limit for every connection
    pub async fn with_config(
        addr: &str,
        handler: Arc<H>,
        config: ConnectionConfig,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::IoError(e.kind()))?;

        let (shutdown_tx, _) = watch::channel(false);

        tracing::info!(
            addr = %addr,
            frame_read_timeout_ms = config.frame_read_timeout.as_millis() as u64,
            max_message_size = config.max_message_size,
            "Broker listening"
        );

        Ok(Self {
            listener,
            handler,
            config,
            shutdown_tx: Arc::new(shutdown_tx),
            active_connections: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| Error::IoError(e.kind()))
    }

    pub fn handler(&self) -> Arc<H> {
        self.handler.clone()
    }

    /// Get the number of active connections.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }

    /// A handle that stops [`run`](Self::run) from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Initiate graceful shutdown.
    ///
    /// The accept loop stops; connections already being served are left to
    /// finish on their own.
    pub fn shutdown(&self) {
        self.shutdown_handle().shutdown();
    }

    /// Run the server, accepting connections and handling requests.
    ///
    /// This method will return when a shutdown signal is received.
    pub async fn run(&self) -> Result<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            if *shutdown_rx.borrow_and_update() {
                tracing::info!("Server shutting down, no longer accepting connections");
                return Ok(());
            }
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    tracing::info!("Server shutting down, no longer accepting connections");
                    return Ok(());
                }
                accept_result = self.listener.accept() => {
                    let (stream, addr) = match accept_result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };

                    tracing::debug!(client_addr = %addr, "Accepted connection");

                    let handler = self.handler.clone();
                    let config = self.config;
                    let active_connections = self.active_connections.clone();
                    active_connections.fetch_add(1, Ordering::SeqCst);

                    tokio::spawn(async move {
                        let mut conn = ClientConnection::new(stream, addr, config);
                        if let Err(e) = conn.handle_requests(handler).await {
                            tracing::warn!(
                                client_addr = %addr,
                                error = %e,
                                "Connection closed with error"
                            );
                        }
                        active_connections.fetch_sub(1, Ordering::SeqCst);
                    });
                }
            }
        }
    }

    /// Accept and serve a single connection (useful for testing).
    pub async fn accept_one(&self) -> Result<()> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(|e| Error::IoError(e.kind()))?;

        tracing::debug!(client_addr = %addr, "Accepted connection");

        let mut conn = ClientConnection::new(stream, addr, self.config);
        conn.handle_requests(self.handler.clone()).await
    }
}

/// Cloneable trigger for [`KafkaServer::shutdown`].
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
        tracing::info!("Shutdown signal sent");
    }
}
