//! Client connection handling.
//!
//! Each connection reads one length-prefixed frame at a time, dispatches it
//! to the [`Handler`] and writes the response before reading the next frame,
//! so responses leave in the order requests arrived.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{Buf, Bytes};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::constants::{DEFAULT_FRAME_READ_TIMEOUT_SECS, DEFAULT_MAX_MESSAGE_SIZE};
use crate::encode::ToByte;
use crate::error::{Error, Result};

use super::handler::{Handler, RequestContext};
use super::request::Request;
use super::response::Response;

/// Framing limits applied to every connection.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    /// Time allowed between the first byte of a frame and its last.
    pub frame_read_timeout: Duration,
    /// Largest frame body accepted.
    pub max_message_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            frame_read_timeout: Duration::from_secs(DEFAULT_FRAME_READ_TIMEOUT_SECS),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

#[inline]
fn encode_response<R: ToByte>(correlation_id: i32, resp: &R) -> Result<Vec<u8>> {
    Response::new(correlation_id, resp)?.encode_with_size()
}

/// Parse one frame body, run the handler and encode the response frame.
///
/// A body that cannot be parsed is an error; the caller closes the
/// connection.
async fn dispatch_request<H: Handler>(
    handler: &H,
    data: Bytes,
    client_addr: SocketAddr,
) -> Result<Vec<u8>> {
    let start = Instant::now();

    let request = match Request::parse(data.clone()) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(
                client = %client_addr,
                error = %e,
                data_len = data.len(),
                first_bytes = ?&data[..data.len().min(32)],
                "Failed to parse request"
            );
            return Err(e);
        }
    };

    let header = *request.header();
    let correlation_id = header.correlation_id;
    let ctx = RequestContext::new(client_addr, &header);

    tracing::debug!(
        request_id = %ctx.request_id,
        api_key = header.api_key.as_str(),
        api_version = header.api_version,
        client = %client_addr,
        correlation_id,
        "Handling request"
    );

    let result = match request {
        Request::ApiVersions(_, req) => encode_response(
            correlation_id,
            &handler.handle_api_versions(&ctx, req).await,
        ),
        Request::Metadata(_, req) => {
            encode_response(correlation_id, &handler.handle_metadata(&ctx, req).await)
        }
        Request::Produce(_, req) => {
            encode_response(correlation_id, &handler.handle_produce(&ctx, req).await)
        }
        Request::Fetch(_, req) => {
            encode_response(correlation_id, &handler.handle_fetch(&ctx, req).await)
        }
        Request::OffsetCommit(_, req) => encode_response(
            correlation_id,
            &handler.handle_offset_commit(&ctx, req).await,
        ),
        Request::OffsetFetch(_, req) => encode_response(
            correlation_id,
            &handler.handle_offset_fetch(&ctx, req).await,
        ),
        Request::Unsupported(h, _) => {
            tracing::warn!(
                client = %client_addr,
                api_key = i16::from(h.api_key),
                api_version = h.api_version,
                correlation_id,
                "Unsupported request"
            );
            encode_response(
                correlation_id,
                &handler.handle_unsupported(&ctx, h.api_key).await,
            )
        }
    };

    tracing::debug!(
        request_id = %ctx.request_id,
        correlation_id,
        elapsed_us = start.elapsed().as_micros() as u64,
        "Request complete"
    );

    result
}

/// A client connection to the broker.
pub struct ClientConnection {
    stream: TcpStream,
    addr: SocketAddr,
    config: ConnectionConfig,
}

impl ClientConnection {
    pub fn new(stream: TcpStream, addr: SocketAddr, config: ConnectionConfig) -> Self {
        Self {
            stream,
            addr,
            config,
        }
    }

    /// Handle requests from this connection until it closes.
    ///
    /// Returns `Ok` when the client disconnects between frames and an error
    /// for anything that ends the connection mid-frame.
    pub async fn handle_requests<H: Handler>(&mut self, handler: Arc<H>) -> Result<()> {
        loop {
            let data = match self.read_request().await? {
                Some(data) => data,
                None => {
                    tracing::debug!(client = %self.addr, "Client disconnected");
                    return Ok(());
                }
            };
            let response = dispatch_request(handler.as_ref(), data, self.addr).await?;
            self.write_response(&response).await?;
        }
    }

    /// Read a single frame body.
    ///
    /// Waits indefinitely for the first byte of the size prefix; the rest of
    /// the frame must arrive within the frame read timeout. `None` means the
    /// client closed the connection cleanly.
    async fn read_request(&mut self) -> Result<Option<Bytes>> {
        let mut size_buf = [0u8; 4];
        if self.stream.read(&mut size_buf[..1]).await? == 0 {
            return Ok(None);
        }

        let read_timeout = self.config.frame_read_timeout;
        match timeout(read_timeout, self.read_frame_rest(size_buf)).await {
            Ok(result) => result.map(Some),
            Err(_) => {
                tracing::warn!(
                    client = %self.addr,
                    timeout_secs = read_timeout.as_secs(),
                    "Frame read timeout - closing connection"
                );
                Err(Error::MissingData("Frame read timeout".to_owned()))
            }
        }
    }

    async fn read_frame_rest(&mut self, mut size_buf: [u8; 4]) -> Result<Bytes> {
        self.read_exact(&mut size_buf[1..]).await?;
        let size = (&size_buf[..]).get_i32();

        if size < 0 {
            return Err(Error::MissingData(format!(
                "Invalid negative message size: {}",
                size
            )));
        }
        let size = size as usize;
        if size > self.config.max_message_size {
            return Err(Error::MissingData(format!(
                "Message size {} exceeds maximum allowed size {}",
                size, self.config.max_message_size
            )));
        }

        tracing::trace!(client = %self.addr, size, "Reading frame");

        let mut data = vec![0u8; size];
        self.read_exact(&mut data).await?;
        Ok(Bytes::from(data))
    }

    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.stream.read_exact(buf).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(Error::MissingData(
                "Connection closed mid-message".to_owned(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a response frame to the connection.
    async fn write_response(&mut self, response: &[u8]) -> Result<()> {
        tracing::trace!(
            client = %self.addr,
            response_len = response.len(),
            "Writing response"
        );
        self.stream.write_all(response).await?;
        self.stream.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::test_support::broker_in;
    use tokio::net::TcpListener;

    async fn spawn_connection(
        config: ConnectionConfig,
    ) -> (TcpStream, tokio::task::JoinHandle<Result<()>>) {
        let dir = tempfile::tempdir().unwrap();
        let handler = Arc::new(broker_in(dir.path()).await);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let (stream, peer) = listener.accept().await.unwrap();
            let mut conn = ClientConnection::new(stream, peer, config);
            let result = conn.handle_requests(handler).await;
            drop(dir);
            result
        });
        let client = TcpStream::connect(addr).await.unwrap();
        (client, task)
    }

    fn frame(body: &[u8]) -> Vec<u8> {
        let mut out = (body.len() as i32).to_be_bytes().to_vec();
        out.extend_from_slice(body);
        out
    }

    async fn read_frame(stream: &mut TcpStream) -> Vec<u8> {
        let mut len = [0u8; 4];
        stream.read_exact(&mut len).await.unwrap();
        let mut body = vec![0u8; i32::from_be_bytes(len) as usize];
        stream.read_exact(&mut body).await.unwrap();
        body
    }

    #[tokio::test]
    async fn test_unsupported_keeps_connection_open() {
        let (mut client, _task) = spawn_connection(ConnectionConfig::default()).await;

        // ApiVersions v0 is not served
        client.write_all(&frame(&[0, 18, 0, 0, 0, 0, 0, 5])).await.unwrap();
        let body = read_frame(&mut client).await;
        assert_eq!(&body[..4], &5i32.to_be_bytes());
        assert_eq!(&body[4..6], &35i16.to_be_bytes());

        client.write_all(&frame(&[0, 18, 0, 4, 0, 0, 0, 6])).await.unwrap();
        let body = read_frame(&mut client).await;
        assert_eq!(&body[..4], &6i32.to_be_bytes());
        assert_eq!(&body[4..6], &0i16.to_be_bytes());
    }

    #[tokio::test]
    async fn test_clean_close_between_frames() {
        let (client, task) = spawn_connection(ConnectionConfig::default()).await;
        drop(client);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_negative_size_closes_connection() {
        let (mut client, task) = spawn_connection(ConnectionConfig::default()).await;
        client.write_all(&(-5i32).to_be_bytes()).await.unwrap();
        assert!(matches!(task.await.unwrap(), Err(Error::MissingData(_))));
    }

    #[tokio::test]
    async fn test_oversized_frame_closes_connection() {
        let config = ConnectionConfig {
            max_message_size: 16,
            ..ConnectionConfig::default()
        };
        let (mut client, task) = spawn_connection(config).await;
        client.write_all(&64i32.to_be_bytes()).await.unwrap();
        assert!(matches!(task.await.unwrap(), Err(Error::MissingData(_))));
    }

    #[tokio::test]
    async fn test_stalled_frame_times_out() {
        let config = ConnectionConfig {
            frame_read_timeout: Duration::from_millis(100),
            ..ConnectionConfig::default()
        };
        let (mut client, task) = spawn_connection(config).await;
        client.write_all(&[0, 0]).await.unwrap();
        let result = task.await.unwrap();
        assert!(matches!(result, Err(Error::MissingData(msg)) if msg.contains("timeout")));
    }

    #[tokio::test]
    async fn test_garbage_body_closes_connection() {
        let (mut client, task) = spawn_connection(ConnectionConfig::default()).await;
        client.write_all(&frame(&[0, 3])).await.unwrap();
        assert!(matches!(task.await.unwrap(), Err(Error::ParsingError(_))));
    }
}
