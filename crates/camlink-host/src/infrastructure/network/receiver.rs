//! Stream receiver: one long-lived connection per endpoint.
//!
//! # Lifecycle
//!
//! ```text
//!          ┌──────────────┐  connected   ┌────────────┐ first frame ┌───────────┐
//!   ──────►│  Connecting  │─────────────►│ (waiting)  │────────────►│ Streaming │
//!          └──────────────┘              └────────────┘             └───────────┘
//!                 ▲                              │ any transport failure   │
//!                 │   fixed backoff (2 s)        ▼                         │
//!                 └──────────────────────── Disconnected ◄─────────────────┘
//! ```
//!
//! On every termination the endpoint leaves the registry's active list and
//! its last frame is evicted, so its canvas region turns black on the next
//! output tick.  The receiver then waits a fixed backoff and reconnects,
//! forever, until the shutdown token is cancelled.
//!
//! # Framing
//!
//! Each frame is `[len:4 BE][reserved:4][payload:len]`.  The header is read
//! with `read_exact`; the payload is accumulated across as many socket reads
//! as it takes.  EOF before the payload is complete is a transport failure:
//! nothing is published for the partial frame.
//!
//! Decoding runs on a blocking thread and is awaited before the next frame is
//! read, so frames of one endpoint reach the registry in receive order.

use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

use camlink_core::protocol::{decode_header, FrameHeader, ProtocolError, HEADER_SIZE};
use camlink_core::{ConnectionState, EndpointId, FrameDecoder};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::application::registry::StreamRegistry;

/// Errors that end one connection attempt.
#[derive(Debug, Error)]
pub enum ReceiveError {
    /// The TCP connect was refused or failed.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The TCP connect did not complete in time.
    #[error("connect to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    /// An I/O error occurred on the established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The header could not be accepted (e.g. oversized length).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The endpoint closed the connection between frames.
    #[error("connection closed by endpoint")]
    Closed,

    /// The endpoint closed the connection in the middle of a payload.
    #[error("connection closed after {received} of {expected} payload bytes")]
    ShortRead { expected: usize, received: usize },
}

/// Per-receiver settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Streaming port on the endpoint.
    pub port: u16,
    /// Upper bound on one TCP connect.
    pub connect_timeout: Duration,
    /// Fixed wait between a termination and the next attempt.
    pub reconnect_backoff: Duration,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            port: 6000,
            connect_timeout: Duration::from_secs(5),
            reconnect_backoff: Duration::from_secs(2),
        }
    }
}

/// Reads one complete frame from `reader`.
///
/// Returns the header and the owned payload.
///
/// # Errors
///
/// - [`ReceiveError::Closed`] if the stream ends before or inside the header.
/// - [`ReceiveError::ShortRead`] if it ends inside the payload.
/// - [`ReceiveError::Protocol`] if the declared length exceeds the limit.
/// - [`ReceiveError::Io`] for any other read failure.
pub async fn read_frame<R>(reader: &mut R) -> Result<(FrameHeader, Vec<u8>), ReceiveError>
where
    R: AsyncRead + Unpin,
{
    let mut header_buf = [0u8; HEADER_SIZE];
    if let Err(e) = reader.read_exact(&mut header_buf).await {
        return Err(match e.kind() {
            ErrorKind::UnexpectedEof => ReceiveError::Closed,
            _ => ReceiveError::Io(e),
        });
    }
    let header = decode_header(&header_buf)?;

    let expected = header.payload_len();
    let mut payload = vec![0u8; expected];
    let mut received = 0;
    while received < expected {
        let n = reader.read(&mut payload[received..]).await?;
        if n == 0 {
            return Err(ReceiveError::ShortRead { expected, received });
        }
        received += n;
    }

    Ok((header, payload))
}

/// Maintains the connection to a single endpoint.
pub struct StreamReceiver {
    endpoint: EndpointId,
    config: ReceiverConfig,
    registry: Arc<StreamRegistry>,
    decoder: Arc<dyn FrameDecoder>,
}

impl StreamReceiver {
    pub fn new(
        endpoint: EndpointId,
        config: ReceiverConfig,
        registry: Arc<StreamRegistry>,
        decoder: Arc<dyn FrameDecoder>,
    ) -> Self {
        Self {
            endpoint,
            config,
            registry,
            decoder,
        }
    }

    /// Connect / stream / back off until `shutdown` is cancelled.
    ///
    /// Never returns an error: every failure is logged and retried.
    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let connection_id = Uuid::new_v4();
            let span = info_span!(
                "receiver",
                endpoint = %self.endpoint,
                connection_id = %connection_id
            );

            let result = self
                .connect_and_stream(&shutdown)
                .instrument(span.clone())
                .await;

            self.registry.remove(&self.endpoint);

            match result {
                Ok(()) => break,
                Err(e) => span.in_scope(|| {
                    warn!(
                        "connection ended: {e}; reconnecting in {:?}",
                        self.config.reconnect_backoff
                    );
                }),
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.reconnect_backoff) => {}
            }
        }
        debug!(endpoint = %self.endpoint, "receiver stopped");
    }

    /// One connection attempt.  `Ok(())` means shutdown was requested.
    async fn connect_and_stream(&self, shutdown: &CancellationToken) -> Result<(), ReceiveError> {
        self.registry.set_state(&self.endpoint, ConnectionState::Connecting);

        let addr = self.endpoint.with_port(self.config.port);
        let timeout = self.config.connect_timeout;
        let connect = tokio::time::timeout(timeout, TcpStream::connect(&addr));

        let stream = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            result = connect => match result {
                Err(_) => return Err(ReceiveError::ConnectTimeout { addr, timeout }),
                Ok(Err(source)) => return Err(ReceiveError::Connect { addr, source }),
                Ok(Ok(stream)) => stream,
            },
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!("could not set TCP_NODELAY: {e}");
        }
        info!("connected to {addr}");

        self.stream_frames(stream, shutdown).await
    }

    /// Reads, decodes and publishes frames until the stream fails or
    /// `shutdown` is cancelled (`Ok(())`).
    pub async fn stream_frames<R>(
        &self,
        mut reader: R,
        shutdown: &CancellationToken,
    ) -> Result<(), ReceiveError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut decoded_frames: u64 = 0;
        loop {
            let (header, payload) = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(()),
                frame = read_frame(&mut reader) => frame?,
            };

            let decoder = Arc::clone(&self.decoder);
            match tokio::task::spawn_blocking(move || decoder.decode(&payload)).await {
                Ok(Ok(frame)) => {
                    decoded_frames += 1;
                    if self.registry.publish_frame(&self.endpoint, Arc::new(frame)) {
                        info!("streaming ({} active)", self.registry.active_count());
                    }
                }
                Ok(Err(e)) => {
                    warn!(
                        payload_len = header.payload_len,
                        decoded_frames, "dropping undecodable frame: {e}"
                    );
                }
                Err(e) => error!("decode task failed: {e}"),
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
