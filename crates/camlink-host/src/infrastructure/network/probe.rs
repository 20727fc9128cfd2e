//! TCP port probing for discovery.

use std::time::Duration;

use async_trait::async_trait;
use camlink_core::EndpointId;
use tokio::net::TcpStream;
use tracing::trace;

/// Checks whether an endpoint accepts TCP connections on a port.
///
/// The probe opens a connection and immediately drops it; no bytes are
/// exchanged.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PortProber: Send + Sync {
    /// Returns `true` if `endpoint:port` accepted a connection within
    /// `timeout`.  Any failure, including a timeout, returns `false`.
    async fn probe(&self, endpoint: EndpointId, port: u16, timeout: Duration) -> bool;
}

/// Production prober using `tokio::net::TcpStream`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpPortProber;

#[async_trait]
impl PortProber for TcpPortProber {
    async fn probe(&self, endpoint: EndpointId, port: u16, timeout: Duration) -> bool {
        let addr = endpoint.with_port(port);
        match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                trace!(%addr, "probe refused: {e}");
                false
            }
            Err(_) => false,
        }
    }
}
