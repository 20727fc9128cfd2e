//! Endpoint identity and connection lifecycle.
//!
//! An endpoint is identified by the host part of its network address only
//! (e.g. `"192.168.1.23"`).  The streaming port is a process-wide constant,
//! so it is not part of the identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a camera endpoint: its host address string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(String);

impl EndpointId {
    /// Creates an endpoint identity from a host string.
    ///
    /// Surrounding whitespace is trimmed; the host is otherwise kept verbatim.
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        let trimmed = host.trim();
        if trimmed.len() == host.len() {
            Self(host)
        } else {
            Self(trimmed.to_string())
        }
    }

    /// Returns the host string.
    pub fn host(&self) -> &str {
        &self.0
    }

    /// Formats a `host:port` string suitable for `TcpStream::connect`.
    ///
    /// IPv6 literals are bracketed (`[fe80::1]:6000`).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use camlink_core::EndpointId;
    ///
    /// assert_eq!(EndpointId::new("10.0.0.4").with_port(6000), "10.0.0.4:6000");
    /// assert_eq!(EndpointId::new("::1").with_port(6000), "[::1]:6000");
    /// ```
    pub fn with_port(&self, port: u16) -> String {
        if self.0.contains(':') && !self.0.starts_with('[') {
            format!("[{}]:{port}", self.0)
        } else {
            format!("{}:{port}", self.0)
        }
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EndpointId {
    fn from(host: &str) -> Self {
        Self::new(host)
    }
}

impl From<String> for EndpointId {
    fn from(host: String) -> Self {
        Self::new(host)
    }
}

/// Current state of the connection to an endpoint.
///
/// ```text
/// Discovered ──► Connecting ──► Streaming
///                    ▲              │
///                    └─ Disconnected ◄┘
/// ```
///
/// - `Discovered`: the scanner saw the streaming port open; no receiver
///   connection yet.
/// - `Connecting`: the receiver is opening its TCP connection.
/// - `Streaming`: at least one frame has been decoded on this connection.
/// - `Disconnected`: the connection ended; the receiver is backing off
///   before the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Discovered,
    Connecting,
    Streaming,
    Disconnected,
}

impl ConnectionState {
    /// Returns `true` when frames are currently flowing.
    ///
    /// This drives the online/offline indicator of the control panel.
    pub fn is_online(self) -> bool {
        matches!(self, ConnectionState::Streaming)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Discovered => "discovered",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Streaming => "streaming",
            ConnectionState::Disconnected => "disconnected",
        };
        f.write_str(label)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
