//! Overlay network subsystem.
//!
//! # Data Flow
//! ```text
//! JoinOptions (hostname, auth key, control URL, logger)
//!     → Overlay::join (blocking until the session is up)
//!     → OverlaySession
//!         → listen(OverlayPort::Http | OverlayPort::Https) → TcpListener
//!         → local_client() → LocalClient
//!             → who_is(remote addr)      (identity for /who)
//!             → certificate(server name) (TLS handshakes on 443)
//! ```
//!
//! # Design Decisions
//! - The join protocol is opaque; backends implement the traits
//! - Sessions and clients are shared read-only across tasks (`Send + Sync`)
//! - No retries here; reconnection is the backend's business

pub mod auth;
pub mod host;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rustls::sign::CertifiedKey;
use tokio::net::TcpListener;

pub use auth::{load_auth_key, AuthKeyError};
pub use host::HostOverlay;

/// Error type for overlay operations.
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("failed to join overlay network: {0}")]
    Join(String),

    #[error("failed to listen on overlay port {port}: {source}")]
    Listen {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid remote address {0:?}")]
    InvalidAddress(String),

    #[error("no peer found for {0}")]
    PeerNotFound(String),

    #[error("no certificate available for {0:?}")]
    Certificate(String),

    #[error("{0}")]
    Other(String),
}

/// The two well-known overlay ports the gateway serves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayPort {
    /// Plain HTTP, port 80.
    Http,
    /// TLS, port 443.
    Https,
}

impl OverlayPort {
    pub fn number(self) -> u16 {
        match self {
            OverlayPort::Http => 80,
            OverlayPort::Https => 443,
        }
    }

    pub fn scheme(self) -> &'static str {
        match self {
            OverlayPort::Http => "http",
            OverlayPort::Https => "https",
        }
    }
}

impl fmt::Display for OverlayPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Log sink handed to the overlay session.
///
/// Disabled loggers drop every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlayLogger {
    enabled: bool,
}

impl OverlayLogger {
    /// A logger forwarding to `tracing` under the `overlay` target.
    pub fn tracing() -> Self {
        Self { enabled: true }
    }

    /// A logger that discards everything.
    pub fn discard() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn log(&self, args: fmt::Arguments<'_>) {
        if self.enabled {
            tracing::info!(target: "overlay", "{}", args);
        }
    }
}

/// Parameters for joining the overlay network.
#[derive(Debug, Clone)]
pub struct JoinOptions {
    /// Node name to register under.
    pub hostname: String,
    /// Pre-shared auth key; `None` uses the backend's default authentication.
    pub auth_key: Option<String>,
    /// Control-plane URL override.
    pub control_url: Option<String>,
    /// Where the session sends its own logs.
    pub logger: OverlayLogger,
}

/// The user owning a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub login_name: String,
    pub display_name: String,
}

/// A node on the overlay network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Fully qualified node name.
    pub computed_name: String,
}

/// Identity resolved for a remote address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoIs {
    pub user: UserProfile,
    pub node: Node,
}

/// Entry point of an overlay backend.
#[async_trait]
pub trait Overlay: Send + Sync {
    /// Join the network. Blocks until the session is usable or fails.
    async fn join(&self, options: JoinOptions) -> Result<Arc<dyn OverlaySession>, OverlayError>;
}

/// A joined overlay network session.
#[async_trait]
pub trait OverlaySession: Send + Sync {
    /// Open a raw TCP listener on one of the overlay ports.
    async fn listen(&self, port: OverlayPort) -> Result<TcpListener, OverlayError>;

    /// Capability for in-process queries against the session.
    fn local_client(&self) -> Result<Arc<dyn LocalClient>, OverlayError>;
}

/// In-process client of a joined session.
#[async_trait]
pub trait LocalClient: Send + Sync {
    /// Resolve the identity behind a raw `ip:port` remote address.
    async fn who_is(&self, remote_addr: &str) -> Result<WhoIs, OverlayError>;

    /// Certificate for a TLS handshake. Called once per handshake.
    fn certificate(&self, server_name: Option<&str>) -> Result<Arc<CertifiedKey>, OverlayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_ports() {
        assert_eq!(OverlayPort::Http.number(), 80);
        assert_eq!(OverlayPort::Https.number(), 443);
        assert_eq!(OverlayPort::Https.scheme(), "https");
        assert_eq!(OverlayPort::Http.to_string(), "80");
    }

    #[test]
    fn default_logger_discards() {
        assert!(!OverlayLogger::default().is_enabled());
        assert!(OverlayLogger::tracing().is_enabled());
    }

    #[test]
    fn other_error_is_verbatim() {
        let err = OverlayError::Other("no match for IP:port".into());
        assert_eq!(err.to_string(), "no match for IP:port");
    }
}
