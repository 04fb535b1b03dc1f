//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the dual-surface gateway.
///
/// Only `hostname` and `local_addr` are required; everything else has a
/// default that matches a plain overlay deployment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Name used when joining the overlay network.
    pub hostname: String,

    /// Optional file holding the pre-shared overlay auth key.
    pub auth_key_path: Option<PathBuf>,

    /// Optional control-plane URL override.
    pub control_url: Option<String>,

    /// Route overlay session logs through the application logger.
    pub verbose: bool,

    /// Loopback bind address (e.g., "127.0.0.1:8080").
    pub local_addr: String,

    /// Start the overlay surface at all.
    pub enable_overlay: bool,

    /// Mount `/quitquitquit` on the overlay surface.
    pub quit_endpoint: bool,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Settings for the host-network overlay backend.
    pub overlay: HostOverlayConfig,
}

impl GatewayConfig {
    /// Build a configuration from the two required fields.
    pub fn new(hostname: impl Into<String>, local_addr: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            local_addr: local_addr.into(),
            ..Self::default()
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            auth_key_path: None,
            control_url: None,
            verbose: false,
            local_addr: "127.0.0.1:8080".to_string(),
            enable_overlay: true,
            quit_endpoint: true,
            timeouts: TimeoutConfig::default(),
            overlay: HostOverlayConfig::default(),
        }
    }
}

/// Timeout configuration shared by both surfaces.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for reading request headers and, separately, the request body.
    pub read_secs: u64,
}

impl TimeoutConfig {
    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { read_secs: 300 }
    }
}

/// Host-network overlay backend configuration.
///
/// Used when an overlay daemon already manages a network interface on this
/// machine and the gateway only has to bind on its address.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HostOverlayConfig {
    /// Address of the overlay interface.
    pub bind_ip: IpAddr,

    /// Port used for the overlay plain HTTP listener.
    pub http_port: u16,

    /// Port used for the overlay TLS listener.
    pub https_port: u16,

    /// PEM certificate chain served for TLS handshakes.
    pub cert_path: Option<PathBuf>,

    /// PEM private key matching `cert_path`.
    pub key_path: Option<PathBuf>,

    /// Known peers, used for identity resolution.
    pub peers: Vec<PeerConfig>,
}

impl Default for HostOverlayConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            http_port: 80,
            https_port: 443,
            cert_path: None,
            key_path: None,
            peers: Vec::new(),
        }
    }
}

/// A single overlay peer and the identity it maps to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PeerConfig {
    /// Overlay address of the peer.
    pub address: IpAddr,

    /// Login name of the user owning the peer.
    pub login_name: String,

    /// Display name of that user.
    #[serde(default)]
    pub display_name: String,

    /// Fully qualified node name (e.g., "laptop.example.ts.net").
    pub node_name: String,
}
