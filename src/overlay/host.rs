//! Host-network overlay backend.
//!
//! For hosts where an overlay daemon already owns a network interface: the
//! gateway binds the overlay ports on that interface's address, resolves
//! peers from a static table and serves one certificate for every name.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use rustls::sign::CertifiedKey;
use tokio::net::TcpListener;

use crate::config::HostOverlayConfig;
use crate::net::tls::load_certified_key;
use crate::overlay::{
    JoinOptions, LocalClient, Node, Overlay, OverlayError, OverlayLogger, OverlayPort,
    OverlaySession, UserProfile, WhoIs,
};

/// Overlay backend bound to an existing host interface.
pub struct HostOverlay {
    config: HostOverlayConfig,
}

impl HostOverlay {
    pub fn new(config: HostOverlayConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Overlay for HostOverlay {
    async fn join(&self, options: JoinOptions) -> Result<Arc<dyn OverlaySession>, OverlayError> {
        let logger = options.logger;
        logger.log(format_args!(
            "joining as {:?} on {} (control: {})",
            options.hostname,
            self.config.bind_ip,
            options.control_url.as_deref().unwrap_or("default")
        ));
        if options.auth_key.is_some() {
            logger.log(format_args!("auth key supplied; host interface is managed externally"));
        }

        // Fails when the interface address is not assigned to this host.
        let probe = std::net::TcpListener::bind(SocketAddr::new(self.config.bind_ip, 0))
            .map_err(|e| OverlayError::Join(format!("{}: {}", self.config.bind_ip, e)))?;
        drop(probe);

        let certificate = match (&self.config.cert_path, &self.config.key_path) {
            (Some(cert), Some(key)) => Some(Arc::new(
                load_certified_key(cert, key).map_err(|e| OverlayError::Join(e.to_string()))?,
            )),
            _ => None,
        };

        let peers = self
            .config
            .peers
            .iter()
            .map(|peer| {
                let who = WhoIs {
                    user: UserProfile {
                        login_name: peer.login_name.clone(),
                        display_name: peer.display_name.clone(),
                    },
                    node: Node {
                        computed_name: peer.node_name.clone(),
                    },
                };
                (peer.address, who)
            })
            .collect::<HashMap<_, _>>();

        logger.log(format_args!("joined with {} known peers", peers.len()));

        Ok(Arc::new(HostSession {
            config: self.config.clone(),
            client: Arc::new(HostClient { peers, certificate }),
            logger,
        }))
    }
}

struct HostSession {
    config: HostOverlayConfig,
    client: Arc<HostClient>,
    logger: OverlayLogger,
}

impl HostSession {
    fn port(&self, port: OverlayPort) -> u16 {
        match port {
            OverlayPort::Http => self.config.http_port,
            OverlayPort::Https => self.config.https_port,
        }
    }
}

#[async_trait]
impl OverlaySession for HostSession {
    async fn listen(&self, port: OverlayPort) -> Result<TcpListener, OverlayError> {
        let addr = SocketAddr::new(self.config.bind_ip, self.port(port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| OverlayError::Listen {
                port: port.number(),
                source,
            })?;
        self.logger.log(format_args!("listening on {} for port {}", addr, port));
        Ok(listener)
    }

    fn local_client(&self) -> Result<Arc<dyn LocalClient>, OverlayError> {
        Ok(self.client.clone())
    }
}

struct HostClient {
    peers: HashMap<IpAddr, WhoIs>,
    certificate: Option<Arc<CertifiedKey>>,
}

#[async_trait]
impl LocalClient for HostClient {
    async fn who_is(&self, remote_addr: &str) -> Result<WhoIs, OverlayError> {
        let addr: SocketAddr = remote_addr
            .parse()
            .map_err(|_| OverlayError::InvalidAddress(remote_addr.to_string()))?;
        self.peers
            .get(&addr.ip())
            .cloned()
            .ok_or_else(|| OverlayError::PeerNotFound(addr.ip().to_string()))
    }

    fn certificate(&self, server_name: Option<&str>) -> Result<Arc<CertifiedKey>, OverlayError> {
        self.certificate
            .clone()
            .ok_or_else(|| OverlayError::Certificate(server_name.unwrap_or("").to_string()))
    }
}
