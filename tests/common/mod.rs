//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dualgate::net::tls::load_certified_key;
use dualgate::overlay::{
    JoinOptions, LocalClient, Node, Overlay, OverlayError, OverlayPort, OverlaySession,
    UserProfile, WhoIs,
};
use dualgate::ServerState;
use rustls::sign::CertifiedKey;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Everything the mock overlay records or is told to do.
#[derive(Default)]
pub struct MockState {
    pub joins: Mutex<Vec<JoinOptions>>,
    pub bound: Mutex<HashMap<OverlayPort, SocketAddr>>,
    pub cert_requests: Mutex<Vec<Option<String>>>,
    join_error: Option<String>,
    failing_ports: Vec<OverlayPort>,
    identities: HashMap<IpAddr, WhoIs>,
    certificate: Option<Arc<CertifiedKey>>,
}

/// Overlay double that listens on 127.0.0.1 ephemeral ports.
#[derive(Clone, Default)]
pub struct MockOverlay {
    pub state: Arc<MockState>,
}

impl MockOverlay {
    pub fn builder() -> MockOverlayBuilder {
        MockOverlayBuilder::default()
    }

    pub fn join_count(&self) -> usize {
        self.state.joins.lock().unwrap().len()
    }

    pub fn last_join(&self) -> Option<JoinOptions> {
        self.state.joins.lock().unwrap().last().cloned()
    }

    pub fn bound(&self, port: OverlayPort) -> Option<SocketAddr> {
        self.state.bound.lock().unwrap().get(&port).copied()
    }

    /// Wait until the overlay task for `port` opened its listener.
    pub async fn wait_bound(&self, port: OverlayPort) -> SocketAddr {
        for _ in 0..200 {
            if let Some(addr) = self.bound(port) {
                return addr;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("overlay port {port} never bound");
    }
}

#[derive(Default)]
pub struct MockOverlayBuilder {
    state: MockState,
}

impl MockOverlayBuilder {
    pub fn identity(mut self, ip: IpAddr, login_name: &str, node_name: &str) -> Self {
        self.state.identities.insert(
            ip,
            WhoIs {
                user: UserProfile {
                    login_name: login_name.into(),
                    display_name: String::new(),
                },
                node: Node {
                    computed_name: node_name.into(),
                },
            },
        );
        self
    }

    pub fn failing_join(mut self, message: &str) -> Self {
        self.state.join_error = Some(message.into());
        self
    }

    pub fn failing_listen(mut self, port: OverlayPort) -> Self {
        self.state.failing_ports.push(port);
        self
    }

    pub fn certificate(mut self, key: CertifiedKey) -> Self {
        self.state.certificate = Some(Arc::new(key));
        self
    }

    pub fn build(self) -> MockOverlay {
        MockOverlay {
            state: Arc::new(self.state),
        }
    }
}

#[async_trait]
impl Overlay for MockOverlay {
    async fn join(&self, options: JoinOptions) -> Result<Arc<dyn OverlaySession>, OverlayError> {
        self.state.joins.lock().unwrap().push(options);
        if let Some(message) = &self.state.join_error {
            return Err(OverlayError::Join(message.clone()));
        }
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl OverlaySession for MockOverlay {
    async fn listen(&self, port: OverlayPort) -> Result<TcpListener, OverlayError> {
        if self.state.failing_ports.contains(&port) {
            return Err(OverlayError::Listen {
                port: port.number(),
                source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken"),
            });
        }
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        self.state.bound.lock().unwrap().insert(port, addr);
        Ok(listener)
    }

    fn local_client(&self) -> Result<Arc<dyn LocalClient>, OverlayError> {
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl LocalClient for MockOverlay {
    async fn who_is(&self, remote_addr: &str) -> Result<WhoIs, OverlayError> {
        let addr: SocketAddr = remote_addr
            .parse()
            .map_err(|_| OverlayError::InvalidAddress(remote_addr.into()))?;
        self.state
            .identities
            .get(&addr.ip())
            .cloned()
            .ok_or_else(|| OverlayError::Other(format!("no match for IP:port {remote_addr}")))
    }

    fn certificate(&self, server_name: Option<&str>) -> Result<Arc<CertifiedKey>, OverlayError> {
        self.state
            .cert_requests
            .lock()
            .unwrap()
            .push(server_name.map(str::to_string));
        self.state
            .certificate
            .clone()
            .ok_or_else(|| OverlayError::Certificate(server_name.unwrap_or("").into()))
    }
}

pub const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

pub fn test_certificate() -> CertifiedKey {
    load_certified_key(&fixture("node.crt"), &fixture("node.key")).unwrap()
}

/// Bind an ephemeral loopback listener for the server under test.
pub async fn loopback_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Wait until the server reports `Serving`.
pub async fn wait_serving(mut state: watch::Receiver<ServerState>) {
    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s >= ServerState::Serving),
    )
    .await
    .expect("server did not start")
    .expect("server state channel closed");
}

/// HTTP client without pooling or proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// GET `url` and return status and body.
pub async fn get(client: &reqwest::Client, url: &str) -> (u16, String) {
    let response = client.get(url).send().await.expect("request failed");
    let status = response.status().as_u16();
    let body = response.text().await.unwrap();
    (status, body)
}
