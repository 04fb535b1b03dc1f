//! TLS on overlay port 443.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use dualgate::config::{HostOverlayConfig, PeerConfig};
use dualgate::overlay::{HostOverlay, OverlayPort};
use dualgate::{DualSurfaceServer, GatewayConfig, RouteRegistry, ShutdownReason};

mod common;
use common::{fixture, loopback_listener, test_certificate, wait_serving, MockOverlay, LOCALHOST};

const NODE_NAME: &str = "web.example.ts.net";

fn tls_client(node: SocketAddr) -> reqwest::Client {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .resolve(NODE_NAME, node)
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[tokio::test]
async fn https_asks_overlay_for_certificate_by_server_name() {
    let overlay = MockOverlay::builder().certificate(test_certificate()).build();
    let registry = RouteRegistry::new().public("/hello", get(|| async { "hi" }));
    let server = DualSurfaceServer::new(
        GatewayConfig::new("web", "127.0.0.1:0"),
        registry,
        Arc::new(overlay.clone()),
    );
    let state = server.state();
    let shutdown = server.shutdown_handle();
    let (listener, _) = loopback_listener().await;
    let task = tokio::spawn(server.run_on(listener));
    wait_serving(state).await;

    let https = overlay.wait_bound(OverlayPort::Https).await;
    let client = tls_client(https);
    let url = format!("https://{NODE_NAME}:{}/hello", https.port());

    for _ in 0..2 {
        let response = client.get(&url).send().await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "hi");
    }

    let requests = overlay.state.cert_requests.lock().unwrap().clone();
    assert!(!requests.is_empty());
    assert!(requests.iter().all(|name| name.as_deref() == Some(NODE_NAME)));

    shutdown.trigger(ShutdownReason::Requested);
    let result = tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    assert_eq!(result.unwrap(), ShutdownReason::Requested);
}

#[tokio::test]
async fn handshake_fails_without_certificate() {
    let overlay = MockOverlay::builder().build();
    let server = DualSurfaceServer::new(
        GatewayConfig::new("web", "127.0.0.1:0"),
        RouteRegistry::new(),
        Arc::new(overlay.clone()),
    );
    let state = server.state();
    let shutdown = server.shutdown_handle();
    let (listener, _) = loopback_listener().await;
    let task = tokio::spawn(server.run_on(listener));
    wait_serving(state).await;

    let https = overlay.wait_bound(OverlayPort::Https).await;
    let url = format!("https://{NODE_NAME}:{}/", https.port());
    assert!(tls_client(https).get(&url).send().await.is_err());

    // A failed handshake only affects that connection.
    assert!(!task.is_finished());
    shutdown.trigger(ShutdownReason::Requested);
    tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn host_overlay_serves_who_over_tls() {
    // Fixed ports: the host backend binds exactly what it is configured with.
    let http_port = 28480;
    let https_port = 28443;

    let mut config = GatewayConfig::new("web", "127.0.0.1:0");
    config.overlay = HostOverlayConfig {
        bind_ip: LOCALHOST,
        http_port,
        https_port,
        cert_path: Some(fixture("node.crt")),
        key_path: Some(fixture("node.key")),
        peers: vec![PeerConfig {
            address: LOCALHOST,
            login_name: "carol@example.com".into(),
            display_name: "Carol".into(),
            node_name: "phone.example.ts.net".into(),
        }],
    };
    let overlay = Arc::new(HostOverlay::new(config.overlay.clone()));
    let server = DualSurfaceServer::new(config, RouteRegistry::new(), overlay);
    let state = server.state();
    let shutdown = server.shutdown_handle();
    let (listener, _) = loopback_listener().await;
    let task = tokio::spawn(server.run_on(listener));
    wait_serving(state).await;

    let https: SocketAddr = (LOCALHOST, https_port).into();
    let client = tls_client(https);
    let url = format!("https://{NODE_NAME}:{https_port}/who");

    let mut response = None;
    for _ in 0..40 {
        match client.get(&url).send().await {
            Ok(r) => {
                response = Some(r);
                break;
            }
            // The listener task may not have bound yet.
            Err(_) => tokio::time::sleep(Duration::from_millis(50)).await,
        }
    }
    let response = response.expect("overlay https listener never came up");
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("You are <b>carol@example.com</b> from <b>phone</b> (127.0.0.1:"));

    shutdown.trigger(ShutdownReason::Requested);
    tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap().unwrap();
}
