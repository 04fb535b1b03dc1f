//! Listener binding and serving.
//!
//! # Responsibilities
//! - Bind the loopback TCP listener
//! - Serve a router on an already-bound listener, plain or TLS
//! - Enforce the request header read timeout
//! - Stop serving when the shared `Handle` is shut down

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use hyper_util::server::conn::auto::Builder;
use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Address did not parse.
    #[error("invalid bind address {0:?}")]
    InvalidAddress(String),
    /// Failed to bind to address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bind a TCP listener on the given address.
pub async fn bind(address: &str) -> Result<TcpListener, ListenerError> {
    let addr: SocketAddr = address
        .parse()
        .map_err(|_| ListenerError::InvalidAddress(address.to_string()))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { addr, source })?;

    tracing::debug!(address = %addr, "Listener bound");
    Ok(listener)
}

/// Serve `app` over plain HTTP until `handle` is shut down.
///
/// An error means the accept loop itself failed.
pub async fn serve_plain(
    listener: TcpListener,
    app: Router,
    read_timeout: Duration,
    handle: Handle,
) -> std::io::Result<()> {
    let mut server = axum_server::from_tcp(listener.into_std()?).handle(handle);
    apply_read_timeout(server.http_builder(), read_timeout);

    server
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await
}

/// Serve `app` over TLS until `handle` is shut down.
pub async fn serve_tls(
    listener: TcpListener,
    app: Router,
    tls: RustlsConfig,
    read_timeout: Duration,
    handle: Handle,
) -> std::io::Result<()> {
    let mut server = axum_server::from_tcp_rustls(listener.into_std()?, tls).handle(handle);
    apply_read_timeout(server.http_builder(), read_timeout);

    server
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await
}

/// HTTP/1 gets a header read timeout. HTTP/2 has no per-request header
/// timer in hyper, so idle h2 peers are probed with keep-alive pings that
/// must be answered within the same window.
fn apply_read_timeout(builder: &mut Builder<TokioExecutor>, read_timeout: Duration) {
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(read_timeout);
    builder
        .http2()
        .timer(TokioTimer::new())
        .keep_alive_interval(read_timeout)
        .keep_alive_timeout(read_timeout);
}
