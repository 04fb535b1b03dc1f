//! Dual-surface server lifecycle.
//!
//! # Responsibilities
//! - Join the overlay network with the configured credentials
//! - Mount the built-in overlay endpoints
//! - Serve the overlay table on ports 80 and 443 in background tasks
//! - Serve the loopback table on the calling task
//! - Turn quit requests and background failures into a return value
//!
//! # Design Decisions
//! - Startup errors are returned, never panicked
//! - A failed overlay listener bind only ends that task
//! - A failed overlay accept loop ends the whole server
//! - No restart, no retries

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::RequestBodyTimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::{debug, diagnostics};
use crate::lifecycle::{ServerState, Shutdown, ShutdownReason, ShutdownSignal};
use crate::net::listener::{bind, serve_plain, serve_tls, ListenerError};
use crate::net::tls::overlay_tls_config;
use crate::observability::metrics;
use crate::overlay::{
    load_auth_key, AuthKeyError, JoinOptions, LocalClient, Overlay, OverlayError, OverlayLogger,
    OverlayPort, OverlaySession,
};
use crate::routing::RouteRegistry;

/// Metrics label of the loopback surface.
pub const LOOPBACK_SURFACE: &str = "loopback";
/// Metrics label of the overlay surface.
pub const OVERLAY_SURFACE: &str = "overlay";

/// Error type for the server lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    AuthKey(#[from] AuthKeyError),

    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] rustls::Error),

    #[error(transparent)]
    Loopback(#[from] ListenerError),

    #[error("loopback server failed: {0}")]
    Serve(#[source] std::io::Error),

    #[error("overlay listener on port {port} failed: {source}")]
    Background {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

enum LoopbackBinding {
    Address(String),
    Listener(TcpListener),
}

/// HTTP front door with a loopback and an overlay surface.
pub struct DualSurfaceServer {
    config: GatewayConfig,
    registry: RouteRegistry,
    overlay: Arc<dyn Overlay>,
    shutdown: Shutdown,
    state: watch::Sender<ServerState>,
    client: watch::Sender<Option<Arc<dyn LocalClient>>>,
}

impl DualSurfaceServer {
    /// Create a server. The registry is consumed; routes are fixed from here on.
    pub fn new(config: GatewayConfig, registry: RouteRegistry, overlay: Arc<dyn Overlay>) -> Self {
        let (state, _) = watch::channel(ServerState::Unstarted);
        let (client, _) = watch::channel(None);
        Self {
            config,
            registry,
            overlay,
            shutdown: Shutdown::new(),
            state,
            client,
        }
    }

    /// Handle that stops the server from outside.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Watch the lifecycle state.
    pub fn state(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Watch the overlay local client.
    ///
    /// Holds `None` until the join succeeds, and for the whole run when the
    /// overlay is disabled.
    pub fn local_client(&self) -> watch::Receiver<Option<Arc<dyn LocalClient>>> {
        self.client.subscribe()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server, binding the loopback listener on `config.local_addr`.
    ///
    /// Returns once shutdown is triggered, or with the first fatal error.
    pub async fn run(self) -> Result<ShutdownReason, ServerError> {
        let address = self.config.local_addr.clone();
        self.start(LoopbackBinding::Address(address)).await
    }

    /// Run the server on an already bound loopback listener.
    pub async fn run_on(self, listener: TcpListener) -> Result<ShutdownReason, ServerError> {
        self.start(LoopbackBinding::Listener(listener)).await
    }

    async fn start(self, loopback: LoopbackBinding) -> Result<ShutdownReason, ServerError> {
        let Self {
            config,
            registry,
            overlay,
            shutdown,
            state,
            client,
        } = self;

        state.send_replace(ServerState::Joining);
        let published = Published {
            state: &state,
            client: &client,
        };
        let result = serve(&config, registry, overlay.as_ref(), &shutdown, published, loopback).await;
        state.send_replace(ServerState::Terminated);

        match &result {
            Ok(reason) => tracing::info!(reason = ?reason, "Server stopped"),
            Err(e) => tracing::error!(error = %e, "Server terminated"),
        }
        result
    }
}

/// Channels the server publishes to while running.
struct Published<'a> {
    state: &'a watch::Sender<ServerState>,
    client: &'a watch::Sender<Option<Arc<dyn LocalClient>>>,
}

async fn serve(
    config: &GatewayConfig,
    registry: RouteRegistry,
    overlay: &dyn Overlay,
    shutdown: &Shutdown,
    published: Published<'_>,
    loopback: LoopbackBinding,
) -> Result<ShutdownReason, ServerError> {
    let read_timeout = config.timeouts.read();
    let mut registry = debug::mount(registry, debug::DebugInfo::new(config));
    let mut quit_signal = shutdown.subscribe();

    let session = if config.enable_overlay {
        let session = join_overlay(config, overlay).await?;
        let client = session.local_client()?;
        published.client.send_replace(Some(client.clone()));
        registry = diagnostics::mount(
            registry,
            client.clone(),
            metrics::init_metrics(),
            config.quit_endpoint.then(|| shutdown.clone()),
        );
        Some((session, client))
    } else {
        tracing::info!("Overlay surface disabled; serving loopback only");
        None
    };

    let (loopback_table, overlay_table) = registry.into_routers();
    let loopback_app = finish_router(loopback_table, LOOPBACK_SURFACE, read_timeout);
    let overlay_app = finish_router(overlay_table, OVERLAY_SURFACE, read_timeout);

    let (fatal_tx, mut fatal_rx) = mpsc::channel::<ServerError>(2);
    let mut overlay_handles = Vec::new();

    if let Some((session, client)) = session {
        let tls = overlay_tls_config(client)?;
        for (port, tls) in [(OverlayPort::Https, Some(tls)), (OverlayPort::Http, None)] {
            let handle = Handle::new();
            overlay_handles.push(handle.clone());
            tokio::spawn(serve_overlay(OverlayTask {
                session: session.clone(),
                port,
                tls,
                app: overlay_app.clone(),
                read_timeout,
                handle,
                fatal: fatal_tx.clone(),
                hostname: config.hostname.clone(),
            }));
        }
    }
    drop(fatal_tx);

    let loopback_listener = match loopback {
        LoopbackBinding::Listener(listener) => listener,
        LoopbackBinding::Address(address) => bind(&address).await?,
    };
    let local_addr: Option<SocketAddr> = loopback_listener.local_addr().ok();
    tracing::info!(
        address = ?local_addr,
        "Serving http://{}/ ...",
        local_addr.map_or_else(|| config.local_addr.clone(), |a| a.to_string())
    );

    published.state.send_replace(ServerState::Serving);
    let loopback_handle = Handle::new();
    let loopback_serve = serve_plain(
        loopback_listener,
        loopback_app,
        read_timeout,
        loopback_handle.clone(),
    );

    let outcome = wait_for_stop(&mut quit_signal, &mut fatal_rx, loopback_serve, shutdown).await;

    // Open connections end with their handle, not with the accept loop.
    loopback_handle.shutdown();
    for handle in &overlay_handles {
        handle.shutdown();
    }
    outcome
}

/// Wait for the first of a quit request, a background failure, or the end
/// of the loopback server.
async fn wait_for_stop(
    quit_signal: &mut ShutdownSignal,
    fatal_rx: &mut mpsc::Receiver<ServerError>,
    loopback_serve: impl std::future::Future<Output = std::io::Result<()>>,
    shutdown: &Shutdown,
) -> Result<ShutdownReason, ServerError> {
    tokio::select! {
        reason = quit_signal.recv() => Ok(reason),
        Some(err) = fatal_rx.recv() => Err(err),
        result = loopback_serve => match result {
            Ok(()) => Ok(shutdown.reason().unwrap_or(ShutdownReason::Requested)),
            Err(e) => Err(ServerError::Serve(e)),
        },
    }
}

async fn join_overlay(
    config: &GatewayConfig,
    overlay: &dyn Overlay,
) -> Result<Arc<dyn OverlaySession>, ServerError> {
    let auth_key = match &config.auth_key_path {
        Some(path) => Some(load_auth_key(path).await?),
        None => None,
    };

    let logger = if config.verbose {
        OverlayLogger::tracing()
    } else {
        OverlayLogger::discard()
    };

    tracing::info!(
        hostname = %config.hostname,
        auth_key = auth_key.is_some(),
        control_url = config.control_url.as_deref().unwrap_or("default"),
        "Joining overlay network"
    );

    let session = overlay
        .join(JoinOptions {
            hostname: config.hostname.clone(),
            auth_key,
            control_url: config.control_url.clone(),
            logger,
        })
        .await?;

    tracing::info!(hostname = %config.hostname, "Joined overlay network");
    Ok(session)
}

/// Wrap a surface's routes in the shared middleware stack.
fn finish_router(router: Router, surface: &'static str, read_timeout: Duration) -> Router {
    router
        .layer(middleware::from_fn_with_state(surface, metrics::track_requests))
        .layer(RequestBodyTimeoutLayer::new(read_timeout))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

struct OverlayTask {
    session: Arc<dyn OverlaySession>,
    port: OverlayPort,
    tls: Option<RustlsConfig>,
    app: Router,
    read_timeout: Duration,
    handle: Handle,
    fatal: mpsc::Sender<ServerError>,
    hostname: String,
}

async fn serve_overlay(task: OverlayTask) {
    let OverlayTask {
        session,
        port,
        tls,
        app,
        read_timeout,
        handle,
        fatal,
        hostname,
    } = task;

    let overlay_listener = match session.listen(port).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(port = %port, error = %e, "Failed to open overlay listener; port not served");
            return;
        }
    };

    tracing::info!(port = %port, "Serving {}://{}/ ...", port.scheme(), hostname);
    let result = match tls {
        Some(tls) => serve_tls(overlay_listener, app, tls, read_timeout, handle).await,
        None => serve_plain(overlay_listener, app, read_timeout, handle).await,
    };

    report_failure(port, result, &fatal).await;
}

/// Forward a failed overlay accept loop to the run loop.
async fn report_failure(
    port: OverlayPort,
    result: std::io::Result<()>,
    fatal: &mpsc::Sender<ServerError>,
) {
    if let Err(source) = result {
        tracing::error!(port = %port, error = %source, "Overlay listener failed");
        let _ = fatal
            .send(ServerError::Background {
                port: port.number(),
                source,
            })
            .await;
    }
}
