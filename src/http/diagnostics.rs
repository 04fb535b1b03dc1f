//! Built-in overlay endpoints.
//!
//! # Responsibilities
//! - `/who`: identity page for the calling overlay peer
//! - `/metrics`: Prometheus exposition
//! - `/quitquitquit`: request process termination
//!
//! # Design Decisions
//! - Mounted on the overlay table only, after user routes
//! - `/who` reports resolution failures verbatim with a 500

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{any, get, MethodRouter},
};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::lifecycle::{Shutdown, ShutdownReason};
use crate::overlay::{LocalClient, WhoIs};
use crate::routing::RouteRegistry;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Mount the overlay diagnostics. `quit` is `None` when `/quitquitquit` is disabled.
pub fn mount(
    registry: RouteRegistry,
    client: Arc<dyn LocalClient>,
    metrics: PrometheusHandle,
    quit: Option<Shutdown>,
) -> RouteRegistry {
    let registry = registry
        .overlay_only("/metrics", metrics_route(metrics))
        .overlay_only("/who", who_route(client));
    match quit {
        Some(shutdown) => registry.overlay_only("/quitquitquit", quit_route(shutdown)),
        None => registry,
    }
}

pub fn who_route(client: Arc<dyn LocalClient>) -> MethodRouter {
    get(who).with_state(client)
}

pub fn metrics_route(handle: PrometheusHandle) -> MethodRouter {
    get(render_metrics).with_state(handle)
}

pub fn quit_route(shutdown: Shutdown) -> MethodRouter {
    any(quit).with_state(shutdown)
}

async fn who(
    State(client): State<Arc<dyn LocalClient>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
) -> Response {
    let remote_addr = remote.to_string();
    match client.who_is(&remote_addr).await {
        Ok(who) => Html(render_who(&who, &remote_addr)).into_response(),
        Err(e) => {
            tracing::debug!(remote = %remote_addr, error = %e, "Identity lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], handle.render())
}

async fn quit(State(shutdown): State<Shutdown>) -> StatusCode {
    tracing::warn!("Quit requested over the overlay network");
    shutdown.trigger(ShutdownReason::QuitRequested);
    StatusCode::OK
}

/// HTML body of `/who`. The remote address is trusted transport data and left as is.
pub fn render_who(who: &WhoIs, remote_addr: &str) -> String {
    format!(
        "<html><body><h1>Hello, world!</h1>\n<p>You are <b>{}</b> from <b>{}</b> ({})</p>",
        escape_html(&who.user.login_name),
        escape_html(first_label(&who.node.computed_name)),
        remote_addr
    )
}

/// First DNS label of a name.
pub fn first_label(name: &str) -> &str {
    name.split_once('.').map_or(name, |(label, _)| label)
}

/// Escape the five HTML-significant characters.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&#34;"),
            _ => out.push(c),
        }
    }
    out
}
