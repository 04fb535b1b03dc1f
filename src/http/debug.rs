//! Debug page bundle for the overlay surface.

use std::time::Instant;

use axum::{
    extract::State,
    response::Html,
    routing::get,
    Json,
};
use serde_json::{json, Value};

use crate::config::GatewayConfig;
use crate::http::diagnostics::escape_html;
use crate::routing::RouteRegistry;

/// Pages listed on the debug index.
const PAGES: &[(&str, &str)] = &[
    ("/debug/vars", "process variables (JSON)"),
    ("/metrics", "Prometheus metrics"),
];

/// Static facts exposed by the debug pages.
#[derive(Debug, Clone)]
pub struct DebugInfo {
    hostname: String,
    overlay_enabled: bool,
    started: Instant,
}

impl DebugInfo {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            hostname: config.hostname.clone(),
            overlay_enabled: config.enable_overlay,
            started: Instant::now(),
        }
    }
}

/// Mount `/debug`, `/debug/` and `/debug/vars` on the overlay table.
pub fn mount(registry: RouteRegistry, info: DebugInfo) -> RouteRegistry {
    registry
        .overlay_only("/debug", get(index).with_state(info.clone()))
        .overlay_only("/debug/", get(index).with_state(info.clone()))
        .overlay_only("/debug/vars", get(vars).with_state(info))
}

async fn index(State(info): State<DebugInfo>) -> Html<String> {
    let mut page = format!(
        "<html><body><h1>{} debug</h1>\n<ul>\n",
        escape_html(&info.hostname)
    );
    for (path, title) in PAGES {
        page.push_str(&format!("<li><a href=\"{path}\">{path}</a> {title}</li>\n"));
    }
    page.push_str("</ul></body></html>");
    Html(page)
}

async fn vars(State(info): State<DebugInfo>) -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "hostname": info.hostname,
        "uptime_secs": info.started.elapsed().as_secs(),
        "overlay_enabled": info.overlay_enabled,
    }))
}
