//! Route registration for both surfaces.
//!
//! # Responsibilities
//! - Collect (pattern → handler) bindings before start
//! - Keep the loopback and overlay tables separate
//! - Materialise each table as an axum `Router`
//!
//! # Design Decisions
//! - Keyed by pattern: registering a pattern again replaces the handler
//! - The registry is moved into the server, so nothing registers after start
//! - Invalid patterns panic; they are programming errors

use std::collections::BTreeMap;

use axum::routing::MethodRouter;
use axum::Router;

/// A routing table keyed by pattern.
#[derive(Default, Clone)]
struct RouteTable {
    routes: BTreeMap<String, MethodRouter>,
}

impl RouteTable {
    fn insert(&mut self, pattern: &str, handler: MethodRouter) {
        self.routes.insert(pattern.to_string(), handler);
    }

    fn contains(&self, pattern: &str) -> bool {
        self.routes.contains_key(pattern)
    }

    fn into_router(self) -> Router {
        self.routes
            .into_iter()
            .fold(Router::new(), |router, (pattern, handler)| {
                router.route(&pattern, handler)
            })
    }
}

/// Handler bindings for the loopback and overlay surfaces.
#[derive(Default, Clone)]
pub struct RouteRegistry {
    loopback: RouteTable,
    overlay: RouteTable,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` on both the loopback and the overlay surface.
    ///
    /// # Panics
    /// If `pattern` does not start with `/`.
    pub fn public(mut self, pattern: &str, handler: MethodRouter) -> Self {
        check_pattern(pattern);
        self.loopback.insert(pattern, handler.clone());
        self.overlay.insert(pattern, handler);
        self
    }

    /// Bind `handler` on the overlay surface only.
    ///
    /// # Panics
    /// If `pattern` does not start with `/`.
    pub fn overlay_only(mut self, pattern: &str, handler: MethodRouter) -> Self {
        check_pattern(pattern);
        self.overlay.insert(pattern, handler);
        self
    }

    pub fn serves_on_loopback(&self, pattern: &str) -> bool {
        self.loopback.contains(pattern)
    }

    pub fn serves_on_overlay(&self, pattern: &str) -> bool {
        self.overlay.contains(pattern)
    }

    /// Turn the registry into the (loopback, overlay) routers.
    pub(crate) fn into_routers(self) -> (Router, Router) {
        (self.loopback.into_router(), self.overlay.into_router())
    }
}

fn check_pattern(pattern: &str) {
    assert!(
        pattern.starts_with('/'),
        "route pattern {pattern:?} must start with '/'"
    );
}
