//! Host-label routers: `Domain` at the dispatch root, `Subdomain` below it.
//!
//! # Responsibilities
//! - Split the host into subdomain labels
//! - Select a child router by label, falling back to the `"*"` wildcard
//!
//! # Design Decisions
//! - Labels are read left to right: in `a.b.example.com` index 0 is `a`
//! - The top two labels (registrable domain) are never routed on
//! - IP literals have no subdomain labels

use std::collections::HashMap;
use std::net::IpAddr;

use axum::http::StatusCode;
use axum::response::Response;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::routing::context::{DispatchContext, Next};
use crate::routing::error::{default_error, ErrorHandler, RouteError};
use crate::routing::router::Router;

/// Key matching any label without its own entry.
pub const WILDCARD: &str = "*";

/// Subdomain labels of `host`, leftmost first.
pub fn subdomain_labels(host: &str) -> impl Iterator<Item = &str> {
    let labels: Vec<&str> = if host.is_empty() || host.parse::<IpAddr>().is_ok() {
        Vec::new()
    } else {
        host.split('.').collect()
    };
    let keep = labels.len().saturating_sub(2);
    labels.into_iter().take(keep)
}

fn select<'r>(children: &'r HashMap<String, Router>, label: &str) -> Option<&'r Router> {
    children.get(label).or_else(|| children.get(WILDCARD))
}

/// Dispatch root keyed by the leftmost subdomain label.
pub struct Domain {
    children: HashMap<String, Router>,
    error: ErrorHandler,
}

impl Domain {
    pub fn new(children: HashMap<String, Router>) -> Self {
        Self {
            children,
            error: default_error(true),
        }
    }

    pub fn with_error(mut self, error: ErrorHandler) -> Self {
        self.error = error;
        self
    }

    /// Report an error through this domain's callback.
    pub fn fail(&self, ctx: &DispatchContext, err: impl Into<RouteError>) -> Response {
        (self.error)(ctx, err.into())
    }

    /// Route a request. A chain that falls off the end answers 404.
    pub fn route<'a>(&'a self, root: &'a Router, ctx: DispatchContext) -> BoxFuture<'a, Response> {
        let label = ctx.label(0).to_string();
        let Some(child) = select(&self.children, &label) else {
            tracing::debug!(host = %ctx.host, label = %label, "No site for host");
            return futures_util::future::ready(self.fail(&ctx, StatusCode::NOT_FOUND)).boxed();
        };

        tracing::trace!(host = %ctx.host, label = %label, "Domain matched");
        let mut inner = ctx;
        inner.depth = 1;
        let end = Next::new(move |ctx: DispatchContext| {
            futures_util::future::ready(self.fail(&ctx, StatusCode::NOT_FOUND)).boxed()
        });
        child.route(root, inner, end)
    }
}

/// Switchboard for one level of nested subdomains.
pub struct Subdomain {
    children: HashMap<String, Router>,
}

impl Subdomain {
    pub fn new(children: HashMap<String, Router>) -> Self {
        Self { children }
    }

    pub fn route<'a>(
        &'a self,
        root: &'a Router,
        ctx: DispatchContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        match select(&self.children, ctx.label(ctx.depth)) {
            Some(child) => {
                let inner = ctx.descend();
                child.route(root, inner, next)
            }
            None => next.run(ctx),
        }
    }
}
