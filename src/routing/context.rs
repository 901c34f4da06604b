//! Per-request dispatch state and the continuation type.
//!
//! # Responsibilities
//! - Capture what routers need from the request (host, path, headers)
//! - Track how many host labels nested routers have consumed
//! - Provide `Next`, the move-only continuation handed to every router
//!
//! # Design Decisions
//! - `Next` is consumed by `run`, so a router cannot forward twice
//! - Headers are shared behind an `Arc`; cloning a context is cheap

use std::sync::Arc;

use axum::http::{request::Parts, HeaderMap, Method, Uri};
use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::response::CompressionPolicy;
use crate::routing::host::subdomain_labels;
use crate::routing::path::normalize;

/// State threaded through one dispatch.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    /// Lowercased host without port.
    pub host: String,
    /// Normalized request path, always starting with `/`.
    pub path: String,
    /// Number of subdomain labels already consumed.
    pub depth: usize,
    /// Original request URI, used in error bodies and listings.
    pub uri: Uri,
    pub method: Method,
    pub headers: Arc<HeaderMap>,
    pub compression: CompressionPolicy,
}

impl DispatchContext {
    /// Build a context from the request head.
    ///
    /// The host comes from the `Host` header, falling back to the URI authority
    /// (HTTP/2 requests carry it there).
    pub fn from_parts(parts: &Parts) -> Self {
        let host = parts
            .headers
            .get(axum::http::header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.host().map(str::to_string))
            .unwrap_or_default();

        Self::new(host, parts.uri.clone())
            .with_method(parts.method.clone())
            .with_headers(parts.headers.clone())
    }

    /// Build a context for `host` and a raw request URI.
    pub fn new(host: impl AsRef<str>, uri: Uri) -> Self {
        let path = normalize(uri.path());
        Self {
            host: clean_host(host.as_ref()),
            path,
            depth: 0,
            uri,
            method: Method::GET,
            headers: Arc::new(HeaderMap::new()),
            compression: CompressionPolicy::default(),
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Arc::new(headers);
        self
    }

    pub fn with_compression(mut self, compression: CompressionPolicy) -> Self {
        self.compression = compression;
        self
    }

    /// Subdomain label at `depth`, or `""` past the last one.
    pub fn label(&self, depth: usize) -> &str {
        subdomain_labels(&self.host).nth(depth).unwrap_or("")
    }

    /// Copy of this context one label deeper.
    pub fn descend(&self) -> Self {
        let mut next = self.clone();
        next.depth += 1;
        next
    }
}

fn clean_host(raw: &str) -> String {
    let raw = raw.trim();
    // Bracketed IPv6 literal, possibly with a port.
    let host = if let Some(rest) = raw.strip_prefix('[') {
        rest.split(']').next().unwrap_or("")
    } else if raw.matches(':').count() == 1 {
        raw.split(':').next().unwrap_or("")
    } else {
        raw
    };
    host.trim_end_matches('.').to_ascii_lowercase()
}

type Continuation<'a> = Box<dyn FnOnce(DispatchContext) -> BoxFuture<'a, Response> + Send + 'a>;

/// The rest of the chain after the current router.
///
/// A router either produces a response itself, reports an error to its error
/// callback, or hands the context to `run`. Nothing else typechecks.
pub struct Next<'a> {
    inner: Continuation<'a>,
}

impl<'a> Next<'a> {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(DispatchContext) -> BoxFuture<'a, Response> + Send + 'a,
    {
        Self { inner: Box::new(f) }
    }

    /// Pass control to the next router.
    pub fn run(self, ctx: DispatchContext) -> BoxFuture<'a, Response> {
        (self.inner)(ctx)
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Next")
    }
}
