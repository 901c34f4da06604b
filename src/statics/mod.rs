//! Static file router.
//!
//! # Data Flow
//! ```text
//! DispatchContext.path
//!     → join(base, normalize(path))
//!     → pre-filters (Routers, Dynamic); any may answer
//!     → hidden segment check (403, no disk access)
//!     → stat
//!         directory → first "index.*" entry, else listing
//!         file      → ext[extension] / ext["*"] / stream raw
//!         other     → 404
//! ```
//!
//! # Design Decisions
//! - Hidden-segment check is lexical and only looks below `base`
//! - Index precedence follows directory listing order, which the OS decides
//! - Every failure goes through this router's error callback

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::fs::{FileKind, Filesystem, TokioFs};
use crate::handler::{Dynamic, Handler};
use crate::response::send_file;
use crate::routing::context::{DispatchContext, Next};
use crate::routing::error::{default_error, ErrorHandler, RouteError};
use crate::routing::path::normalize;
use crate::routing::router::Router;

pub mod listing;

pub use listing::{default_listing, ListFn};

/// Key in the extension map matching any extension.
pub const ANY_EXTENSION: &str = "*";

/// A step run before static resolution.
pub enum Filter {
    Router(Router),
    Dynamic(Dynamic),
}

impl From<Router> for Filter {
    fn from(r: Router) -> Self {
        Filter::Router(r)
    }
}

impl From<Dynamic> for Filter {
    fn from(d: Dynamic) -> Self {
        Filter::Dynamic(d)
    }
}

/// Serves files under `base`.
pub struct Static {
    base: PathBuf,
    handlers: Vec<Filter>,
    ext: HashMap<String, Handler>,
    listing: Option<ListFn>,
    error: ErrorHandler,
    all: bool,
    fs: Arc<dyn Filesystem>,
}

impl Static {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            handlers: Vec::new(),
            ext: HashMap::new(),
            listing: Some(default_listing()),
            error: default_error(true),
            all: false,
            fs: Arc::new(TokioFs),
        }
    }

    /// Append a pre-filter.
    pub fn handler(mut self, filter: impl Into<Filter>) -> Self {
        self.handlers.push(filter.into());
        self
    }

    /// Handle files with extension `ext` (no dot; `"*"` for any).
    pub fn ext(mut self, ext: impl Into<String>, handler: impl Into<Handler>) -> Self {
        self.ext.insert(ext.into(), handler.into());
        self
    }

    pub fn listing(mut self, listing: ListFn) -> Self {
        self.listing = Some(listing);
        self
    }

    /// Answer 404 for directories without an index file.
    pub fn without_listing(mut self) -> Self {
        self.listing = None;
        self
    }

    pub fn error(mut self, error: ErrorHandler) -> Self {
        self.error = error;
        self
    }

    /// Allow hidden path segments.
    pub fn all(mut self, all: bool) -> Self {
        self.all = all;
        self
    }

    pub fn filesystem(mut self, fs: Arc<dyn Filesystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Whether hidden path segments may be served.
    pub fn serves_hidden(&self) -> bool {
        self.all
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn fs(&self) -> &dyn Filesystem {
        self.fs.as_ref()
    }

    /// Report an error through this router's callback.
    pub fn fail(&self, ctx: &DispatchContext, err: impl Into<RouteError>) -> Response {
        (self.error)(ctx, err.into())
    }

    /// Filesystem path for a request path, never outside `base`.
    pub fn resolve(&self, request_path: &str) -> PathBuf {
        let normalized = normalize(request_path);
        let relative = normalized.trim_start_matches('/');
        if relative.is_empty() {
            self.base.clone()
        } else {
            self.base.join(relative)
        }
    }

    pub async fn route<'a>(&'a self, root: &'a Router, ctx: DispatchContext, _next: Next<'a>) -> Response {
        let resolved = self.resolve(&ctx.path);
        let hidden = has_hidden_segment(&ctx.path);

        let target = resolved.clone();
        let resolve = Next::new(move |ctx| self.resolve_on_disk(ctx, target, hidden).boxed());
        self.filter_step(&self.handlers, root, ctx, resolved, resolve).await
    }

    fn filter_step<'a>(
        &'a self,
        filters: &'a [Filter],
        root: &'a Router,
        ctx: DispatchContext,
        resolved: PathBuf,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        let Some((first, rest)) = filters.split_first() else {
            return next.run(ctx);
        };
        let target = resolved.clone();
        let cont = Next::new(move |ctx| self.filter_step(rest, root, ctx, target, next));
        match first {
            Filter::Router(router) => router.route(root, ctx, cont),
            Filter::Dynamic(dynamic) => dynamic.route(self, ctx, resolved, cont),
        }
    }

    async fn resolve_on_disk(&self, ctx: DispatchContext, resolved: PathBuf, hidden: bool) -> Response {
        if hidden && !self.all {
            tracing::debug!(path = %ctx.path, "Hidden path rejected");
            return self.fail(&ctx, StatusCode::FORBIDDEN);
        }

        let kind = match self.fs.stat(&resolved).await {
            Ok(kind) => kind,
            Err(e) => {
                tracing::debug!(path = %resolved.display(), error = %e, "Stat failed");
                return self.fail(&ctx, StatusCode::NOT_FOUND);
            }
        };

        match kind {
            FileKind::Directory => self.serve_directory(ctx, &resolved).await,
            FileKind::File => self.serve_file(ctx, &resolved).await,
            FileKind::Other => self.fail(&ctx, StatusCode::NOT_FOUND),
        }
    }

    async fn serve_directory(&self, ctx: DispatchContext, dir: &Path) -> Response {
        let entries = match self.fs.read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return self.fail(&ctx, StatusCode::FORBIDDEN);
            }
            Err(e) => return self.fail(&ctx, e),
        };

        if let Some(index) = entries.iter().find(|name| is_index(name)) {
            tracing::debug!(dir = %dir.display(), index = %index, "Serving index file");
            return match send_file(self.fs(), &ctx, &dir.join(index)).await {
                Ok(res) => res,
                Err(err) => self.fail(&ctx, err),
            };
        }

        match &self.listing {
            Some(render) => render(&ctx, dir, &entries),
            None => self.fail(&ctx, StatusCode::NOT_FOUND),
        }
    }

    async fn serve_file(&self, ctx: DispatchContext, file: &Path) -> Response {
        let handler = file
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| self.ext.get(e))
            .or_else(|| self.ext.get(ANY_EXTENSION));

        if let Some(handler) = handler {
            return handler.process(self, ctx, file).await;
        }

        match send_file(self.fs(), &ctx, file).await {
            Ok(res) => res,
            Err(err) => self.fail(&ctx, err),
        }
    }
}

fn is_index(name: &str) -> bool {
    name.len() > "index.".len() && name.starts_with("index.")
}

/// True if any segment of a normalized request path starts with `.`.
pub fn has_hidden_segment(path: &str) -> bool {
    path.split('/').any(|segment| segment.starts_with('.'))
}
