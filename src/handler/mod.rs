//! File handlers used by the static resolver.
//!
//! # Data Flow
//! ```text
//! Static resolves /site/docs/page.md
//!     → ext["md"] (Handler)
//!     → cached.rs: cache hit? reuse built object
//!                  miss? stat → build (one build in flight per path) → store
//!     → built object answers the request
//!
//! Static pre-filters:
//!     → dynamic.rs: path ends with "!"? evaluate a response manifest
//! ```
//!
//! # Design Decisions
//! - Handlers are a closed set (`Handler` enum)
//! - What a build produces is open (`Process` trait objects)
//! - Built objects live as long as the handler; failures are never stored

use std::path::Path;
use std::sync::Arc;

use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::routing::context::DispatchContext;
use crate::routing::error::RouteError;
use crate::statics::Static;

pub mod cache;
pub mod cached;
pub mod dynamic;
pub mod preload;

pub use cache::BuildCache;
pub use cached::Cached;
pub use dynamic::{Dynamic, Manifest, ManifestBuilder, ManifestError, DYNAMIC_SUFFIX};
pub use preload::{Buffered, PreloadBuilder};

/// A built, reusable responder for one resolved path.
pub trait Process: Send + Sync {
    fn process<'a>(&'a self, router: &'a Static, ctx: DispatchContext) -> BoxFuture<'a, Response>;
}

/// Outcome of a build, shared with every request that waited on it.
pub type BuildResult = Result<Arc<dyn Process>, RouteError>;

/// Turns a resolved file path into a [`Process`] object.
pub trait Build: Send + Sync {
    fn build<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, BuildResult>;
}

/// Extension handler.
pub enum Handler {
    Cached(Cached),
    Dynamic(Dynamic),
}

impl Handler {
    /// Answer a request for `path`, which the caller has resolved to a file.
    pub fn process<'a>(
        &'a self,
        router: &'a Static,
        ctx: DispatchContext,
        path: &'a Path,
    ) -> BoxFuture<'a, Response> {
        match self {
            Handler::Cached(cached) => cached.process(router, ctx, path),
            Handler::Dynamic(dynamic) => dynamic.process(router, ctx, path),
        }
    }
}

impl From<Cached> for Handler {
    fn from(h: Cached) -> Self {
        Handler::Cached(h)
    }
}

impl From<Dynamic> for Handler {
    fn from(h: Dynamic) -> Self {
        Handler::Dynamic(h)
    }
}
