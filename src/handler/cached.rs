//! Handler that builds a responder per path once and reuses it.

use std::path::Path;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::handler::cache::BuildCache;
use crate::handler::Build;
use crate::observability::metrics;
use crate::routing::context::DispatchContext;
use crate::statics::Static;

/// Memoizing handler around a [`Build`] implementation.
pub struct Cached {
    builder: Arc<dyn Build>,
    cache: BuildCache,
}

impl Cached {
    pub fn new<B: Build + 'static>(builder: B) -> Self {
        Self::from_arc(Arc::new(builder))
    }

    pub fn from_arc(builder: Arc<dyn Build>) -> Self {
        Self {
            builder,
            cache: BuildCache::new(),
        }
    }

    pub fn cache(&self) -> &BuildCache {
        &self.cache
    }

    /// Answer with the object built for `path`, building it on first use.
    pub fn process<'a>(
        &'a self,
        router: &'a Static,
        ctx: DispatchContext,
        path: &'a Path,
    ) -> BoxFuture<'a, Response> {
        async move {
            if let Some(built) = self.cache.get(path) {
                metrics::record_cache_event("hit");
                return built.process(router, ctx).await;
            }

            if let Err(e) = router.fs().stat(path).await {
                tracing::debug!(path = %path.display(), error = %e, "Stat failed before build");
                return router.fail(&ctx, StatusCode::NOT_FOUND);
            }

            match self.cache.get_or_build(path, self.builder.clone()).await {
                Ok(built) => built.process(router, ctx).await,
                Err(err) => router.fail(&ctx, err),
            }
        }
        .boxed()
    }
}
