//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router whose fallback hands every request to the dispatch tree
//! - Wire up middleware (request ID, tracing, timeout)
//! - Serve on a listener until shutdown
//! - Record request metrics

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::response::Response;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::fs::{Filesystem, TokioFs};
use crate::http::request::{propagate_request_id_layer, request_span, set_request_id_layer, RequestIdExt};
use crate::observability::metrics;
use crate::response::CompressionPolicy;
use crate::routing::context::DispatchContext;
use crate::routing::router::Router as DispatchRouter;
use crate::site;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub root: Arc<DispatchRouter>,
    pub compression: CompressionPolicy,
}

/// HTTP front end for a dispatch tree.
pub struct HttpServer {
    router: axum::Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a server for the sites in `config`, reading from the local disk.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_filesystem(config, Arc::new(TokioFs))
    }

    pub fn with_filesystem(config: ServerConfig, fs: Arc<dyn Filesystem>) -> Self {
        let root = site::compile(&config, fs);
        Self::with_root(config, root)
    }

    /// Serve a hand-built router tree. `config.domains` is ignored.
    pub fn with_root(config: ServerConfig, root: DispatchRouter) -> Self {
        let state = AppState {
            root: Arc::new(root),
            compression: CompressionPolicy {
                enabled: config.compression.enabled,
                level: config.compression.level,
            },
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> axum::Router {
        axum::Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(request_span))
                    .layer(propagate_request_id_layer())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// The Axum app, for driving requests without a socket.
    pub fn router(&self) -> axum::Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            sites = self.config.domains.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Hands the request to the dispatch tree.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, _body) = request.into_parts();

    let ctx = DispatchContext::from_parts(&parts).with_compression(state.compression);
    tracing::debug!(
        request_id = parts.headers.request_id().unwrap_or("-"),
        method = %parts.method,
        host = %ctx.host,
        path = %ctx.path,
        "Dispatching request"
    );

    let response = state.root.dispatch(ctx).await;
    let status = response.status().as_u16();
    tracing::debug!(status, elapsed_ms = start.elapsed().as_millis() as u64, "Request completed");

    metrics::record_request(status, start);
    response
}
