//! Dynamic resources: paths ending in `!`.
//!
//! A dynamic resource is a response manifest, a small TOML document evaluated
//! when the path is first requested:
//!
//! ```toml
//! status = 200
//! content_type = "application/json"
//! body = '{"ok": true}'      # or: file = "payload.json"
//!
//! [headers]
//! cache-control = "no-store"
//! ```
//!
//! `file` is resolved next to the manifest and may not leave its directory.
//!
//! Dynamic runs as a pre-filter, ahead of the static router's hidden-segment
//! check, so it applies the same rule itself: unless the router serves hidden
//! paths, a hidden manifest path or a hidden `file` target answers 403.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::Deserialize;
use tokio::io::AsyncReadExt;

use crate::fs::Filesystem;
use crate::handler::cached::Cached;
use crate::handler::{Build, BuildResult, Process};
use crate::response::{send_data, send_file_with, Meta, Payload};
use crate::routing::context::{DispatchContext, Next};
use crate::routing::error::RouteError;
use crate::statics::{has_hidden_segment, Static};

/// Marker that opts a path into dynamic evaluation.
pub const DYNAMIC_SUFFIX: char = '!';

/// Errors while evaluating a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid manifest: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid status code {0}")]
    Status(u16),
    #[error("invalid header {0:?}")]
    Header(String),
    #[error("manifest sets both `body` and `file`")]
    BodyAndFile,
    #[error("manifest file {0:?} leaves the manifest directory")]
    FileOutsideDir(PathBuf),
}

/// On-disk shape of a response manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default = "default_status")]
    pub status: u16,
    pub content_type: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub file: Option<PathBuf>,
}

fn default_status() -> u16 {
    200
}

impl Manifest {
    /// Validate the manifest found at `location` into a responder.
    pub fn compile(self, location: &Path) -> Result<ManifestResponse, ManifestError> {
        let status = StatusCode::from_u16(self.status).map_err(|_| ManifestError::Status(self.status))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|_| ManifestError::Header(name.clone()))?;
            let header_value = HeaderValue::from_str(value).map_err(|_| ManifestError::Header(name.clone()))?;
            headers.insert(header_name, header_value);
        }

        let body = match (self.body, self.file) {
            (Some(_), Some(_)) => return Err(ManifestError::BodyAndFile),
            (Some(text), None) => ManifestBody::Inline(Bytes::from(text)),
            (None, Some(file)) => {
                let escapes = file
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
                if escapes {
                    return Err(ManifestError::FileOutsideDir(file));
                }
                let dir = location.parent().unwrap_or_else(|| Path::new("/"));
                ManifestBody::File(dir.join(file))
            }
            (None, None) => ManifestBody::Inline(Bytes::new()),
        };

        Ok(ManifestResponse {
            meta: Meta {
                status,
                mime: self.content_type,
                headers,
            },
            body,
        })
    }
}

#[derive(Debug, Clone)]
enum ManifestBody {
    Inline(Bytes),
    File(PathBuf),
}

/// Responder compiled from a manifest.
#[derive(Debug, Clone)]
pub struct ManifestResponse {
    meta: Meta,
    body: ManifestBody,
}

impl Process for ManifestResponse {
    fn process<'a>(&'a self, router: &'a Static, ctx: DispatchContext) -> BoxFuture<'a, Response> {
        async move {
            match &self.body {
                ManifestBody::Inline(data) => send_data(
                    &ctx,
                    Payload {
                        data: data.clone(),
                        meta: self.meta.clone(),
                    },
                ),
                ManifestBody::File(path) => {
                    if !router.serves_hidden() && hidden_below(router.base(), path) {
                        return router.fail(&ctx, StatusCode::FORBIDDEN);
                    }
                    match send_file_with(router.fs(), &ctx, path, self.meta.clone()).await {
                        Ok(res) => res,
                        Err(err) => router.fail(&ctx, err),
                    }
                }
            }
        }
        .boxed()
    }
}

fn hidden_below(base: &Path, path: &Path) -> bool {
    path.strip_prefix(base)
        .map(|rel| {
            rel.components()
                .any(|c| matches!(c, Component::Normal(s) if s.to_string_lossy().starts_with('.')))
        })
        .unwrap_or(false)
}

/// Reads and compiles a manifest from disk on every call.
pub struct ManifestBuilder {
    fs: Arc<dyn Filesystem>,
}

impl ManifestBuilder {
    pub fn new(fs: Arc<dyn Filesystem>) -> Self {
        Self { fs }
    }

    async fn load(&self, path: &Path) -> Result<ManifestResponse, ManifestError> {
        let mut source = self.fs.open(path).await?;
        let mut text = String::new();
        source.read_to_string(&mut text).await?;
        let manifest: Manifest = toml::from_str(&text)?;
        manifest.compile(path)
    }
}

impl Build for ManifestBuilder {
    fn build<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, BuildResult> {
        async move {
            tracing::info!(path = %path.display(), "Evaluating dynamic resource");
            match self.load(path).await {
                Ok(response) => Ok(Arc::new(response) as Arc<dyn Process>),
                Err(err) => Err(RouteError::failure(err)),
            }
        }
        .boxed()
    }
}

/// Pre-filter that intercepts `!` paths and serves them through a build cache.
pub struct Dynamic {
    inner: Cached,
}

impl Dynamic {
    /// Dynamic handler evaluating response manifests.
    pub fn new(fs: Arc<dyn Filesystem>) -> Self {
        Self::with_builder(ManifestBuilder::new(fs))
    }

    pub fn with_builder<B: Build + 'static>(builder: B) -> Self {
        Self {
            inner: Cached::new(builder),
        }
    }

    pub fn cached(&self) -> &Cached {
        &self.inner
    }

    pub fn is_dynamic(path: &Path) -> bool {
        path.as_os_str()
            .to_str()
            .map(|p| p.ends_with(DYNAMIC_SUFFIX))
            .unwrap_or(false)
    }

    /// Serve `path` when it carries the dynamic marker, otherwise pass it on.
    pub fn route<'a>(
        &'a self,
        router: &'a Static,
        ctx: DispatchContext,
        path: PathBuf,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        if !Self::is_dynamic(&path) {
            return next.run(ctx);
        }
        if !router.serves_hidden() && has_hidden_segment(&ctx.path) {
            tracing::debug!(path = %ctx.path, "Hidden dynamic resource rejected");
            return futures_util::future::ready(router.fail(&ctx, StatusCode::FORBIDDEN)).boxed();
        }
        async move { self.inner.process(router, ctx, &path).await }.boxed()
    }

    pub fn process<'a>(
        &'a self,
        router: &'a Static,
        ctx: DispatchContext,
        path: &'a Path,
    ) -> BoxFuture<'a, Response> {
        self.inner.process(router, ctx, path)
    }
}
