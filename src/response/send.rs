//! Writing a response from a file or an in-memory payload.

use std::path::Path;

use async_compression::tokio::bufread::{GzipEncoder, ZlibEncoder};
use async_compression::Level;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use tokio::io::BufReader;
use tokio_util::io::ReaderStream;

use crate::fs::{ByteSource, Filesystem};
use crate::response::negotiate::Encoding;
use crate::routing::context::DispatchContext;
use crate::routing::error::RouteError;

/// Status, content type and extra headers for a response.
#[derive(Debug, Clone)]
pub struct Meta {
    pub status: StatusCode,
    /// Overrides the type guessed from the file name.
    pub mime: Option<String>,
    pub headers: HeaderMap,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            mime: None,
            headers: HeaderMap::new(),
        }
    }
}

/// An in-memory body.
#[derive(Debug, Clone)]
pub struct Payload {
    pub data: Bytes,
    pub meta: Meta,
}

impl Payload {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            meta: Meta::default(),
        }
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::new(body.into()).with_mime("text/plain; charset=utf-8")
    }

    pub fn html(body: impl Into<String>) -> Self {
        Self::new(body.into()).with_mime("text/html; charset=utf-8")
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.meta.mime = Some(mime.into());
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.meta.status = status;
        self
    }
}

/// Compression settings applied by the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionPolicy {
    pub enabled: bool,
    /// 1 (fast) to 9 (small).
    pub level: u32,
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            level: 6,
        }
    }
}

/// Stream a file, typed from its name.
pub async fn send_file(
    fs: &dyn Filesystem,
    ctx: &DispatchContext,
    path: &Path,
) -> Result<Response, RouteError> {
    send_file_with(fs, ctx, path, Meta::default()).await
}

/// Stream a file with explicit status, type or headers.
pub async fn send_file_with(
    fs: &dyn Filesystem,
    ctx: &DispatchContext,
    path: &Path,
    meta: Meta,
) -> Result<Response, RouteError> {
    let source = fs.open(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RouteError::Status(StatusCode::NOT_FOUND),
        std::io::ErrorKind::PermissionDenied => RouteError::Status(StatusCode::FORBIDDEN),
        _ => RouteError::from(e),
    })?;

    let mime = match &meta.mime {
        Some(m) => m.clone(),
        None => mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    };

    tracing::debug!(path = %path.display(), mime = %mime, "Streaming file");
    Ok(finish(ctx, meta, Some(&mime), source))
}

/// Send an in-memory payload.
pub fn send_data(ctx: &DispatchContext, payload: Payload) -> Response {
    let Payload { data, meta } = payload;
    let mime = meta.mime.clone();
    let source: ByteSource = Box::pin(std::io::Cursor::new(data));
    finish(ctx, meta, mime.as_deref(), source)
}

fn finish(ctx: &DispatchContext, meta: Meta, mime: Option<&str>, source: ByteSource) -> Response {
    let encoding = if ctx.compression.enabled {
        Encoding::negotiate(&ctx.headers)
    } else {
        Encoding::Identity
    };

    let mut response = Response::new(stream_body(source, encoding, ctx.compression.level));
    *response.status_mut() = meta.status;

    let headers = response.headers_mut();
    headers.extend(meta.headers);
    if let Some(mime) = mime {
        match HeaderValue::from_str(mime) {
            Ok(v) => {
                headers.insert(header::CONTENT_TYPE, v);
            }
            Err(_) => tracing::warn!(mime = %mime, "Unusable content type, omitting header"),
        }
    }
    if let Some(v) = encoding.header_value() {
        headers.insert(header::CONTENT_ENCODING, v);
    }
    if ctx.compression.enabled {
        headers.insert(header::VARY, HeaderValue::from_static("accept-encoding"));
    }

    response
}

fn stream_body(source: ByteSource, encoding: Encoding, level: u32) -> Body {
    let reader = BufReader::new(source);
    let level = Level::Precise(level.clamp(1, 9) as i32);
    match encoding {
        Encoding::Gzip => Body::from_stream(ReaderStream::new(GzipEncoder::with_quality(reader, level))),
        Encoding::Deflate => Body::from_stream(ReaderStream::new(ZlibEncoder::with_quality(reader, level))),
        Encoding::Identity => Body::from_stream(ReaderStream::new(reader)),
    }
}
