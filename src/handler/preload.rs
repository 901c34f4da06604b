//! Builder that reads a file into memory once.
//!
//! Paired with `Cached`, later requests are answered from the buffer without
//! touching the disk. Changes to the file are not picked up until restart.

use std::path::Path;
use std::sync::Arc;

use axum::response::Response;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::io::AsyncReadExt;

use crate::fs::Filesystem;
use crate::handler::{Build, BuildResult, Process};
use crate::response::{send_data, Payload};
use crate::routing::context::DispatchContext;
use crate::routing::error::RouteError;
use crate::statics::Static;

/// A file's contents and type, held in memory.
#[derive(Debug, Clone)]
pub struct Buffered {
    data: Bytes,
    mime: String,
}

impl Buffered {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Process for Buffered {
    fn process<'a>(&'a self, _router: &'a Static, ctx: DispatchContext) -> BoxFuture<'a, Response> {
        let payload = Payload::new(self.data.clone()).with_mime(self.mime.clone());
        futures_util::future::ready(send_data(&ctx, payload)).boxed()
    }
}

pub struct PreloadBuilder {
    fs: Arc<dyn Filesystem>,
}

impl PreloadBuilder {
    pub fn new(fs: Arc<dyn Filesystem>) -> Self {
        Self { fs }
    }
}

impl Build for PreloadBuilder {
    fn build<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, BuildResult> {
        async move {
            let mut source = self.fs.open(path).await.map_err(RouteError::from)?;
            let mut data = Vec::new();
            source.read_to_end(&mut data).await.map_err(RouteError::from)?;

            let mime = mime_guess::from_path(path).first_or_octet_stream().essence_str().to_string();
            tracing::debug!(path = %path.display(), bytes = data.len(), "Preloaded file");

            Ok(Arc::new(Buffered {
                data: Bytes::from(data),
                mime,
            }) as Arc<dyn Process>)
        }
        .boxed()
    }
}
