//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use axum::http::{header, HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::Response;
use futures_util::future::BoxFuture;
use tempfile::TempDir;

use vhost_dispatch::fs::{ByteSource, FileKind, Filesystem, TokioFs};
use vhost_dispatch::routing::DispatchContext;

/// A directory tree on disk, removed on drop.
pub struct Site {
    pub dir: TempDir,
}

impl Site {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `relative`, creating parent directories.
    pub fn file(&self, relative: &str, contents: &str) -> &Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
        self
    }

    pub fn mkdir(&self, relative: &str) -> &Self {
        std::fs::create_dir_all(self.dir.path().join(relative)).unwrap();
        self
    }
}

/// Filesystem that records every path it is asked about.
#[derive(Default)]
pub struct RecordingFs {
    inner: TokioFs,
    stats: Mutex<Vec<PathBuf>>,
    opens: Mutex<Vec<PathBuf>>,
}

impl RecordingFs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stats(&self) -> Vec<PathBuf> {
        self.stats.lock().unwrap().clone()
    }

    pub fn opens(&self) -> Vec<PathBuf> {
        self.opens.lock().unwrap().clone()
    }
}

impl Filesystem for RecordingFs {
    fn stat<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<FileKind>> {
        self.stats.lock().unwrap().push(path.to_path_buf());
        self.inner.stat(path)
    }

    fn read_dir<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<Vec<String>>> {
        self.inner.read_dir(path)
    }

    fn open<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<ByteSource>> {
        self.opens.lock().unwrap().push(path.to_path_buf());
        self.inner.open(path)
    }
}

/// Context for `GET uri` on `host`.
pub fn request(host: &str, uri: &str) -> DispatchContext {
    DispatchContext::new(host, uri.parse::<Uri>().unwrap())
}

/// Same, offering `encoding` in `Accept-Encoding`.
pub fn request_accepting(host: &str, uri: &str, encoding: &str) -> DispatchContext {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_str(encoding).unwrap());
    request(host, uri).with_headers(headers)
}

pub async fn read(res: Response) -> (StatusCode, HeaderMap, Vec<u8>) {
    let status = res.status();
    let headers = res.headers().clone();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

pub async fn text(res: Response) -> (StatusCode, String) {
    let (status, _, body) = read(res).await;
    (status, String::from_utf8(body).unwrap())
}
