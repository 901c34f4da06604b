//! Filesystem access used by the static resolver and handlers.
//!
//! # Responsibilities
//! - Classify a path (directory, regular file, other)
//! - List directory entries
//! - Open a file as an async byte stream
//!
//! # Design Decisions
//! - Narrow trait so tests can record or fake every lookup
//! - Directory entries come back in whatever order the OS yields them

use std::io;
use std::path::Path;
use std::pin::Pin;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::io::AsyncRead;

/// Readable body source.
pub type ByteSource = Pin<Box<dyn AsyncRead + Send>>;

/// What a path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    File,
    Other,
}

/// File I/O the dispatch core depends on.
pub trait Filesystem: Send + Sync {
    fn stat<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<FileKind>>;

    /// Entry names, unsorted.
    fn read_dir<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<Vec<String>>>;

    fn open<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<ByteSource>>;
}

/// `tokio::fs` backed implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFs;

impl Filesystem for TokioFs {
    fn stat<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<FileKind>> {
        async move {
            let meta = tokio::fs::metadata(path).await?;
            Ok(if meta.is_dir() {
                FileKind::Directory
            } else if meta.is_file() {
                FileKind::File
            } else {
                FileKind::Other
            })
        }
        .boxed()
    }

    fn read_dir<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<Vec<String>>> {
        async move {
            let mut dir = tokio::fs::read_dir(path).await?;
            let mut names = Vec::new();
            while let Some(entry) = dir.next_entry().await? {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
            Ok(names)
        }
        .boxed()
    }

    fn open<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<ByteSource>> {
        async move {
            let file = tokio::fs::File::open(path).await?;
            Ok(Box::pin(file) as ByteSource)
        }
        .boxed()
    }
}
