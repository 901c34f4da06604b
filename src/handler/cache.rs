//! Memoization table for built handlers.
//!
//! # Responsibilities
//! - Store one built object per resolved path, forever
//! - Keep at most one build in flight per path
//! - Hand the in-flight outcome to every request that joined it
//!
//! # Design Decisions
//! - Shard-locked `DashMap`; no lock is held across an await
//! - Builds run as their own task and record their outcome, so the map is
//!   updated exactly once even if every waiting request goes away
//! - Failed builds are removed, so the next request retries

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;

use crate::handler::{Build, BuildResult, Process};
use crate::observability::metrics;
use crate::routing::error::RouteError;

type InFlight = Shared<BoxFuture<'static, BuildResult>>;

enum Slot {
    Ready(Arc<dyn Process>),
    Building(InFlight),
}

/// Per-path build cache shared by all requests.
#[derive(Clone, Default)]
pub struct BuildCache {
    slots: Arc<DashMap<PathBuf, Slot>>,
}

impl BuildCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built object for `path`, if a build already succeeded.
    pub fn get(&self, path: &Path) -> Option<Arc<dyn Process>> {
        match self.slots.get(path).as_deref() {
            Some(Slot::Ready(built)) => Some(built.clone()),
            _ => None,
        }
    }

    /// Return the stored object, join the running build, or start one.
    pub async fn get_or_build(&self, path: &Path, builder: Arc<dyn Build>) -> BuildResult {
        let pending = match self.slots.entry(path.to_path_buf()) {
            Entry::Occupied(entry) => match entry.get() {
                Slot::Ready(built) => return Ok(built.clone()),
                Slot::Building(pending) => {
                    tracing::debug!(path = %path.display(), "Joining in-flight build");
                    metrics::record_cache_event("join");
                    pending.clone()
                }
            },
            Entry::Vacant(entry) => {
                tracing::debug!(path = %path.display(), "Starting build");
                metrics::record_cache_event("build");
                let pending = self.start(path.to_path_buf(), builder);
                entry.insert(Slot::Building(pending.clone()));
                pending
            }
        };
        pending.await
    }

    fn start(&self, path: PathBuf, builder: Arc<dyn Build>) -> InFlight {
        let slots = self.slots.clone();
        let key = path.clone();
        let task = tokio::spawn(async move {
            let result = builder.build(&path).await;
            match &result {
                Ok(built) => {
                    slots.insert(path, Slot::Ready(built.clone()));
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "Build failed");
                    metrics::record_cache_event("failure");
                    slots.remove(&path);
                }
            }
            result
        });

        let slots = self.slots.clone();
        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(path = %key.display(), error = %e, "Build task died");
                    slots.remove(&key);
                    Err(RouteError::failure(e))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Number of paths with a stored or running build.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
