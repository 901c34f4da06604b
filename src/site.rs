//! Compiles the `domains` table into a router tree.
//!
//! # Data Flow
//! ```text
//! ServerConfig.domains
//!     → Domain { label → site }
//!         site without subdomains → Static(root)
//!         site with subdomains    → Subdomain { child → site, "" → Static(root) }
//! ```
//!
//! The tree is built once at startup and shared behind an `Arc`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use crate::config::{ServerConfig, SiteConfig};
use crate::fs::Filesystem;
use crate::handler::{Cached, Dynamic, PreloadBuilder};
use crate::routing::error::{default_error, ErrorHandler};
use crate::routing::host::{Domain, Subdomain};
use crate::routing::router::Router;
use crate::statics::Static;

/// Build the dispatch root for `config`.
pub fn compile(config: &ServerConfig, fs: Arc<dyn Filesystem>) -> Router {
    let error = default_error(config.errors.expose_details);
    let children = compile_children(&config.domains, &fs, &error);
    tracing::info!(sites = children.len(), "Compiled site tree");
    Domain::new(children).with_error(error).into()
}

fn compile_children(
    sites: &BTreeMap<String, SiteConfig>,
    fs: &Arc<dyn Filesystem>,
    error: &ErrorHandler,
) -> HashMap<String, Router> {
    sites
        .iter()
        .map(|(label, site)| (label.clone(), compile_site(site, fs, error)))
        .collect()
}

fn compile_site(site: &SiteConfig, fs: &Arc<dyn Filesystem>, error: &ErrorHandler) -> Router {
    let root = site.root.as_deref().map(|root| compile_static(root, site, fs, error));
    if site.subdomains.is_empty() {
        if let Some(root) = root {
            return root;
        }
    }

    let mut children = compile_children(&site.subdomains, fs, error);
    if let Some(root) = root {
        children.entry(String::new()).or_insert(root);
    }
    Subdomain::new(children).into()
}

fn compile_static(root: &Path, site: &SiteConfig, fs: &Arc<dyn Filesystem>, error: &ErrorHandler) -> Router {
    let mut router = Static::new(root)
        .all(site.all)
        .error(error.clone())
        .filesystem(fs.clone());

    if !site.listing {
        router = router.without_listing();
    }
    if site.dynamic {
        router = router.handler(Dynamic::new(fs.clone()));
    }
    for ext in &site.preload {
        router = router.ext(ext.clone(), Cached::new(PreloadBuilder::new(fs.clone())));
    }

    tracing::debug!(
        root = %root.display(),
        all = site.all,
        listing = site.listing,
        dynamic = site.dynamic,
        preload = ?site.preload,
        "Static site"
    );
    router.into()
}
