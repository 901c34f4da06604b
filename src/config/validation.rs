//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, compression level, addresses)
//! - Check that every site can serve something
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure apart from checking site roots exist

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::config::schema::{ServerConfig, SiteConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid {field} {value:?}")]
    Address { field: &'static str, value: String },
    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,
    #[error("compression.level must be between 1 and 9, got {0}")]
    CompressionLevel(u32),
    #[error("no domains configured")]
    NoSites,
    #[error("site {0:?}: label must not contain '.'")]
    DottedLabel(String),
    #[error("site {0:?}: needs a root or subdomains")]
    EmptySite(String),
    #[error("site {site:?}: root {root:?} is not a directory")]
    MissingRoot { site: String, root: PathBuf },
    #[error("site {site:?}: preload extension {ext:?} must not start with '.'")]
    DottedExtension { site: String, ext: String },
}

/// Check a parsed configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::Address {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if !(1..=9).contains(&config.compression.level) {
        errors.push(ValidationError::CompressionLevel(config.compression.level));
    }

    if config.domains.is_empty() {
        errors.push(ValidationError::NoSites);
    }
    for (label, site) in &config.domains {
        validate_site(label.clone(), label, site, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_site(name: String, label: &str, site: &SiteConfig, errors: &mut Vec<ValidationError>) {
    if label.contains('.') {
        errors.push(ValidationError::DottedLabel(name.clone()));
    }

    match &site.root {
        Some(root) if !root.is_dir() => errors.push(ValidationError::MissingRoot {
            site: name.clone(),
            root: root.clone(),
        }),
        None if site.subdomains.is_empty() => errors.push(ValidationError::EmptySite(name.clone())),
        _ => {}
    }

    for ext in &site.preload {
        if ext.starts_with('.') {
            errors.push(ValidationError::DottedExtension {
                site: name.clone(),
                ext: ext.clone(),
            });
        }
    }

    for (child, sub) in &site.subdomains {
        validate_site(format!("{}.{}", child, name), child, sub, errors);
    }
}
