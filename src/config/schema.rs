//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Response compression.
    pub compression: CompressionConfig,

    /// Default error rendering.
    pub errors: ErrorConfig,

    /// Sites keyed by subdomain label (`"*"` matches any, `""` the bare domain).
    pub domains: BTreeMap<String, SiteConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time to produce a response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Append logs to this file instead of stdout.
    pub log_file: Option<PathBuf>,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            log_file: None,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Response compression configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Negotiate gzip/deflate with clients.
    pub enabled: bool,

    /// Compression level, 1 (fastest) to 9 (smallest).
    pub level: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: 6,
        }
    }
}

/// Error rendering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ErrorConfig {
    /// Include the error chain in 500 responses.
    /// Turn off for public deployments.
    pub expose_details: bool,
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self {
            expose_details: true,
        }
    }
}

/// One site, possibly with nested subdomains.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Directory served for this label.
    pub root: Option<PathBuf>,

    /// Serve hidden (dot) paths.
    pub all: bool,

    /// Render directory listings when there is no index file.
    pub listing: bool,

    /// Evaluate `!`-suffixed paths as response manifests.
    pub dynamic: bool,

    /// Extensions served from memory after the first request.
    pub preload: Vec<String>,

    /// Nested sites keyed by the label to the right of this one.
    pub subdomains: BTreeMap<String, SiteConfig>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: None,
            all: false,
            listing: true,
            dynamic: false,
            preload: Vec::new(),
            subdomains: BTreeMap::new(),
        }
    }
}

impl SiteConfig {
    /// Site serving `root` with default options.
    pub fn serve(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }
}
