//! Host-routed file server built on Tokio and Axum.
//!
//! Requests flow through a tree of routers. Each router either answers or
//! hands the request to an explicit continuation:
//!
//! - [`routing`]: dispatch context, the `Router` variants, host and path handling
//! - [`statics`]: the `Static` router that maps request paths onto a directory
//! - [`handler`]: per-file handlers and the build cache behind them
//! - [`response`]: content negotiation and body streaming
//! - [`site`]: turns the `domains` config table into a router tree
//!
//! Around the core sit [`config`], [`http`], [`lifecycle`] and
//! [`observability`], which make it a runnable server.

// Core
pub mod fs;
pub mod handler;
pub mod response;
pub mod routing;
pub mod site;
pub mod statics;

// Server
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{DispatchContext, Next, Router};
