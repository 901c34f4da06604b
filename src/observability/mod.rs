//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout or file)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Log output is pretty or JSON, chosen by `observability.log_format`
//! - Request ID is attached to every request span
//! - Metrics are only exported when `observability.metrics_enabled` is set

pub mod logging;
pub mod metrics;

pub use logging::{init as init_logging, LoggingError, LoggingGuard};
