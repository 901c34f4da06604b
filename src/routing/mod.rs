//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, headers)
//!     → context.rs (DispatchContext: normalized path, host labels, depth)
//!     → host.rs (Domain picks a site by label, Subdomain recurses)
//!     → router.rs (Raw / Simple steps, each either answers or calls Next)
//!     → statics (Static resolves the path on disk)
//!     → Response, or the nearest error callback
//! ```
//!
//! # Design Decisions
//! - Router trees are compiled at startup and immutable at runtime
//! - Chain-of-responsibility with an explicit, move-only continuation
//! - Closed set of router kinds (`Router` enum)
//! - Routers never swallow errors; they answer, forward, or report

pub mod context;
pub mod error;
pub mod host;
pub mod matcher;
pub mod path;
pub mod router;

pub use context::{DispatchContext, Next};
pub use error::{default_error, ErrorHandler, RouteError};
pub use host::{Domain, Subdomain, WILDCARD};
pub use matcher::{ExactPath, FnMatcher, Matcher, PathPattern};
pub use path::normalize;
pub use router::{Raw, RouteFn, Router, Simple};
