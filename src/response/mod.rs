//! Response sending subsystem.
//!
//! # Data Flow
//! ```text
//! File path or in-memory payload
//!     → negotiate.rs (pick gzip / deflate / identity from Accept-Encoding)
//!     → send.rs (status, Content-Type, Content-Encoding)
//!     → streamed body (ReaderStream, optional compressor in between)
//! ```
//!
//! # Design Decisions
//! - Bodies are never buffered whole; compression is a streaming transform
//! - Each call produces exactly one response, returned by value

pub mod negotiate;
pub mod send;

pub use negotiate::Encoding;
pub use send::{send_data, send_file, send_file_with, CompressionPolicy, Meta, Payload};
