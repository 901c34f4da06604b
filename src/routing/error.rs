//! Dispatch errors and the default error renderer.
//!
//! # Design Decisions
//! - Expected conditions are bare status codes and never carry detail
//! - Unexpected failures keep their source chain for operators
//! - Rendering the chain to clients can be switched off in config

use std::error::Error as StdError;
use std::fmt::Write as _;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;

use crate::response::{send_data, Payload};
use crate::routing::context::DispatchContext;

/// Error reported by a router or handler to its error callback.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RouteError {
    /// Expected condition such as 403 or 404.
    #[error("status {}", .0.as_u16())]
    Status(StatusCode),
    /// Something went wrong while producing the response.
    #[error("{0}")]
    Failure(Arc<dyn StdError + Send + Sync>),
}

impl RouteError {
    pub fn failure<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        RouteError::Failure(Arc::new(err))
    }

    /// Status code the default renderer answers with.
    pub fn status(&self) -> StatusCode {
        match self {
            RouteError::Status(code) => *code,
            RouteError::Failure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The failure and every source below it, one per line.
    pub fn trace(&self) -> String {
        let RouteError::Failure(err) = self else {
            return self.to_string();
        };
        let mut out = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            let _ = write!(out, "\n  caused by: {}", cause);
            source = cause.source();
        }
        out
    }
}

impl From<StatusCode> for RouteError {
    fn from(code: StatusCode) -> Self {
        RouteError::Status(code)
    }
}

impl From<std::io::Error> for RouteError {
    fn from(err: std::io::Error) -> Self {
        RouteError::failure(err)
    }
}

/// Error callback installed on `Domain` and `Static` routers.
pub type ErrorHandler = Arc<dyn Fn(&DispatchContext, RouteError) -> Response + Send + Sync>;

/// The stock error callback.
///
/// With `expose_details` off, failures answer 500 without the error chain.
pub fn default_error(expose_details: bool) -> ErrorHandler {
    Arc::new(move |ctx, err| render_error(ctx, &err, expose_details))
}

/// Plain-text rendering used by [`default_error`].
pub fn render_error(ctx: &DispatchContext, err: &RouteError, expose_details: bool) -> Response {
    match err {
        RouteError::Status(code) => {
            tracing::warn!(status = code.as_u16(), uri = %ctx.uri, "Request rejected");
            let body = format!(
                "Generated error code {} while processing URI {} (no error handler specified)\n",
                code.as_u16(),
                ctx.uri
            );
            send_data(ctx, Payload::text(body).with_status(*code))
        }
        RouteError::Failure(_) => {
            tracing::error!(uri = %ctx.uri, error = %err.trace(), "Request failed");
            let body = if expose_details {
                format!(
                    "While processing URI {} the following error occurred:\n\n{}\n(no error handler specified)\n",
                    ctx.uri,
                    err.trace()
                )
            } else {
                "Internal Server Error\n".to_string()
            };
            send_data(ctx, Payload::text(body).with_status(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}
