//! The router variants and the dispatch entry point.
//!
//! # Responsibilities
//! - Hold the closed set of router kinds
//! - Forward `route` to the variant
//! - Terminate a chain that nobody handled with a 404
//!
//! # Design Decisions
//! - Router trees are built once and shared immutably
//! - Every route step returns a boxed future so trees can nest freely

use axum::http::StatusCode;
use axum::response::Response;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::routing::context::{DispatchContext, Next};
use crate::routing::error::{render_error, RouteError};
use crate::routing::host::{Domain, Subdomain};
use crate::routing::matcher::Matcher;
use crate::statics::Static;

/// Signature of a raw routing function and of a `Simple` handler.
pub type RouteFn =
    Box<dyn for<'a> Fn(&'a Router, DispatchContext, Next<'a>) -> BoxFuture<'a, Response> + Send + Sync>;

/// A node in the dispatch tree.
pub enum Router {
    Raw(Raw),
    Simple(Simple),
    Domain(Domain),
    Subdomain(Subdomain),
    Static(Static),
}

impl Router {
    /// Run one routing step.
    ///
    /// `root` is the top of the tree, passed down unchanged so predicates and
    /// handlers can consult it.
    pub fn route<'a>(
        &'a self,
        root: &'a Router,
        ctx: DispatchContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        match self {
            Router::Raw(raw) => (raw.route)(root, ctx, next),
            Router::Simple(simple) => simple.route(root, ctx, next),
            Router::Domain(domain) => domain.route(root, ctx),
            Router::Subdomain(sub) => sub.route(root, ctx, next),
            Router::Static(statik) => statik.route(root, ctx, next).boxed(),
        }
    }

    /// Dispatch a request with this router as the root.
    pub fn dispatch(&self, ctx: DispatchContext) -> BoxFuture<'_, Response> {
        let end = Next::new(|ctx: DispatchContext| {
            tracing::debug!(host = %ctx.host, path = %ctx.path, "Request fell through every router");
            let err = RouteError::Status(StatusCode::NOT_FOUND);
            futures_util::future::ready(render_error(&ctx, &err, false)).boxed()
        });
        self.route(self, ctx, end)
    }
}

impl From<Raw> for Router {
    fn from(r: Raw) -> Self {
        Router::Raw(r)
    }
}

impl From<Simple> for Router {
    fn from(r: Simple) -> Self {
        Router::Simple(r)
    }
}

impl From<Domain> for Router {
    fn from(r: Domain) -> Self {
        Router::Domain(r)
    }
}

impl From<Subdomain> for Router {
    fn from(r: Subdomain) -> Self {
        Router::Subdomain(r)
    }
}

impl From<Static> for Router {
    fn from(r: Static) -> Self {
        Router::Static(r)
    }
}

/// Wraps a routing function directly.
pub struct Raw {
    route: RouteFn,
}

impl Raw {
    pub fn new<F>(route: F) -> Self
    where
        F: for<'a> Fn(&'a Router, DispatchContext, Next<'a>) -> BoxFuture<'a, Response>
            + Send
            + Sync
            + 'static,
    {
        Self { route: Box::new(route) }
    }
}

/// Runs a handler when its predicate matches, otherwise falls through.
pub struct Simple {
    matcher: Box<dyn Matcher>,
    handle: RouteFn,
}

impl Simple {
    /// `matcher` accepts an exact path (`&str`), a `Regex`, or any boxed
    /// [`Matcher`].
    pub fn new<M, F>(matcher: M, handle: F) -> Self
    where
        M: Into<Box<dyn Matcher>>,
        F: for<'a> Fn(&'a Router, DispatchContext, Next<'a>) -> BoxFuture<'a, Response>
            + Send
            + Sync
            + 'static,
    {
        Self {
            matcher: matcher.into(),
            handle: Box::new(handle),
        }
    }

    fn route<'a>(&'a self, root: &'a Router, ctx: DispatchContext, next: Next<'a>) -> BoxFuture<'a, Response> {
        if self.matcher.matches(root, &ctx) {
            (self.handle)(root, ctx, next)
        } else {
            next.run(ctx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{send_data, Payload};
    use crate::routing::matcher::FnMatcher;
    use axum::http::Uri;
    use regex::Regex;

    fn answer<M: Into<Box<dyn Matcher>>>(matcher: M, text: &'static str) -> Router {
        Simple::new(matcher, move |_, ctx, _| {
            futures_util::future::ready(send_data(&ctx, Payload::text(text))).boxed()
        })
        .into()
    }

    // Runs routers in order, each one's continuation being the next.
    fn step<'a>(
        rest: &'a [Router],
        root: &'a Router,
        ctx: DispatchContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        match rest.split_first() {
            Some((first, tail)) => first.route(root, ctx, Next::new(move |ctx| step(tail, root, ctx, next))),
            None => next.run(ctx),
        }
    }

    async fn run_chain(routers: &[Router], ctx: DispatchContext) -> Response {
        let end = Next::new(|ctx: DispatchContext| {
            futures_util::future::ready(render_error(&ctx, &StatusCode::NOT_FOUND.into(), false)).boxed()
        });
        step(routers, &routers[0], ctx, end).await
    }

    async fn text_of(res: Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn ctx(path: &'static str) -> DispatchContext {
        DispatchContext::new("example.com", Uri::from_static(path))
    }

    #[tokio::test]
    async fn simple_matches_exact_path() {
        let routers = vec![answer("/a", "a"), answer("/b", "b")];
        assert_eq!(text_of(run_chain(&routers, ctx("/b")).await).await, "b");
        assert_eq!(text_of(run_chain(&routers, ctx("/a")).await).await, "a");
    }

    #[tokio::test]
    async fn simple_matches_pattern_and_function() {
        let long: Box<dyn Matcher> = Box::new(FnMatcher(|_: &Router, c: &DispatchContext| c.path.len() > 10));
        let routers = vec![answer(Regex::new(r"\.json$").unwrap(), "json"), answer(long, "long")];
        assert_eq!(text_of(run_chain(&routers, ctx("/data.json")).await).await, "json");
        assert_eq!(text_of(run_chain(&routers, ctx("/a/very/long/path")).await).await, "long");
    }

    #[tokio::test]
    async fn unmatched_chain_ends_in_not_found() {
        let routers = vec![answer("/a", "a")];
        let res = run_chain(&routers, ctx("/zzz")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn dispatch_falls_through_to_not_found() {
        let root = answer("/a", "a");
        assert_eq!(text_of(root.dispatch(ctx("/a")).await).await, "a");
        assert_eq!(root.dispatch(ctx("/b")).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn raw_can_rewrite_context_before_forwarding() {
        let rewrite = Raw::new(|_, mut ctx, next| {
            ctx.path = "/a".to_string();
            next.run(ctx)
        });
        let routers = vec![rewrite.into(), answer("/a", "rewritten")];
        assert_eq!(text_of(run_chain(&routers, ctx("/anything")).await).await, "rewritten");
    }
}
