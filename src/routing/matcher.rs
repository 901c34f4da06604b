//! Predicates for `Simple` routers.
//!
//! # Responsibilities
//! - Match the normalized path exactly (case-sensitive)
//! - Match the normalized path against a regex
//! - Wrap an arbitrary function of (root, context)
//!
//! # Design Decisions
//! - Predicates see the normalized path, never the raw request target
//! - Exact matching is a plain string comparison

use regex::Regex;

use crate::routing::context::DispatchContext;
use crate::routing::router::Router;

/// Trait for matching a dispatch against a condition.
pub trait Matcher: Send + Sync {
    /// Returns true if the dispatch matches this condition.
    fn matches(&self, root: &Router, ctx: &DispatchContext) -> bool;
}

/// Matches one exact path.
#[derive(Debug, Clone)]
pub struct ExactPath {
    path: String,
}

impl ExactPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Matcher for ExactPath {
    fn matches(&self, _root: &Router, ctx: &DispatchContext) -> bool {
        ctx.path == self.path
    }
}

/// Matches paths against a regular expression.
#[derive(Debug, Clone)]
pub struct PathPattern {
    pattern: Regex,
}

impl PathPattern {
    pub fn new(pattern: Regex) -> Self {
        Self { pattern }
    }
}

impl Matcher for PathPattern {
    fn matches(&self, _root: &Router, ctx: &DispatchContext) -> bool {
        self.pattern.is_match(&ctx.path)
    }
}

/// Any closure over the root router and the dispatch.
pub struct FnMatcher<F>(pub F);

impl<F> Matcher for FnMatcher<F>
where
    F: Fn(&Router, &DispatchContext) -> bool + Send + Sync,
{
    fn matches(&self, root: &Router, ctx: &DispatchContext) -> bool {
        (self.0)(root, ctx)
    }
}

impl From<&str> for Box<dyn Matcher> {
    fn from(path: &str) -> Self {
        Box::new(ExactPath::new(path))
    }
}

impl From<String> for Box<dyn Matcher> {
    fn from(path: String) -> Self {
        Box::new(ExactPath::new(path))
    }
}

impl From<Regex> for Box<dyn Matcher> {
    fn from(pattern: Regex) -> Self {
        Box::new(PathPattern::new(pattern))
    }
}
