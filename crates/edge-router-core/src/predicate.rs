//! Boolean tests over an incoming request.
//!
//! A route is guarded by a set of predicates and matches only when every one
//! of them holds. Predicates see the request head only and must be free of
//! side effects; they are shared by all requests for the life of the router.
//!
//! Besides the types in this module, [`PathMatcher`](crate::PathMatcher) and
//! any `Fn(&IncomingRequest) -> bool` closure are predicates too.

use crate::request::IncomingRequest;
use axum::http::{header, HeaderName, Method};

/// Name of the header GitHub uses to carry the webhook event type.
pub const GITHUB_EVENT_HEADER: &str = "x-github-event";

/// A pure boolean test over a request.
pub trait Predicate: Send + Sync {
    /// Returns `true` if the request satisfies this predicate.
    fn evaluate(&self, request: &IncomingRequest) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&IncomingRequest) -> bool + Send + Sync,
{
    fn evaluate(&self, request: &IncomingRequest) -> bool {
        (self)(request)
    }
}

// ============================================================================
// Method
// ============================================================================

/// Matches the request method, ignoring case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodPredicate {
    method: Method,
}

impl MethodPredicate {
    pub fn new(method: Method) -> Self {
        Self { method }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}

impl Predicate for MethodPredicate {
    fn evaluate(&self, request: &IncomingRequest) -> bool {
        request
            .method()
            .as_str()
            .eq_ignore_ascii_case(self.method.as_str())
    }
}

pub fn connect() -> MethodPredicate {
    MethodPredicate::new(Method::CONNECT)
}

pub fn delete() -> MethodPredicate {
    MethodPredicate::new(Method::DELETE)
}

pub fn get() -> MethodPredicate {
    MethodPredicate::new(Method::GET)
}

pub fn head() -> MethodPredicate {
    MethodPredicate::new(Method::HEAD)
}

pub fn options() -> MethodPredicate {
    MethodPredicate::new(Method::OPTIONS)
}

pub fn patch() -> MethodPredicate {
    MethodPredicate::new(Method::PATCH)
}

pub fn post() -> MethodPredicate {
    MethodPredicate::new(Method::POST)
}

pub fn put() -> MethodPredicate {
    MethodPredicate::new(Method::PUT)
}

pub fn trace() -> MethodPredicate {
    MethodPredicate::new(Method::TRACE)
}

// ============================================================================
// Headers
// ============================================================================

/// Matches a header value exactly.
///
/// The header name is looked up case-insensitively, as HTTP requires. The
/// value comparison is case-sensitive unless the predicate was built with
/// [`HeaderPredicate::ignoring_case`] (used for host names). A missing header
/// never matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPredicate {
    name: HeaderName,
    expected: String,
    ignore_case: bool,
}

impl HeaderPredicate {
    /// Match `name` against `expected` exactly.
    pub fn new(name: HeaderName, expected: impl Into<String>) -> Self {
        Self {
            name,
            expected: expected.into(),
            ignore_case: false,
        }
    }

    /// Match `name` against `expected`, lower-casing both sides first.
    pub fn ignoring_case(name: HeaderName, expected: impl Into<String>) -> Self {
        Self {
            name,
            expected: expected.into().to_lowercase(),
            ignore_case: true,
        }
    }

    pub fn name(&self) -> &HeaderName {
        &self.name
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }
}

impl Predicate for HeaderPredicate {
    fn evaluate(&self, request: &IncomingRequest) -> bool {
        match request.header_value(self.name.as_str()) {
            Some(actual) if self.ignore_case => actual.to_lowercase() == self.expected,
            Some(actual) => actual == self.expected,
            None => false,
        }
    }
}

/// Match a header value exactly.
pub fn header(name: HeaderName, expected: impl Into<String>) -> HeaderPredicate {
    HeaderPredicate::new(name, expected)
}

/// Match the `Host` header, ignoring case.
pub fn host(host: impl Into<String>) -> HeaderPredicate {
    HeaderPredicate::ignoring_case(header::HOST, host)
}

/// Match the `Referer` header, ignoring case.
pub fn referrer(referrer: impl Into<String>) -> HeaderPredicate {
    HeaderPredicate::ignoring_case(header::REFERER, referrer)
}

/// Match the GitHub webhook event type (`X-GitHub-Event`).
pub fn github_event(event: impl Into<String>) -> HeaderPredicate {
    HeaderPredicate::new(HeaderName::from_static(GITHUB_EVENT_HEADER), event)
}

#[cfg(test)]
#[path = "predicate_tests.rs"]
mod tests;
