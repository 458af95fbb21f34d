//! Request model shared by predicates and handlers.
//!
//! An [`IncomingRequest`] owns the request head and the unread body stream.
//! Predicates only ever borrow it, so they can inspect the head but never
//! touch the body. Handlers receive it by value; whoever owns it may consume
//! the body, and after [`IncomingRequest::into_parts`] only the
//! [`RequestContext`] (the head) remains.

use axum::{
    body::Body,
    extract::Request,
    http::{request::Parts, Extensions, HeaderMap, Method, Uri},
};

/// An inbound HTTP request awaiting dispatch.
#[derive(Debug)]
pub struct IncomingRequest {
    head: Parts,
    body: Body,
}

impl IncomingRequest {
    /// Wrap an HTTP request received by the server.
    pub fn new(request: Request) -> Self {
        let (head, body) = request.into_parts();
        Self { head, body }
    }

    /// Request method exactly as received.
    pub fn method(&self) -> &Method {
        &self.head.method
    }

    /// Full request URI.
    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    /// URL path component, still percent-encoded.
    pub fn path(&self) -> &str {
        self.head.uri.path()
    }

    /// All request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// Look up a header by name (case-insensitive).
    ///
    /// Multiple values for the same header are joined with `", "`. Returns
    /// `None` when the header is absent or any value is not visible ASCII.
    pub fn header_value(&self, name: &str) -> Option<String> {
        joined_header_value(&self.head.headers, name)
    }

    /// Split into the request head and the body stream.
    ///
    /// This is the only way to reach the body; it consumes the request.
    pub fn into_parts(self) -> (RequestContext, Body) {
        (RequestContext { head: self.head }, self.body)
    }
}

impl From<Request> for IncomingRequest {
    fn from(request: Request) -> Self {
        Self::new(request)
    }
}

/// The head of a request whose body has already been consumed.
#[derive(Debug)]
pub struct RequestContext {
    head: Parts,
}

impl RequestContext {
    pub fn method(&self) -> &Method {
        &self.head.method
    }

    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    pub fn path(&self) -> &str {
        self.head.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// Request extensions, e.g. a correlation ID inserted by middleware.
    pub fn extensions(&self) -> &Extensions {
        &self.head.extensions
    }

    /// See [`IncomingRequest::header_value`].
    pub fn header_value(&self, name: &str) -> Option<String> {
        joined_header_value(&self.head.headers, name)
    }
}

fn joined_header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let mut values = headers.get_all(name).iter();
    let mut joined = values.next()?.to_str().ok()?.to_string();
    for value in values {
        joined.push_str(", ");
        joined.push_str(value.to_str().ok()?);
    }
    Some(joined)
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
