//! # Edge Router Core
//!
//! Request dispatching for the edge router: an ordered table of
//! predicate-guarded routes, plus a gate that authenticates signed webhook
//! payloads before handing them to an event handler.
//!
//! ```text
//! request ──▶ Router::route ──▶ first route whose predicates all hold ──▶ Handler
//!                                     │
//!                                     └─ webhook routes: WebhookGate ──▶ EventHandler
//! ```
//!
//! # Examples
//!
//! ```rust
//! use axum::http::StatusCode;
//! use edge_router_core::{plain_text, IncomingRequest, PathMatcher, Router};
//!
//! # fn build() -> Result<Router, edge_router_core::PathPatternError> {
//! let router = Router::new()
//!     .get(PathMatcher::new("/status")?, |_request: IncomingRequest| async {
//!         plain_text(StatusCode::OK, "ok")
//!     })
//!     .all(|_request: IncomingRequest| async {
//!         plain_text(StatusCode::OK, "fallback")
//!     });
//! # Ok(router)
//! # }
//! ```

pub mod handler;
pub mod path;
pub mod predicate;
pub mod request;
pub mod router;
pub mod webhook;

pub use handler::Handler;
pub use path::{PathMatcher, PathPatternError};
pub use predicate::Predicate;
pub use request::{IncomingRequest, RequestContext};
pub use router::{Route, Router, NOT_FOUND_BODY};
pub use webhook::{
    EventHandler, SignatureAlgorithm, SignatureError, SignatureVerifier, WebhookError, WebhookGate,
    WebhookRejection, WebhookSecret,
};

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};

/// Build a `text/plain` response with the given status and body.
///
/// Used for every response the router produces itself (not-found, webhook
/// rejection) so they share one shape.
pub fn plain_text(status: StatusCode, body: impl Into<String>) -> Response {
    let mut response = Response::new(Body::from(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
