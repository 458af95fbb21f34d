//! Ordered, first-match request routing.
//!
//! A [`Router`] is an append-only list of [`Route`]s built once at start-up.
//! Each request is checked against the routes in registration order and the
//! first route whose predicates all hold handles it. A route with no
//! predicates matches everything, so catch-all routes belong at the end;
//! the router does not enforce that.

use crate::{
    handler::Handler,
    path::PathMatcher,
    plain_text,
    predicate::{self, Predicate},
    request::IncomingRequest,
    webhook::{EventHandler, WebhookGate, WebhookSecret},
};
use axum::{http::StatusCode, response::Response};
use tracing::{debug, instrument};

/// Body of the response returned when no route matches.
pub const NOT_FOUND_BODY: &str = "resource not found";

/// A predicate set paired with the handler it guards.
pub struct Route {
    predicates: Vec<Box<dyn Predicate>>,
    handler: Box<dyn Handler>,
}

impl Route {
    pub fn new(predicates: Vec<Box<dyn Predicate>>, handler: impl Handler + 'static) -> Self {
        Self {
            predicates,
            handler: Box::new(handler),
        }
    }

    /// `true` when every predicate holds. An empty set always matches.
    pub fn matches(&self, request: &IncomingRequest) -> bool {
        self.predicates
            .iter()
            .all(|predicate| predicate.evaluate(request))
    }

    /// `true` for a route without predicates.
    pub fn is_catch_all(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Run the route's handler.
    pub async fn invoke(&self, request: IncomingRequest) -> Response {
        self.handler.call(request).await
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("predicates", &self.predicates.len())
            .finish_non_exhaustive()
    }
}

/// Dispatches requests to the first matching route.
///
/// # Examples
///
/// ```rust
/// use axum::http::StatusCode;
/// use edge_router_core::{plain_text, IncomingRequest, PathMatcher, Router, WebhookSecret};
/// use edge_router_core::RequestContext;
///
/// # fn build() -> Result<Router, edge_router_core::PathPatternError> {
/// let router = Router::new()
///     .webhook(
///         "push",
///         WebhookSecret::from("hook-secret"),
///         |_context: RequestContext, payload: serde_json::Value| async move {
///             plain_text(StatusCode::OK, payload["ref"].to_string())
///         },
///     )
///     .get(PathMatcher::new("/ping")?, |_request: IncomingRequest| async {
///         plain_text(StatusCode::OK, "pong")
///     });
/// assert_eq!(router.len(), 2);
/// # Ok(router)
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route guarded by `predicates`.
    pub fn register(
        mut self,
        predicates: Vec<Box<dyn Predicate>>,
        handler: impl Handler + 'static,
    ) -> Self {
        self.routes.push(Route::new(predicates, handler));
        self
    }

    /// Append a route for `method` requests whose whole path matches `path`.
    fn method_route(
        self,
        method: predicate::MethodPredicate,
        path: PathMatcher,
        handler: impl Handler + 'static,
    ) -> Self {
        self.register(vec![Box::new(method), Box::new(path)], handler)
    }

    pub fn connect(self, path: PathMatcher, handler: impl Handler + 'static) -> Self {
        self.method_route(predicate::connect(), path, handler)
    }

    pub fn delete(self, path: PathMatcher, handler: impl Handler + 'static) -> Self {
        self.method_route(predicate::delete(), path, handler)
    }

    pub fn get(self, path: PathMatcher, handler: impl Handler + 'static) -> Self {
        self.method_route(predicate::get(), path, handler)
    }

    pub fn head(self, path: PathMatcher, handler: impl Handler + 'static) -> Self {
        self.method_route(predicate::head(), path, handler)
    }

    pub fn options(self, path: PathMatcher, handler: impl Handler + 'static) -> Self {
        self.method_route(predicate::options(), path, handler)
    }

    pub fn patch(self, path: PathMatcher, handler: impl Handler + 'static) -> Self {
        self.method_route(predicate::patch(), path, handler)
    }

    pub fn post(self, path: PathMatcher, handler: impl Handler + 'static) -> Self {
        self.method_route(predicate::post(), path, handler)
    }

    pub fn put(self, path: PathMatcher, handler: impl Handler + 'static) -> Self {
        self.method_route(predicate::put(), path, handler)
    }

    pub fn trace(self, path: PathMatcher, handler: impl Handler + 'static) -> Self {
        self.method_route(predicate::trace(), path, handler)
    }

    /// Append a signed GitHub webhook route for `event`.
    ///
    /// Matches `POST` requests whose `X-GitHub-Event` header equals `event`
    /// and guards `handler` with a [`WebhookGate`] using default settings.
    /// Use [`Router::webhook_gate`] to register a customised gate.
    pub fn webhook(
        self,
        event: impl Into<String>,
        secret: WebhookSecret,
        handler: impl EventHandler + 'static,
    ) -> Self {
        self.webhook_gate(event, WebhookGate::new(secret, handler))
    }

    /// Append a signed GitHub webhook route for `event` using a prepared gate.
    pub fn webhook_gate(self, event: impl Into<String>, gate: WebhookGate) -> Self {
        self.register(
            vec![
                Box::new(predicate::post()),
                Box::new(predicate::github_event(event)),
            ],
            gate,
        )
    }

    /// Append a catch-all route.
    pub fn all(self, handler: impl Handler + 'static) -> Self {
        self.register(Vec::new(), handler)
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// The first route, in registration order, whose predicates all hold.
    pub fn resolve(&self, request: &IncomingRequest) -> Option<&Route> {
        self.position(request).map(|index| &self.routes[index])
    }

    fn position(&self, request: &IncomingRequest) -> Option<usize> {
        self.routes.iter().position(|route| route.matches(request))
    }

    /// Dispatch a request to its route, or answer `404 resource not found`.
    #[instrument(skip_all, fields(method = %request.method(), path = %request.path()))]
    pub async fn route(&self, request: IncomingRequest) -> Response {
        match self.position(&request) {
            Some(index) => {
                debug!(route = index, "Dispatching request to matched route");
                self.routes[index].invoke(request).await
            }
            None => {
                debug!("No route matched request");
                plain_text(StatusCode::NOT_FOUND, NOT_FOUND_BODY)
            }
        }
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
