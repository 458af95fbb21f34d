//! Route handlers.

use crate::request::IncomingRequest;
use async_trait::async_trait;
use axum::response::Response;
use std::future::Future;

/// Produces the response for a request that matched a route.
///
/// The handler owns the request, including its unread body. Any async
/// function or closure taking an [`IncomingRequest`] and returning a
/// [`Response`] is a handler.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, request: IncomingRequest) -> Response;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(IncomingRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Response> + Send + 'static,
{
    async fn call(&self, request: IncomingRequest) -> Response {
        (self)(request).await
    }
}
