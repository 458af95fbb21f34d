//! Signed webhook processing.
//!
//! A [`WebhookGate`] sits in front of an [`EventHandler`]. For every request
//! it reads the signature header, buffers the body once, verifies the HMAC
//! over those exact bytes, decodes them as UTF-8 JSON and only then hands the
//! parsed payload to the handler. Any failure along the way short-circuits
//! with `500 Internal Server Error` and the failure message as a plain-text
//! body; the handler is never invoked for a rejected request.

use crate::{handler::Handler, plain_text, request::IncomingRequest, request::RequestContext};
use async_trait::async_trait;
use axum::{
    http::{HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use std::{fmt, future::Future};
use tracing::{debug, instrument, warn};

mod secret;
mod signature;

pub use secret::WebhookSecret;
pub use signature::{SignatureAlgorithm, SignatureError, SignatureVerifier};

/// Header carrying the payload signature unless configured otherwise.
pub const DEFAULT_SIGNATURE_HEADER: &str = "x-hub-signature";

/// Largest body buffered for verification unless configured otherwise (10 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

// ============================================================================
// Event handler
// ============================================================================

/// Receives the parsed payload of a verified webhook delivery.
///
/// Implemented for any `Fn(RequestContext, serde_json::Value) -> Future`
/// closure, so simple handlers need no dedicated type.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, context: RequestContext, payload: serde_json::Value) -> Response;
}

#[async_trait]
impl<F, Fut> EventHandler for F
where
    F: Fn(RequestContext, serde_json::Value) -> Fut + Send + Sync,
    Fut: Future<Output = Response> + Send + 'static,
{
    async fn handle_event(&self, context: RequestContext, payload: serde_json::Value) -> Response {
        (self)(context, payload).await
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Reasons a webhook delivery was rejected before reaching its handler.
///
/// Display strings become the response body, so none of them include the
/// secret or the received signature.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("missing signature header '{header}'")]
    MissingSignature { header: String },

    #[error("signature header '{header}' is not valid visible ASCII")]
    MalformedSignatureHeader { header: String },

    #[error("failed to read request body: {0}")]
    BodyRead(#[source] axum::Error),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("request body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("request body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl WebhookError {
    /// Short machine-readable label, used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingSignature { .. } => "missing_signature",
            Self::MalformedSignatureHeader { .. } => "malformed_signature_header",
            Self::BodyRead(_) => "body_read",
            Self::Signature(SignatureError::Mismatch) => "signature_mismatch",
            Self::Signature(_) => "invalid_signature",
            Self::InvalidUtf8(_) => "invalid_utf8",
            Self::InvalidJson(_) => "invalid_json",
        }
    }

    /// Every rejection fails closed with 500.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Marker placed in the extensions of a rejection response.
///
/// Lets outer layers count rejections without parsing the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebhookRejection {
    pub kind: &'static str,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let mut response = plain_text(self.status_code(), self.to_string());
        response.extensions_mut().insert(WebhookRejection { kind });
        response
    }
}

// ============================================================================
// Gate
// ============================================================================

/// Verifies a webhook delivery and forwards its JSON payload to a handler.
pub struct WebhookGate {
    verifier: SignatureVerifier,
    signature_header: HeaderName,
    body_limit: usize,
    handler: Box<dyn EventHandler>,
}

impl WebhookGate {
    pub fn new(secret: WebhookSecret, handler: impl EventHandler + 'static) -> Self {
        Self {
            verifier: SignatureVerifier::new(secret),
            signature_header: HeaderName::from_static(DEFAULT_SIGNATURE_HEADER),
            body_limit: DEFAULT_BODY_LIMIT,
            handler: Box::new(handler),
        }
    }

    /// Read the signature from `header` instead of `X-Hub-Signature`.
    pub fn with_signature_header(mut self, header: HeaderName) -> Self {
        self.signature_header = header;
        self
    }

    /// Reject bodies larger than `limit` bytes.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn signature_header(&self) -> &HeaderName {
        &self.signature_header
    }

    pub fn body_limit(&self) -> usize {
        self.body_limit
    }

    /// Verify and decode a delivery without invoking the handler.
    ///
    /// The body is consumed exactly once; the signature is checked against
    /// those bytes before any decoding happens.
    ///
    /// # Errors
    ///
    /// Returns a [`WebhookError`] describing the first failed step.
    pub async fn authorize(
        &self,
        request: IncomingRequest,
    ) -> Result<(RequestContext, serde_json::Value), WebhookError> {
        let (context, body) = request.into_parts();

        let signature = context
            .headers()
            .get(&self.signature_header)
            .ok_or_else(|| WebhookError::MissingSignature {
                header: self.signature_header.to_string(),
            })?
            .to_str()
            .map_err(|_| WebhookError::MalformedSignatureHeader {
                header: self.signature_header.to_string(),
            })?
            .to_owned();

        let payload: Bytes = axum::body::to_bytes(body, self.body_limit)
            .await
            .map_err(WebhookError::BodyRead)?;

        self.verifier.check(&signature, &payload)?;
        debug!(bytes = payload.len(), "Webhook signature verified");

        let text = std::str::from_utf8(&payload)?;
        let value = serde_json::from_str(text)?;

        Ok((context, value))
    }
}

#[async_trait]
impl Handler for WebhookGate {
    #[instrument(skip_all, fields(signature_header = %self.signature_header))]
    async fn call(&self, request: IncomingRequest) -> Response {
        match self.authorize(request).await {
            Ok((context, payload)) => self.handler.handle_event(context, payload).await,
            Err(error) => {
                warn!(
                    kind = error.kind(),
                    error = %error,
                    "Rejected webhook delivery"
                );
                error.into_response()
            }
        }
    }
}

impl fmt::Debug for WebhookGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookGate")
            .field("verifier", &self.verifier)
            .field("signature_header", &self.signature_header)
            .field("body_limit", &self.body_limit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
