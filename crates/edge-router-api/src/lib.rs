//! # Edge Router HTTP Service
//!
//! Hosts the edge router behind an axum server.
//!
//! This crate provides:
//! - Service configuration and validation
//! - The route table: the signed push webhook (workflow dispatch) ahead of
//!   the static asset catch-all
//! - Operational endpoints under `/_edge/` (health, Prometheus metrics)
//! - Request logging with correlation IDs and graceful shutdown

pub mod assets;
pub mod config;
pub mod deploy;
pub mod errors;
pub mod metrics;

pub use assets::AssetHandler;
pub use config::{
    AssetsConfig, DeployConfig, LoggingConfig, ServerConfig, ServiceConfig, WebhookConfig,
};
pub use deploy::{branch_from_ref, DispatchError, WorkflowDispatcher};
pub use errors::{ConfigError, ServiceError};
pub use metrics::ServiceMetrics;

use axum::{
    extract::{Request, State},
    http::{HeaderName, StatusCode},
    middleware,
    response::{Json, Response},
    routing::get,
    Router,
};
use edge_router_core::{
    IncomingRequest, Router as RouteTable, WebhookGate, WebhookRejection, WebhookSecret,
};
use serde::{Deserialize, Serialize};
use std::{future::IntoFuture, sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

/// Prefix reserved for operational endpoints.
pub const OPS_PREFIX: &str = "/_edge";

/// Header carrying the per-request correlation ID.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Route table every non-operational request is dispatched through
    pub router: Arc<RouteTable>,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(router: Arc<RouteTable>, metrics: Arc<ServiceMetrics>) -> Self {
        Self { router, metrics }
    }
}

// ============================================================================
// Route table assembly
// ============================================================================

/// Build the route table described by `config`.
///
/// With a webhook secret configured, `POST` requests carrying the configured
/// `X-GitHub-Event` go through a [`WebhookGate`] to a
/// [`WorkflowDispatcher`]. Everything else falls through to the
/// [`AssetHandler`].
///
/// # Errors
///
/// Returns [`ServiceError::Configuration`] when the webhook section cannot be
/// turned into a working route.
pub fn build_route_table(
    config: &ServiceConfig,
    metrics: Arc<ServiceMetrics>,
) -> Result<RouteTable, ServiceError> {
    let mut router = RouteTable::new();

    match &config.webhook.secret {
        Some(secret) => {
            let signature_header = HeaderName::try_from(config.webhook.signature_header.as_str())
                .map_err(|e| ConfigError::Invalid {
                    message: format!("webhook.signature_header: {}", e),
                })?;
            let dispatcher =
                WorkflowDispatcher::new(&config.deploy, metrics).map_err(|e| {
                    ConfigError::Invalid {
                        message: format!("deploy: {}", e),
                    }
                })?;

            let gate = WebhookGate::new(WebhookSecret::from(secret.as_str()), dispatcher)
                .with_signature_header(signature_header)
                .with_body_limit(config.server.max_body_size);
            router = router.webhook_gate(config.webhook.event.clone(), gate);

            info!(
                event = %config.webhook.event,
                signature_header = %config.webhook.signature_header,
                "Registered signed webhook route"
            );
        }
        None => {
            warn!("No webhook secret configured; webhook route is disabled");
        }
    }

    info!(root = %config.assets.root.display(), "Serving static assets");
    Ok(router.all(AssetHandler::new(
        config.assets.root.clone(),
        config.assets.index_document.clone(),
    )))
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create the axum application: operational endpoints, then the route table.
pub fn create_app(state: AppState) -> Router {
    let ops_routes = Router::new()
        .route(&format!("{OPS_PREFIX}/health"), get(handle_health_check))
        .route(&format!("{OPS_PREFIX}/metrics"), get(metrics_endpoint));

    Router::new()
        .merge(ops_routes)
        .fallback(dispatch_request)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server
pub async fn start_server(config: ServiceConfig) -> Result<(), ServiceError> {
    let metrics = ServiceMetrics::new().map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: format!("Failed to initialize metrics: {}", e),
        })
    })?;

    let router = build_route_table(&config, metrics.clone())?;
    info!(routes = router.len(), "Route table ready");

    let app = create_app(AppState::new(Arc::new(router), metrics));

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener =
        tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: address.clone(),
                message: e.to_string(),
            })?;

    info!("Starting HTTP server on {}", address);

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal(shutdown_timeout).await;
        let _ = shutdown_tx.send(true);
    })
    .into_future();

    // In-flight requests get `shutdown_timeout` to finish once a signal arrives.
    let drain_deadline = async move {
        let _ = shutdown_rx.wait_for(|signalled| *signalled).await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = drain_deadline => {
            warn!(
                timeout_seconds = shutdown_timeout.as_secs(),
                "Graceful shutdown timed out; dropping in-flight requests"
            );
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown with {}s timeout", timeout.as_secs());
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown with {}s timeout", timeout.as_secs());
        },
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Hand a request to the route table and record the outcome.
async fn dispatch_request(State(state): State<AppState>, request: Request) -> Response {
    state.metrics.routed_requests_total.inc();

    let response = state.router.route(IncomingRequest::new(request)).await;

    if response.status() == StatusCode::NOT_FOUND {
        state.metrics.not_found_total.inc();
    }
    if let Some(rejection) = response.extensions().get::<WebhookRejection>() {
        state.metrics.record_webhook_rejection(rejection.kind);
    }

    response
}

/// Basic health check endpoint
#[instrument(skip_all)]
async fn handle_health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    state.metrics.render().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware
///
/// - Extracts `x-correlation-id` from the request or generates a UUID v4
/// - Logs request start and completion with structured fields
/// - Echoes the correlation ID in the response headers
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());
    request.extensions_mut().insert(correlation_id.clone());

    info!(
        correlation_id = %correlation_id,
        method = %method,
        uri = %uri,
        "Request started"
    );

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, header_value);
    }

    let status = response.status();

    if status.is_server_error() {
        error!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}

// ============================================================================
// Responses
// ============================================================================

/// Body of `GET /_edge/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
