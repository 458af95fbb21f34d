//! Common test utilities for edge router integration tests
//!
//! This module provides:
//! - A temporary site directory with a few assets
//! - Service configurations pointing at that site and a mock GitHub API
//! - Helpers for building signed webhook deliveries

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use edge_router_api::{build_route_table, create_app, AppState, ServiceConfig, ServiceMetrics};
use edge_router_core::{SignatureAlgorithm, SignatureVerifier, WebhookSecret};
use std::sync::Arc;
use tempfile::TempDir;

pub const WEBHOOK_SECRET: &str = "integration-secret";

#[allow(dead_code)]
pub const DISPATCH_PATH: &str =
    "/repos/octo-org/website/actions/workflows/create-deployment.yml/dispatches";

/// A temporary site and the application serving it.
pub struct TestService {
    pub app: Router,
    pub metrics: Arc<ServiceMetrics>,
    _site: TempDir,
}

/// Create a site directory with an index page, a stylesheet and a nested page.
pub fn create_site() -> TempDir {
    let dir = TempDir::new().expect("create site directory");
    std::fs::write(
        dir.path().join("index.html"),
        "<!doctype html><title>home</title>",
    )
    .expect("write index.html");
    std::fs::write(dir.path().join("site.css"), "h1 { color: teal }").expect("write site.css");
    std::fs::create_dir(dir.path().join("about")).expect("create about/");
    std::fs::write(dir.path().join("about").join("index.html"), "<p>about</p>")
        .expect("write about/index.html");
    dir
}

/// Configuration with assets only (no webhook secret).
pub fn assets_only_config(site: &TempDir) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.assets.root = site.path().to_path_buf();
    config
}

/// Configuration with the push webhook dispatching to `api_base_url`.
#[allow(dead_code)]
pub fn webhook_config(site: &TempDir, api_base_url: &str) -> ServiceConfig {
    let mut config = assets_only_config(site);
    config.webhook.secret = Some(WEBHOOK_SECRET.to_string());
    config.deploy.api_base_url = api_base_url.to_string();
    config.deploy.owner = "octo-org".to_string();
    config.deploy.repo = "website".to_string();
    config.deploy.token = Some("ghp_integration".to_string());
    config.deploy.request_timeout_seconds = 5;
    config
}

/// Build the full application for `config`, keeping `site` alive with it.
pub fn start(config: ServiceConfig, site: TempDir) -> TestService {
    config.validate().expect("test configuration must be valid");
    let metrics = ServiceMetrics::new().expect("metrics");
    let router = build_route_table(&config, metrics.clone()).expect("route table");
    let app = create_app(AppState::new(Arc::new(router), metrics.clone()));

    TestService {
        app,
        metrics,
        _site: site,
    }
}

/// `sha1=<hex>` signature of `body` with the shared test secret.
#[allow(dead_code)]
pub fn sign(body: &[u8]) -> String {
    sign_with(SignatureAlgorithm::Sha1, WEBHOOK_SECRET, body)
}

#[allow(dead_code)]
pub fn sign_with(algorithm: SignatureAlgorithm, secret: &str, body: &[u8]) -> String {
    SignatureVerifier::new(WebhookSecret::from(secret))
        .sign(algorithm, body)
        .expect("sign payload")
}

/// A `POST` webhook delivery for `event` with an optional signature.
#[allow(dead_code)]
pub fn delivery(event: &str, signature: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/")
        .header("x-github-event", event)
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("x-hub-signature", signature);
    }
    builder.body(body.into()).expect("build delivery")
}

#[allow(dead_code)]
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("UTF-8 body")
}
