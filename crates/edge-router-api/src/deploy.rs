//! GitHub Actions workflow dispatch for push events.
//!
//! [`WorkflowDispatcher`] is the event handler behind the signed push
//! webhook. It reads the pushed branch from the payload and asks GitHub to
//! run the deployment workflow for it, passing the upstream answer straight
//! back to the webhook sender.

use crate::{
    config::DeployConfig,
    metrics::{dispatch_result, ServiceMetrics},
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use edge_router_core::{plain_text, EventHandler, RequestContext};
use serde::Serialize;
use std::{fmt, sync::Arc, time::Duration};
use tracing::{info, instrument, warn};

const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Errors raised while dispatching a workflow.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("push payload has no string 'ref' field")]
    MissingRef,

    #[error("workflow dispatch request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("failed to encode dispatch request: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DispatchError {
    /// Status returned to the webhook sender.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingRef => StatusCode::BAD_REQUEST,
            Self::Transport(_) => StatusCode::BAD_GATEWAY,
            Self::Client(_) | Self::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Body of `POST /repos/{owner}/{repo}/actions/workflows/{workflow_id}/dispatches`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowDispatchRequest {
    /// Git reference the workflow runs on
    #[serde(rename = "ref")]
    pub git_ref: String,

    /// Workflow inputs
    pub inputs: DispatchInputs,
}

/// Inputs passed to the deployment workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchInputs {
    pub branch: String,
}

/// Branch name of a pushed ref.
///
/// `refs/heads/<name>` yields `<name>`; any other ref is returned unchanged.
pub fn branch_from_ref(git_ref: &str) -> &str {
    git_ref.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(git_ref)
}

/// Triggers a `workflow_dispatch` run for every verified push.
#[derive(Clone)]
pub struct WorkflowDispatcher {
    client: reqwest::Client,
    endpoint: String,
    git_ref: String,
    token: String,
    metrics: Arc<ServiceMetrics>,
}

impl WorkflowDispatcher {
    /// Build a dispatcher from a validated deploy section.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Client`] if the HTTP client cannot be built.
    pub fn new(config: &DeployConfig, metrics: Arc<ServiceMetrics>) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(DispatchError::Client)?;

        let endpoint = format!(
            "{}/repos/{}/{}/actions/workflows/{}/dispatches",
            config.api_base_url.trim_end_matches('/'),
            urlencoding::encode(&config.owner),
            urlencoding::encode(&config.repo),
            urlencoding::encode(&config.workflow_id),
        );

        Ok(Self {
            client,
            endpoint,
            git_ref: config.git_ref.clone(),
            token: config.token.clone().unwrap_or_default(),
            metrics,
        })
    }

    /// URL the dispatch request is sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the dispatch request for a push payload.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MissingRef`] when the payload has no string
    /// `ref` field.
    pub fn dispatch_request(
        &self,
        payload: &serde_json::Value,
    ) -> Result<WorkflowDispatchRequest, DispatchError> {
        let pushed_ref = payload
            .get("ref")
            .and_then(serde_json::Value::as_str)
            .ok_or(DispatchError::MissingRef)?;

        Ok(WorkflowDispatchRequest {
            git_ref: self.git_ref.clone(),
            inputs: DispatchInputs {
                branch: branch_from_ref(pushed_ref).to_string(),
            },
        })
    }

    /// Send the dispatch request and relay GitHub's answer.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Transport`] when GitHub cannot be reached or
    /// its response cannot be read.
    pub async fn dispatch(
        &self,
        request: &WorkflowDispatchRequest,
    ) -> Result<Response, DispatchError> {
        let body = serde_json::to_string(request)?;
        info!(body = %body, endpoint = %self.endpoint, "Dispatching workflow");

        let upstream = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(DispatchError::Transport)?;

        let status = upstream.status();
        let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
        let bytes = upstream.bytes().await.map_err(DispatchError::Transport)?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        if let Some(content_type) = content_type {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type);
        }
        Ok(response)
    }

    async fn handle_push(&self, payload: &serde_json::Value) -> Result<Response, DispatchError> {
        let request = self.dispatch_request(payload)?;
        self.dispatch(&request).await
    }
}

#[async_trait]
impl EventHandler for WorkflowDispatcher {
    #[instrument(skip_all, fields(path = %context.path()))]
    async fn handle_event(&self, context: RequestContext, payload: serde_json::Value) -> Response {
        match self.handle_push(&payload).await {
            Ok(response) => {
                let result = if response.status().is_success() {
                    dispatch_result::SUCCESS
                } else {
                    dispatch_result::UPSTREAM_ERROR
                };
                info!(status = %response.status(), "Workflow dispatch answered");
                self.metrics.record_dispatch(result);
                response
            }
            Err(e) => {
                let result = match e {
                    DispatchError::MissingRef => dispatch_result::MISSING_REF,
                    _ => dispatch_result::TRANSPORT_ERROR,
                };
                warn!(error = %e, "Workflow dispatch failed");
                self.metrics.record_dispatch(result);
                plain_text(e.status_code(), e.to_string())
            }
        }
    }
}

impl fmt::Debug for WorkflowDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowDispatcher")
            .field("endpoint", &self.endpoint)
            .field("git_ref", &self.git_ref)
            .field("token", &"<REDACTED>")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "deploy_tests.rs"]
mod tests;
