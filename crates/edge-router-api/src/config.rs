//! Configuration types for the edge router service.
//!
//! Every section carries serde defaults so that a partial file, or no file at
//! all, still deserialises. [`ServiceConfig::validate`] then rejects settings
//! the service cannot run with.

use crate::errors::ConfigError;
use axum::http::HeaderName;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Static asset settings
    pub assets: AssetsConfig,

    /// Signed webhook route settings
    pub webhook: WebhookConfig,

    /// Workflow dispatch settings
    pub deploy: DeployConfig,
}

impl ServiceConfig {
    /// Check the configuration for values the service cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] or [`ConfigError::Missing`] naming the
    /// first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                message: "server.port must be greater than zero".to_string(),
            });
        }

        if self.server.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_size must be greater than zero".to_string(),
            });
        }

        if self.assets.index_document.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "assets.index_document".to_string(),
            });
        }

        if self.webhook.event.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "webhook.event".to_string(),
            });
        }

        if HeaderName::try_from(self.webhook.signature_header.as_str()).is_err() {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhook.signature_header '{}' is not a valid header name",
                    self.webhook.signature_header
                ),
            });
        }

        if let Some(secret) = &self.webhook.secret {
            if secret.is_empty() {
                return Err(ConfigError::Invalid {
                    message: "webhook.secret must not be empty when set".to_string(),
                });
            }
            self.deploy.validate()?;
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request body buffered by the webhook route, in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level, used when `RUST_LOG` is not set
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Static asset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory the site is served from
    pub root: PathBuf,

    /// File served for paths ending in `/`
    pub index_document: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("public"),
            index_document: "index.html".to_string(),
        }
    }
}

/// Signed webhook route configuration.
///
/// Without a secret no webhook route is registered.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Value of `X-GitHub-Event` the route answers to
    pub event: String,

    /// Header carrying the `<algorithm>=<hex>` signature
    pub signature_header: String,

    /// Shared HMAC secret
    pub secret: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            event: "push".to_string(),
            signature_header: "x-hub-signature".to_string(),
            secret: None,
        }
    }
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("event", &self.event)
            .field("signature_header", &self.signature_header)
            .field("secret", &self.secret.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

/// GitHub Actions workflow dispatch configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Base URL of the GitHub REST API
    pub api_base_url: String,

    /// Repository owner
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// Workflow file name or numeric ID
    pub workflow_id: String,

    /// Git ref the workflow runs on
    pub git_ref: String,

    /// `User-Agent` sent to the API
    pub user_agent: String,

    /// API token sent as a bearer credential
    pub token: Option<String>,

    /// Outbound request timeout in seconds
    pub request_timeout_seconds: u64,
}

impl DeployConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("deploy.api_base_url", self.api_base_url.as_str()),
            ("deploy.owner", self.owner.as_str()),
            ("deploy.repo", self.repo.as_str()),
            ("deploy.workflow_id", self.workflow_id.as_str()),
            ("deploy.git_ref", self.git_ref.as_str()),
            ("deploy.token", self.token.as_deref().unwrap_or_default()),
        ];

        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing {
                    key: key.to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
            owner: String::new(),
            repo: String::new(),
            workflow_id: "create-deployment.yml".to_string(),
            git_ref: "www".to_string(),
            user_agent: "edge-router".to_string(),
            token: None,
            request_timeout_seconds: 30,
        }
    }
}

impl fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployConfig")
            .field("api_base_url", &self.api_base_url)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("workflow_id", &self.workflow_id)
            .field("git_ref", &self.git_ref)
            .field("user_agent", &self.user_agent)
            .field("token", &self.token.as_ref().map(|_| "<REDACTED>"))
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
