//! Directory-backed static asset handler.
//!
//! Registered as the router's catch-all. Paths are percent-decoded and mapped
//! onto the asset root one segment at a time; anything that could step
//! outside the root is treated as not found.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderValue, Method, StatusCode},
    response::Response,
};
use edge_router_core::{plain_text, Handler, IncomingRequest, NOT_FOUND_BODY};
use std::path::PathBuf;
use tracing::{debug, instrument};

const ALLOWED_METHODS: &str = "GET, HEAD";

/// Serves files from a directory.
#[derive(Debug, Clone)]
pub struct AssetHandler {
    root: PathBuf,
    index_document: String,
}

impl AssetHandler {
    pub fn new(root: impl Into<PathBuf>, index_document: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            index_document: index_document.into(),
        }
    }

    /// Map a request path onto a file below the root.
    ///
    /// Returns `None` for paths that do not decode to UTF-8 or that contain
    /// backslashes, empty segments, `.` or `..`.
    pub fn resolve_path(&self, request_path: &str) -> Option<PathBuf> {
        let decoded = urlencoding::decode(request_path).ok()?;
        if decoded.contains('\\') || decoded.contains('\0') {
            return None;
        }

        let relative = decoded.strip_prefix('/')?;
        let (relative, wants_index) = match relative.strip_suffix('/') {
            Some(directory) => (directory, true),
            None => (relative, relative.is_empty()),
        };

        let mut file = self.root.clone();
        if !relative.is_empty() {
            for segment in relative.split('/') {
                if segment.is_empty() || segment == "." || segment == ".." {
                    return None;
                }
                file.push(segment);
            }
        }

        if wants_index {
            file.push(&self.index_document);
        }

        Some(file)
    }
}

#[async_trait]
impl Handler for AssetHandler {
    #[instrument(skip_all, fields(method = %request.method(), path = %request.path()))]
    async fn call(&self, request: IncomingRequest) -> Response {
        let method = request.method();
        if method != Method::GET && method != Method::HEAD {
            let mut response = plain_text(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
            return response;
        }
        let is_head = method == Method::HEAD;

        let Some(file) = self.resolve_path(request.path()) else {
            debug!("Rejected asset path");
            return plain_text(StatusCode::NOT_FOUND, NOT_FOUND_BODY);
        };

        let contents = match tokio::fs::metadata(&file).await {
            Ok(metadata) if metadata.is_file() => tokio::fs::read(&file).await,
            _ => {
                debug!(file = %file.display(), "Asset not found");
                return plain_text(StatusCode::NOT_FOUND, NOT_FOUND_BODY);
            }
        };

        let contents = match contents {
            Ok(contents) => contents,
            Err(e) => {
                debug!(file = %file.display(), error = %e, "Failed to read asset");
                return plain_text(StatusCode::NOT_FOUND, NOT_FOUND_BODY);
            }
        };

        let mime = mime_guess::from_path(&file).first_or_octet_stream();
        let length = contents.len();
        let body = if is_head {
            Body::empty()
        } else {
            Body::from(contents)
        };

        let mut response = Response::new(body);
        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        response
    }
}

#[cfg(test)]
#[path = "assets_tests.rs"]
mod tests;
