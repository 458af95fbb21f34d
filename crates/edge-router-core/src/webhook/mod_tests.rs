//! Tests for [`WebhookGate`].

use super::*;
use axum::{body::Body, extract::Request, http::header};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

// ============================================================================
// Helpers
// ============================================================================

const SECRET: &str = "push-hook-secret";
const PUSH_BODY: &str = r#"{"ref":"refs/heads/main"}"#;

fn sign(algorithm: SignatureAlgorithm, body: &[u8]) -> String {
    SignatureVerifier::new(WebhookSecret::from(SECRET))
        .sign(algorithm, body)
        .unwrap()
}

fn delivery(signature: Option<&str>, body: impl Into<Body>) -> IncomingRequest {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/hooks")
        .header("x-github-event", "push");
    if let Some(signature) = signature {
        builder = builder.header(DEFAULT_SIGNATURE_HEADER, signature);
    }
    IncomingRequest::new(builder.body(body.into()).unwrap())
}

/// Gate whose handler records how often it ran and echoes the `ref` field.
fn counting_gate() -> (WebhookGate, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let gate = WebhookGate::new(
        WebhookSecret::from(SECRET),
        move |_context: RequestContext, payload: serde_json::Value| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                let git_ref = payload["ref"].as_str().unwrap_or_default().to_string();
                plain_text(StatusCode::OK, git_ref)
            }
        },
    );
    (gate, calls)
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn assert_rejected(response: Response, calls: &AtomicUsize) -> String {
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
    assert_eq!(calls.load(Ordering::SeqCst), 0, "handler must not run");
    body_text(response).await
}

// ============================================================================
// Accepted deliveries
// ============================================================================

mod accepted_tests {
    use super::*;

    #[tokio::test]
    async fn test_valid_sha1_delivery_reaches_handler() {
        let (gate, calls) = counting_gate();
        let signature = sign(SignatureAlgorithm::Sha1, PUSH_BODY.as_bytes());

        let response = gate.call(delivery(Some(&signature), PUSH_BODY)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.extensions().get::<WebhookRejection>().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(body_text(response).await, "refs/heads/main");
    }

    #[tokio::test]
    async fn test_valid_sha256_delivery_reaches_handler() {
        let (gate, calls) = counting_gate();
        let signature = sign(SignatureAlgorithm::Sha256, PUSH_BODY.as_bytes());

        let response = gate.call(delivery(Some(&signature), PUSH_BODY)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_authorize_returns_context_and_payload() {
        let (gate, _calls) = counting_gate();
        let signature = sign(SignatureAlgorithm::Sha1, PUSH_BODY.as_bytes());

        let (context, payload) = gate
            .authorize(delivery(Some(&signature), PUSH_BODY))
            .await
            .unwrap();

        assert_eq!(context.path(), "/hooks");
        assert_eq!(context.header_value("x-github-event").as_deref(), Some("push"));
        assert_eq!(payload, serde_json::json!({"ref": "refs/heads/main"}));
    }

    #[tokio::test]
    async fn test_custom_signature_header_is_used() {
        let (gate, calls) = counting_gate();
        let gate = gate.with_signature_header(HeaderName::from_static("x-hub-signature-256"));
        let signature = sign(SignatureAlgorithm::Sha256, PUSH_BODY.as_bytes());

        let request = IncomingRequest::new(
            Request::builder()
                .method("POST")
                .uri("/hooks")
                .header("X-Hub-Signature-256", &signature)
                .body(Body::from(PUSH_BODY))
                .unwrap(),
        );
        let response = gate.call(request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

// ============================================================================
// Rejected deliveries
// ============================================================================

mod rejected_tests {
    use super::*;

    #[tokio::test]
    async fn test_tampered_body_is_rejected() {
        let (gate, calls) = counting_gate();
        let signature = sign(SignatureAlgorithm::Sha1, PUSH_BODY.as_bytes());

        let response = gate
            .call(delivery(Some(&signature), r#"{"ref":"refs/heads/evil"}"#))
            .await;

        assert_eq!(
            response.extensions().get::<WebhookRejection>(),
            Some(&WebhookRejection {
                kind: "signature_mismatch"
            })
        );
        let body = assert_rejected(response, &calls).await;
        assert_eq!(body, "Failed to validate signature");
    }

    #[tokio::test]
    async fn test_missing_signature_header_is_rejected() {
        let (gate, calls) = counting_gate();

        let response = gate.call(delivery(None, PUSH_BODY)).await;

        let body = assert_rejected(response, &calls).await;
        assert!(body.contains("x-hub-signature"));
    }

    #[tokio::test]
    async fn test_signature_without_separator_is_rejected() {
        let (gate, calls) = counting_gate();

        let response = gate.call(delivery(Some("sha1"), PUSH_BODY)).await;

        assert_rejected(response, &calls).await;
    }

    #[tokio::test]
    async fn test_signed_non_json_body_is_rejected() {
        let (gate, calls) = counting_gate();
        let body = "ref=refs/heads/main";
        let signature = sign(SignatureAlgorithm::Sha1, body.as_bytes());

        let response = gate.call(delivery(Some(&signature), body)).await;

        let text = assert_rejected(response, &calls).await;
        assert!(text.starts_with("request body is not valid JSON"));
    }

    #[tokio::test]
    async fn test_signed_invalid_utf8_body_is_rejected() {
        let (gate, calls) = counting_gate();
        let body: &[u8] = &[b'{', 0xff, 0xfe, b'}'];
        let signature = sign(SignatureAlgorithm::Sha1, body);

        let response = gate.call(delivery(Some(&signature), body.to_vec())).await;

        let text = assert_rejected(response, &calls).await;
        assert!(text.starts_with("request body is not valid UTF-8"));
    }

    #[tokio::test]
    async fn test_body_exactly_at_limit_is_accepted() {
        let (gate, calls) = counting_gate();
        let gate = gate.with_body_limit(PUSH_BODY.len());
        let signature = sign(SignatureAlgorithm::Sha1, PUSH_BODY.as_bytes());

        let response = gate.call(delivery(Some(&signature), PUSH_BODY)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_body_one_byte_over_limit_is_rejected() {
        let (gate, calls) = counting_gate();
        let gate = gate.with_body_limit(PUSH_BODY.len() - 1);
        let signature = sign(SignatureAlgorithm::Sha1, PUSH_BODY.as_bytes());

        let response = gate.call(delivery(Some(&signature), PUSH_BODY)).await;

        let text = assert_rejected(response, &calls).await;
        assert!(text.starts_with("failed to read request body"));
    }

    #[tokio::test]
    async fn test_body_over_limit_is_rejected() {
        let (gate, calls) = counting_gate();
        let gate = gate.with_body_limit(8);
        let signature = sign(SignatureAlgorithm::Sha1, PUSH_BODY.as_bytes());

        let response = gate.call(delivery(Some(&signature), PUSH_BODY)).await;

        let text = assert_rejected(response, &calls).await;
        assert!(text.starts_with("failed to read request body"));
    }

    #[tokio::test]
    async fn test_unsupported_algorithm_is_not_echoed() {
        let (gate, calls) = counting_gate();
        let signature = "da39a3ee5e6b4b0d3255bfef95601890afd80709=00";

        let response = gate.call(delivery(Some(signature), PUSH_BODY)).await;

        let text = assert_rejected(response, &calls).await;
        assert_eq!(text, "unsupported signature algorithm");
    }

    #[tokio::test]
    async fn test_rejection_never_echoes_secret_or_signature() {
        let (gate, calls) = counting_gate();
        let signature = sign(SignatureAlgorithm::Sha1, b"something else");

        let response = gate.call(delivery(Some(&signature), PUSH_BODY)).await;

        let text = assert_rejected(response, &calls).await;
        assert!(!text.contains(SECRET));
        assert!(!text.contains(&signature));
    }
}

// ============================================================================
// Error classification
// ============================================================================

mod error_tests {
    use super::*;

    #[test]
    fn test_every_error_maps_to_internal_server_error() {
        let errors = [
            WebhookError::MissingSignature {
                header: DEFAULT_SIGNATURE_HEADER.to_string(),
            },
            WebhookError::Signature(SignatureError::Malformed),
            WebhookError::Signature(SignatureError::Mismatch),
        ];

        for error in errors {
            assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_kind_distinguishes_mismatch_from_malformed() {
        assert_eq!(
            WebhookError::Signature(SignatureError::Mismatch).kind(),
            "signature_mismatch"
        );
        assert_eq!(
            WebhookError::Signature(SignatureError::Malformed).kind(),
            "invalid_signature"
        );
    }

    #[test]
    fn test_signature_error_message_is_transparent() {
        let error = WebhookError::from(SignatureError::Mismatch);

        assert_eq!(error.to_string(), "Failed to validate signature");
    }
}

#[test]
fn test_gate_defaults_and_overrides() {
    let (gate, _calls) = counting_gate();
    assert_eq!(gate.signature_header().as_str(), DEFAULT_SIGNATURE_HEADER);
    assert_eq!(gate.body_limit(), DEFAULT_BODY_LIMIT);

    let gate = gate
        .with_signature_header(HeaderName::from_static("x-hub-signature-256"))
        .with_body_limit(1024);
    assert_eq!(gate.signature_header().as_str(), "x-hub-signature-256");
    assert_eq!(gate.body_limit(), 1024);
}

#[test]
fn test_gate_debug_redacts_secret() {
    let (gate, _calls) = counting_gate();

    let debug_str = format!("{gate:?}");

    assert!(!debug_str.contains(SECRET));
    assert!(debug_str.contains("x-hub-signature"));
}
