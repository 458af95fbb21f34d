//! HMAC signature verification over raw webhook payloads.
//!
//! Signatures have the form `<algorithm>=<hex-digest>`. The digest is always
//! computed over the exact bytes received, before any decoding, so that a
//! payload cannot be altered in ways a re-serialised form would hide.
//!
//! | Scheme   | Algorithm   | Sent by                                |
//! |----------|-------------|----------------------------------------|
//! | `sha1`   | HMAC-SHA1   | GitHub `X-Hub-Signature` (legacy)      |
//! | `sha256` | HMAC-SHA256 | GitHub `X-Hub-Signature-256`           |

use super::WebhookSecret;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use std::{fmt, str::FromStr};

/// Why a signature was not accepted.
///
/// Messages describe the failure without echoing the digest or the secret.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature must have the form <algorithm>=<hex-digest>")]
    Malformed,

    #[error("unsupported signature algorithm")]
    UnsupportedAlgorithm,

    #[error("signature digest is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("webhook secret cannot be used as an HMAC key")]
    InvalidKey,

    #[error("Failed to validate signature")]
    Mismatch,
}

/// HMAC algorithm named by a signature's scheme prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// HMAC-SHA1, the legacy GitHub scheme.
    Sha1,
    /// HMAC-SHA256.
    Sha256,
}

impl SignatureAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            _ => Err(SignatureError::UnsupportedAlgorithm),
        }
    }
}

/// Verifies webhook signatures with a shared secret.
///
/// Digest comparison is constant time (`hmac::Mac::verify_slice`).
///
/// # Examples
///
/// ```rust
/// use edge_router_core::{SignatureAlgorithm, SignatureVerifier, WebhookSecret};
///
/// let verifier = SignatureVerifier::new(WebhookSecret::from("It's a Secret to Everybody"));
/// let body = br#"{"ref":"refs/heads/main"}"#;
///
/// let signature = verifier.sign(SignatureAlgorithm::Sha1, body).unwrap();
/// assert!(signature.starts_with("sha1="));
/// assert!(verifier.verify(&signature, body));
/// assert!(!verifier.verify(&signature, b"{}"));
/// assert!(!verifier.verify("not-a-signature", body));
/// ```
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: WebhookSecret,
}

impl SignatureVerifier {
    pub fn new(secret: WebhookSecret) -> Self {
        Self { secret }
    }

    /// `true` when `signature` is a well-formed, matching signature of `payload`.
    pub fn verify(&self, signature: &str, payload: &[u8]) -> bool {
        self.check(signature, payload).is_ok()
    }

    /// Verify `signature` over `payload`, explaining any failure.
    ///
    /// The header is split on the first `=`; the left side selects the
    /// algorithm and the right side must be an even-length hex string.
    ///
    /// # Errors
    ///
    /// - [`SignatureError::Malformed`] when there is no `=` separator
    /// - [`SignatureError::UnsupportedAlgorithm`] for schemes other than `sha1`/`sha256`
    /// - [`SignatureError::InvalidHex`] when the digest is not well-formed hex
    /// - [`SignatureError::Mismatch`] when the digest does not match
    pub fn check(&self, signature: &str, payload: &[u8]) -> Result<(), SignatureError> {
        let (scheme, digest) = signature
            .split_once('=')
            .ok_or(SignatureError::Malformed)?;
        let algorithm: SignatureAlgorithm = scheme.parse()?;
        let expected = hex::decode(digest)?;

        match algorithm {
            SignatureAlgorithm::Sha1 => {
                verify_mac::<Hmac<Sha1>>(self.secret.expose_bytes(), payload, &expected)
            }
            SignatureAlgorithm::Sha256 => {
                verify_mac::<Hmac<Sha256>>(self.secret.expose_bytes(), payload, &expected)
            }
        }
    }

    /// Produce a `<algorithm>=<hex-digest>` signature for `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::InvalidKey`] if the secret is rejected as an
    /// HMAC key.
    pub fn sign(
        &self,
        algorithm: SignatureAlgorithm,
        payload: &[u8],
    ) -> Result<String, SignatureError> {
        let key = self.secret.expose_bytes();
        let digest = match algorithm {
            SignatureAlgorithm::Sha1 => compute_mac::<Hmac<Sha1>>(key, payload)?,
            SignatureAlgorithm::Sha256 => compute_mac::<Hmac<Sha256>>(key, payload)?,
        };
        Ok(format!("{}={}", algorithm, hex::encode(digest)))
    }
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

fn verify_mac<M>(key: &[u8], payload: &[u8], expected: &[u8]) -> Result<(), SignatureError>
where
    M: Mac + hmac::digest::KeyInit,
{
    let mut mac = <M as Mac>::new_from_slice(key).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(payload);
    mac.verify_slice(expected).map_err(|_| SignatureError::Mismatch)
}

fn compute_mac<M>(key: &[u8], payload: &[u8]) -> Result<Vec<u8>, SignatureError>
where
    M: Mac + hmac::digest::KeyInit,
{
    let mut mac = <M as Mac>::new_from_slice(key).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
