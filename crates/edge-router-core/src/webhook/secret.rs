//! Shared webhook secret.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The key shared between the webhook sender and this router.
///
/// The bytes are wiped when the value is dropped and never appear in `Debug`
/// output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct WebhookSecret {
    inner: Vec<u8>,
}

impl WebhookSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: bytes.into(),
        }
    }

    /// Get the raw key bytes (only for immediate use).
    pub fn expose_bytes(&self) -> &[u8] {
        &self.inner
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Secret length, without exposing content.
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl From<&str> for WebhookSecret {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl From<String> for WebhookSecret {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookSecret")
            .field("length", &self.len())
            .field("value", &"<REDACTED>")
            .finish()
    }
}
