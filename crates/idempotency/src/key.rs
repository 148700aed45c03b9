//! Idempotency key validation.

use thiserror::Error;

/// Maximum accepted key length in bytes.
pub const MAX_KEY_LENGTH: usize = 255;

/// Why a client-supplied key was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The key is empty after trimming whitespace.
    #[error("idempotency key must not be blank")]
    Blank,

    /// The key exceeds [`MAX_KEY_LENGTH`].
    #[error("idempotency key exceeds {MAX_KEY_LENGTH} characters")]
    TooLong,
}

/// A validated client-supplied idempotency key.
///
/// Keys are compared byte-for-byte as sent; validation only rejects blank
/// and oversized values, before the request reaches any handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Validates a raw header value.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        if raw.trim().is_empty() {
            return Err(KeyError::Blank);
        }
        if raw.len() > MAX_KEY_LENGTH {
            return Err(KeyError::TooLong);
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
