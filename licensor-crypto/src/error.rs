//! Error types for the crypto layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Symmetric key is not exactly [`KEY_SIZE`](crate::KEY_SIZE) bytes.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Key armor could not be parsed.
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// Key armor parsed, but holds the wrong kind of key.
    #[error("key type mismatch: expected {expected}, found {found}")]
    KeyTypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Sealed box failed authentication or is shorter than a nonce.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Signature length does not match the key modulus.
    #[error("malformed signature: expected {expected} bytes, got {actual}")]
    MalformedSignature { expected: usize, actual: usize },

    /// RSA key generation failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),
}
