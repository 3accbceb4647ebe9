//! Error types for the licensing module.

use crate::license::VerifyResult;
use licensor_crypto::CryptoError;
use thiserror::Error;

/// Licensing-specific errors.
///
/// Cryptographic failures during token decoding all collapse into
/// [`LicenseError::InvalidLicense`] so a verifier never reveals which check
/// failed. Device mismatch and expiry stay distinct.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Symmetric key has the wrong length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Key material could not be parsed or has an unsupported size.
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// Key material holds the wrong kind of key.
    #[error("key type mismatch: {0}")]
    KeyTypeMismatch(String),

    /// Token is not valid base64 or is too short to hold a signature.
    #[error("malformed license token: {0}")]
    MalformedToken(String),

    /// Sealed payload failed authentication.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Signature, decryption or payload structure check failed.
    #[error("invalid license")]
    InvalidLicense,

    /// License is bound to another device.
    #[error("device ID mismatch")]
    DeviceMismatch,

    /// License has expired.
    #[error("license expired on {0}")]
    ExpiredLicense(String),

    /// Online verification failed (transport, status, or response body).
    #[error("network verification failed: {0}")]
    Network(String),

    /// Device fingerprint could not be derived.
    #[error("device ID unavailable: {0}")]
    DeviceIdUnavailable(String),

    /// Expiry date is not `YYYY-MM-DD`.
    #[error("invalid expiry date: {0}")]
    InvalidExpiryDate(String),

    /// Sealing or signing failed while issuing a token.
    #[error("license issuance failed: {0}")]
    Issuance(String),

    /// License token file does not exist or cannot be read.
    #[error("license not found: {0}")]
    LicenseNotFound(String),

    /// Key file I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<CryptoError> for LicenseError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidKeyLength { expected, actual } => {
                Self::InvalidKeyLength { expected, actual }
            }
            CryptoError::InvalidKeyFormat(msg) => Self::InvalidKeyFormat(msg),
            CryptoError::KeyTypeMismatch { expected, found } => {
                Self::KeyTypeMismatch(format!("expected {expected}, found {found}"))
            }
            CryptoError::AuthenticationFailed => Self::AuthenticationFailed,
            CryptoError::MalformedSignature { .. } => Self::InvalidLicense,
            CryptoError::Encryption(msg)
            | CryptoError::Signing(msg)
            | CryptoError::KeyGeneration(msg) => Self::Issuance(msg),
        }
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;

/// A rejected verification.
///
/// Some rejections still carry a populated [`VerifyResult`]: an expired
/// offline license reports the expiry date and device it was issued for, and
/// every dual-mode failure reports both sub-flags.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct VerifyError {
    /// Why verification failed.
    #[source]
    pub error: LicenseError,
    /// The partial result, when one could be built.
    pub result: Option<VerifyResult>,
}

impl VerifyError {
    /// A rejection with no result payload.
    pub fn bare(error: LicenseError) -> Self {
        Self {
            error,
            result: None,
        }
    }

    /// A rejection carrying a populated result.
    pub fn with_result(error: LicenseError, result: VerifyResult) -> Self {
        Self {
            error,
            result: Some(result),
        }
    }

    /// Splits into the error and the optional result.
    pub fn into_parts(self) -> (LicenseError, Option<VerifyResult>) {
        (self.error, self.result)
    }
}

impl From<LicenseError> for VerifyError {
    fn from(error: LicenseError) -> Self {
        Self::bare(error)
    }
}

/// Outcome of any verification path.
pub type VerifyOutcome = Result<VerifyResult, VerifyError>;
