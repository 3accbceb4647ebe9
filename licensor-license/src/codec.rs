//! License token encoding and decoding.
//!
//! Token format: `base64(signature || nonce || ciphertext || tag)`
//!
//! The license is serialized to JSON, sealed with AES-256-GCM, and the sealed
//! box is signed with RSA-PSS. The signature covers the ciphertext, not the
//! plaintext, so a forged or corrupted token is rejected before any
//! decryption is attempted.
//!
//! There is no version byte or key identifier. The split point is the fixed
//! RSA-4096 signature length.

use crate::error::{LicenseError, LicenseResult};
use crate::license::{License, LicenseType};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use licensor_crypto::{self as crypto, SigningKey, SymmetricKey, VerificationKey};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Length of the signature prefix in a decoded token (RSA-4096).
pub const SIGNATURE_LEN: usize = crypto::SIGNATURE_SIZE;

/// Encodes `license` into a token.
pub fn encode(
    license: &License,
    signing_key: &SigningKey,
    symmetric_key: &SymmetricKey,
) -> LicenseResult<String> {
    let serialized = serde_json::to_vec(license)?;
    let sealed = crypto::seal(symmetric_key, &serialized)?;
    let signature = crypto::sign(&sealed, signing_key)?;

    if signature.len() != SIGNATURE_LEN {
        return Err(LicenseError::InvalidKeyFormat(format!(
            "signature is {} bytes, token layout requires {SIGNATURE_LEN}",
            signature.len()
        )));
    }

    let mut token = Vec::with_capacity(signature.len() + sealed.len());
    token.extend_from_slice(&signature);
    token.extend_from_slice(&sealed);
    Ok(STANDARD.encode(token))
}

/// Decodes and authenticates a token.
///
/// Whitespace anywhere in `token` is ignored so wrapped or copy-pasted
/// tokens decode.
///
/// # Errors
/// - [`LicenseError::MalformedToken`] if the text is not base64 or is shorter
///   than a signature.
/// - [`LicenseError::InvalidLicense`] for a bad signature, a sealed box that
///   fails to open, or a payload that is not a license. These are not
///   distinguished.
pub fn decode(
    token: &str,
    verification_key: &VerificationKey,
    symmetric_key: &SymmetricKey,
) -> LicenseResult<License> {
    let compact: String = token.chars().filter(|c| !c.is_whitespace()).collect();
    let raw = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| LicenseError::MalformedToken(format!("invalid base64: {e}")))?;

    if raw.len() < SIGNATURE_LEN {
        return Err(LicenseError::MalformedToken(format!(
            "token is {} bytes, shorter than the {SIGNATURE_LEN}-byte signature",
            raw.len()
        )));
    }

    let (signature, sealed) = raw.split_at(SIGNATURE_LEN);

    match crypto::verify(sealed, signature, verification_key) {
        Ok(true) => {}
        Ok(false) | Err(_) => {
            debug!("token signature rejected");
            return Err(LicenseError::InvalidLicense);
        }
    }

    let serialized = crypto::open(symmetric_key, sealed).map_err(|_| {
        debug!("token payload failed to open");
        LicenseError::InvalidLicense
    })?;

    serde_json::from_slice(&serialized).map_err(|_| {
        debug!("token payload is not a license");
        LicenseError::InvalidLicense
    })
}

/// Builds a license issued now and encodes it.
pub fn issue(
    device_id: &str,
    license_type: LicenseType,
    expiry_date: DateTime<Utc>,
    features: Vec<String>,
    signing_key: &SigningKey,
    symmetric_key: &SymmetricKey,
) -> LicenseResult<String> {
    let license = License::new(device_id, license_type, expiry_date, features);
    let token = encode(&license, signing_key, symmetric_key)?;
    debug!(
        license_type = %license_type,
        expiry = %expiry_date,
        "issued license token"
    );
    Ok(token)
}

/// Reads a token from a file, dropping all whitespace and line breaks.
///
/// # Errors
/// [`LicenseError::LicenseNotFound`] if the file cannot be read.
pub fn load_token_from_file(path: &Path) -> LicenseResult<String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| LicenseError::LicenseNotFound(format!("{}: {e}", path.display())))?;
    Ok(contents.chars().filter(|c| !c.is_whitespace()).collect())
}
