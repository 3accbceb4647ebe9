//! Offline verification: local key material only.

use crate::codec;
use crate::error::{LicenseError, LicenseResult, VerifyError, VerifyOutcome};
use crate::keys::VerifierKeys;
use crate::license::VerifyResult;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Verifies tokens with a public key and the shared symmetric key.
#[derive(Debug, Clone)]
pub struct OfflineVerifier {
    keys: VerifierKeys,
}

impl OfflineVerifier {
    pub fn new(keys: VerifierKeys) -> Self {
        Self { keys }
    }

    /// Builds a verifier from a PEM public key and raw 32-byte symmetric key.
    pub fn from_bytes(public_key_pem: &[u8], symmetric_key: &[u8]) -> LicenseResult<Self> {
        Ok(Self::new(VerifierKeys::from_bytes(
            public_key_pem,
            symmetric_key,
        )?))
    }

    pub fn keys(&self) -> &VerifierKeys {
        &self.keys
    }

    /// Verifies `token` for `device_id` against the current time.
    pub fn verify(&self, token: &str, device_id: &str) -> VerifyOutcome {
        self.verify_at(token, device_id, Utc::now())
    }

    /// Verifies `token` for `device_id` as of `now`.
    ///
    /// # Errors
    /// - [`LicenseError::InvalidLicense`] for any decode failure.
    /// - [`LicenseError::DeviceMismatch`] if the license is bound elsewhere.
    ///   No result is attached.
    /// - [`LicenseError::ExpiredLicense`] if `now > expiry_date`. The result
    ///   is attached so callers can still show the expiry date.
    pub fn verify_at(&self, token: &str, device_id: &str, now: DateTime<Utc>) -> VerifyOutcome {
        let license = codec::decode(
            token,
            self.keys.verification_key(),
            self.keys.symmetric_key(),
        )
        .map_err(|e| {
            warn!(error = %e, "offline verification rejected token");
            VerifyError::bare(LicenseError::InvalidLicense)
        })?;

        if license.device_id != device_id {
            warn!("offline verification: license bound to another device");
            return Err(VerifyError::bare(LicenseError::DeviceMismatch));
        }

        let mut result = VerifyResult::for_license(&license, now, "Offline verification");
        if result.expired {
            result.message = "License expired".to_string();
            let expiry = license.expiry_date.to_rfc3339();
            return Err(VerifyError::with_result(
                LicenseError::ExpiredLicense(expiry),
                result,
            ));
        }

        debug!(license_type = %license.license_type, "offline verification passed");
        Ok(result)
    }
}
