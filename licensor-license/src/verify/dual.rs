//! Dual verification: offline AND online must both pass.
//!
//! A pass on one side never compensates for a failure on the other.

use super::offline::OfflineVerifier;
use super::online::OnlineVerifier;
use crate::error::{LicenseError, VerifyError, VerifyOutcome};
use crate::license::{LicenseType, VerifyResult};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Runs an offline check, then an online check, and combines them.
#[derive(Debug, Clone)]
pub struct DualVerifier {
    offline: OfflineVerifier,
    online: OnlineVerifier,
}

impl DualVerifier {
    pub fn new(offline: OfflineVerifier, online: OnlineVerifier) -> Self {
        Self { offline, online }
    }

    pub fn offline(&self) -> &OfflineVerifier {
        &self.offline
    }

    pub fn online(&self) -> &OnlineVerifier {
        &self.online
    }

    /// Verifies `token` for `device_id` against the current time.
    pub async fn verify(&self, token: &str, device_id: &str) -> VerifyOutcome {
        self.verify_at(token, device_id, Utc::now()).await
    }

    /// Verifies as of `now`.
    ///
    /// The online request is only made once the offline check has passed.
    /// Every error carries a result with both sub-flags populated.
    pub async fn verify_at(
        &self,
        token: &str,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> VerifyOutcome {
        let offline = match self.offline.verify_at(token, device_id, now) {
            Ok(result) => result,
            Err(rejection) => {
                let (error, partial) = rejection.into_parts();
                warn!(error = %error, "dual verification: offline check failed");
                let result = VerifyResult {
                    valid: false,
                    expired: partial.as_ref().is_some_and(|r| r.expired),
                    expiry_date: partial.and_then(|r| r.expiry_date),
                    device_id: device_id.to_string(),
                    license_type: LicenseType::Dual,
                    offline_valid: Some(false),
                    online_valid: Some(false),
                    message: "Offline verification failed".to_string(),
                };
                return Err(VerifyError::with_result(error, result));
            }
        };

        let online = match self.online.verify(device_id).await {
            Ok(result) => result,
            Err(rejection) => {
                warn!(error = %rejection.error, "dual verification: online check failed");
                let result = VerifyResult {
                    valid: false,
                    expired: offline.expired,
                    expiry_date: offline.expiry_date,
                    device_id: device_id.to_string(),
                    license_type: LicenseType::Dual,
                    offline_valid: Some(offline.valid),
                    online_valid: Some(false),
                    message: "Online verification failed".to_string(),
                };
                return Err(VerifyError::with_result(rejection.error, result));
            }
        };

        combine(&offline, &online, device_id)
    }
}

/// Combines independent offline and online results.
///
/// Valid only if both sides are valid and neither is expired.
///
/// # Errors
/// [`LicenseError::InvalidLicense`] with the combined result attached when
/// either side fails.
pub fn combine(offline: &VerifyResult, online: &VerifyResult, device_id: &str) -> VerifyOutcome {
    let offline_valid = offline.valid && !offline.expired;
    let online_valid = online.valid && !online.expired;
    let valid = offline_valid && online_valid;

    let result = VerifyResult {
        valid,
        expired: offline.expired || online.expired,
        expiry_date: offline.expiry_date,
        device_id: device_id.to_string(),
        license_type: LicenseType::Dual,
        offline_valid: Some(offline_valid),
        online_valid: Some(online_valid),
        message: if valid {
            "Dual verification".to_string()
        } else {
            "Dual verification failed".to_string()
        },
    };

    if !valid {
        warn!(offline_valid, online_valid, "dual verification failed");
        return Err(VerifyError::with_result(LicenseError::InvalidLicense, result));
    }

    debug!("dual verification passed");
    Ok(result)
}
