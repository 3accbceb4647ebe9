//! Verification engine.
//!
//! The three modes form a closed set, so [`Verifier`] is an enum rather than
//! a trait object. Callers pick a mode explicitly; the `license_type` inside a
//! token never selects one.

mod offline;
pub use offline::OfflineVerifier;

#[cfg(feature = "online")]
mod dual;
#[cfg(feature = "online")]
mod online;

#[cfg(feature = "online")]
pub use dual::{combine, DualVerifier};
#[cfg(feature = "online")]
pub use online::{OnlineConfig, OnlineVerifier, DEFAULT_TIMEOUT_MS, VERIFY_ONLINE_PATH};

use crate::error::{LicenseError, VerifyError, VerifyOutcome};
use crate::keys::VerifierKeys;
use crate::license::LicenseType;
#[cfg(feature = "online")]
use crate::error::LicenseResult;

/// What a single verification call is asked about.
#[derive(Debug, Clone, Copy)]
pub struct VerifyContext<'a> {
    /// Required by offline and dual modes, ignored by online.
    pub token: Option<&'a str>,
    pub device_id: &'a str,
}

impl<'a> VerifyContext<'a> {
    pub fn new(token: &'a str, device_id: &'a str) -> Self {
        Self {
            token: Some(token),
            device_id,
        }
    }

    /// A context for online mode, which needs no token.
    pub fn device_only(device_id: &'a str) -> Self {
        Self {
            token: None,
            device_id,
        }
    }

    fn require_token(&self) -> Result<&'a str, VerifyError> {
        self.token.ok_or_else(|| {
            VerifyError::bare(LicenseError::MalformedToken(
                "no license token supplied".to_string(),
            ))
        })
    }
}

/// One of the three verification modes.
#[derive(Debug, Clone)]
pub enum Verifier {
    Offline(OfflineVerifier),
    #[cfg(feature = "online")]
    Online(OnlineVerifier),
    #[cfg(feature = "online")]
    Dual(DualVerifier),
}

impl Verifier {
    pub fn offline(keys: VerifierKeys) -> Self {
        Self::Offline(OfflineVerifier::new(keys))
    }

    #[cfg(feature = "online")]
    pub fn online(config: OnlineConfig) -> LicenseResult<Self> {
        Ok(Self::Online(OnlineVerifier::new(config)?))
    }

    #[cfg(feature = "online")]
    pub fn dual(keys: VerifierKeys, config: OnlineConfig) -> LicenseResult<Self> {
        Ok(Self::Dual(DualVerifier::new(
            OfflineVerifier::new(keys),
            OnlineVerifier::new(config)?,
        )))
    }

    /// The mode this verifier runs.
    pub fn mode(&self) -> LicenseType {
        match self {
            Self::Offline(_) => LicenseType::Offline,
            #[cfg(feature = "online")]
            Self::Online(_) => LicenseType::Online,
            #[cfg(feature = "online")]
            Self::Dual(_) => LicenseType::Dual,
        }
    }

    /// Runs this mode against `ctx`.
    ///
    /// # Errors
    /// [`LicenseError::MalformedToken`] if the mode needs a token and none was
    /// given; otherwise whatever the underlying mode reports.
    pub async fn verify(&self, ctx: VerifyContext<'_>) -> VerifyOutcome {
        match self {
            Self::Offline(verifier) => verifier.verify(ctx.require_token()?, ctx.device_id),
            #[cfg(feature = "online")]
            Self::Online(verifier) => verifier.verify(ctx.device_id).await,
            #[cfg(feature = "online")]
            Self::Dual(verifier) => {
                verifier
                    .verify(ctx.require_token()?, ctx.device_id)
                    .await
            }
        }
    }
}

/// Offline verification of `token` for `device_id` with `keys`.
pub fn verify_offline(token: &str, device_id: &str, keys: &VerifierKeys) -> VerifyOutcome {
    OfflineVerifier::new(keys.clone()).verify(token, device_id)
}

/// Online verification of `device_id` against the configured authority.
#[cfg(feature = "online")]
pub async fn verify_online(device_id: &str, config: &OnlineConfig) -> VerifyOutcome {
    let verifier = OnlineVerifier::new(config.clone())?;
    verifier.verify(device_id).await
}

/// Dual verification: offline with `keys`, then online with `config`.
#[cfg(feature = "online")]
pub async fn verify_dual(
    token: &str,
    device_id: &str,
    keys: &VerifierKeys,
    config: &OnlineConfig,
) -> VerifyOutcome {
    let verifier = DualVerifier::new(
        OfflineVerifier::new(keys.clone()),
        OnlineVerifier::new(config.clone())?,
    );
    verifier.verify(token, device_id).await
}
