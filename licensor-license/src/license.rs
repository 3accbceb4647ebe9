//! The license payload and the result of verifying one.

use crate::error::{LicenseError, LicenseResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a license is meant to be verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseType {
    /// Local key material only, no network.
    Offline,
    /// Delegated to the remote authority.
    Online,
    /// Both offline and online must pass.
    Dual,
}

impl LicenseType {
    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Online => "online",
            Self::Dual => "dual",
        }
    }
}

impl fmt::Display for LicenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "offline" => Ok(Self::Offline),
            "online" => Ok(Self::Online),
            "dual" => Ok(Self::Dual),
            other => Err(format!(
                "unknown license type '{other}' (expected offline, online or dual)"
            )),
        }
    }
}

/// The protected payload carried inside a license token.
///
/// Field order is the serialization order, so two licenses with equal fields
/// serialize byte-for-byte identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// Device fingerprint the license is bound to.
    pub device_id: String,
    /// Valid while `now <= expiry_date`.
    pub expiry_date: DateTime<Utc>,
    /// Verification mode.
    pub license_type: LicenseType,
    /// Feature names unlocked by this license.
    #[serde(default)]
    pub features: Vec<String>,
    /// Issuance time, informational only.
    pub created_at: DateTime<Utc>,
}

impl License {
    /// Creates a license issued now.
    pub fn new(
        device_id: impl Into<String>,
        license_type: LicenseType,
        expiry_date: DateTime<Utc>,
        features: Vec<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            expiry_date,
            license_type,
            features,
            created_at: Utc::now(),
        }
    }

    /// Strictly after the expiry instant counts as expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry_date
    }

    /// Returns true if `feature` is listed.
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

/// Output of any verification path. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResult {
    pub valid: bool,
    pub expired: bool,
    /// Absent only when the license could not be read at all.
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
    pub device_id: String,
    pub license_type: LicenseType,
    /// Set by dual verification only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline_valid: Option<bool>,
    /// Set by dual verification only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_valid: Option<bool>,
    pub message: String,
}

impl VerifyResult {
    /// Builds the single-mode result for `license` as seen at `now`.
    pub fn for_license(license: &License, now: DateTime<Utc>, message: impl Into<String>) -> Self {
        let expired = license.is_expired_at(now);
        Self {
            valid: !expired,
            expired,
            expiry_date: Some(license.expiry_date),
            device_id: license.device_id.clone(),
            license_type: license.license_type,
            offline_valid: None,
            online_valid: None,
            message: message.into(),
        }
    }
}

/// Parses a `YYYY-MM-DD` expiry date as midnight UTC.
pub fn parse_expiry_date(date: &str) -> LicenseResult<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|e| LicenseError::InvalidExpiryDate(format!("{date}: {e}")))?;
    day.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| LicenseError::InvalidExpiryDate(date.to_string()))
}
