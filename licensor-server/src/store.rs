//! Record storage behind the remote authority.
//!
//! Handlers see three lookups: the license bound to a device, the API token
//! presented with a request, and the registered device itself. Each sits
//! behind a trait; [`SqliteStore`](crate::sqlite::SqliteStore) is the
//! persistent backend and [`InMemoryStore`] serves tests and throwaway
//! servers.

use crate::auth::TokenType;
use chrono::{DateTime, Utc};
use licensor_license::LicenseType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store lock poisoned")]
    Poisoned,

    #[error("token already exists")]
    DuplicateToken,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A license known to the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRecord {
    pub id: u64,
    pub device_id: String,
    /// The issued token, kept for support lookups.
    #[serde(default)]
    pub license_key: String,
    pub license_type: LicenseType,
    pub expiry_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// An API token allowed to call the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub id: u64,
    pub token: String,
    pub token_type: TokenType,
    /// Application the token is scoped to. Ignored for admin tokens.
    #[serde(default)]
    pub app_id: String,
    pub created_at: DateTime<Utc>,
    /// `None` never expires.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub revoked: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    #[default]
    Active,
    Expired,
    Revoked,
}

impl DeviceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "revoked" => Ok(Self::Revoked),
            other => Err(format!("unknown device status: {other}")),
        }
    }
}

/// A device that registered itself with the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: u64,
    pub device_id: String,
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub app_id: String,
    /// License recorded for this device at registration time.
    #[serde(default)]
    pub license_id: Option<u64>,
    #[serde(default)]
    pub status: DeviceStatus,
    pub registered_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Fields a device supplies when registering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRegistration {
    pub device_id: String,
    pub device_name: String,
    pub app_id: String,
}

pub trait LicenseStore: Send + Sync {
    /// The first license recorded for `device_id`.
    fn find_license_by_device(&self, device_id: &str) -> StoreResult<Option<LicenseRecord>>;

    /// Stores `record` and returns its assigned id.
    fn save_license(&self, record: LicenseRecord) -> StoreResult<u64>;
}

pub trait TokenStore: Send + Sync {
    fn find_token(&self, token: &str) -> StoreResult<Option<TokenRecord>>;

    /// Stores `record` and returns its assigned id.
    fn save_token(&self, record: TokenRecord) -> StoreResult<u64>;

    /// Marks `token` revoked. Returns false if it is unknown.
    fn revoke_token(&self, token: &str) -> StoreResult<bool>;
}

pub trait DeviceStore: Send + Sync {
    fn find_device(&self, device_id: &str) -> StoreResult<Option<DeviceRecord>>;

    /// Registers a device, or refreshes name, app and `last_seen` if it is
    /// already known. `id` and `registered_at` survive re-registration.
    fn register_device(
        &self,
        registration: DeviceRegistration,
        now: DateTime<Utc>,
    ) -> StoreResult<DeviceRecord>;

    /// Bumps `last_seen`. Returns false if the device is unknown.
    fn touch_device(&self, device_id: &str, now: DateTime<Utc>) -> StoreResult<bool>;
}

/// Seed data for [`InMemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Records {
    pub licenses: Vec<LicenseRecord>,
    pub tokens: Vec<TokenRecord>,
    pub devices: Vec<DeviceRecord>,
}

fn next_id<T>(items: &[T], id: impl Fn(&T) -> u64) -> u64 {
    items.iter().map(id).max().unwrap_or(0) + 1
}

/// Process-local store. Records are lost on exit.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<Records>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Records) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn snapshot(&self) -> StoreResult<Records> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.clone())
    }
}

impl LicenseStore for InMemoryStore {
    fn find_license_by_device(&self, device_id: &str) -> StoreResult<Option<LicenseRecord>> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records
            .licenses
            .iter()
            .find(|l| l.device_id == device_id)
            .cloned())
    }

    fn save_license(&self, mut record: LicenseRecord) -> StoreResult<u64> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        record.id = next_id(&records.licenses, |l| l.id);
        let id = record.id;
        records.licenses.push(record);
        Ok(id)
    }
}

impl TokenStore for InMemoryStore {
    fn find_token(&self, token: &str) -> StoreResult<Option<TokenRecord>> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.tokens.iter().find(|t| t.token == token).cloned())
    }

    fn save_token(&self, mut record: TokenRecord) -> StoreResult<u64> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        if records.tokens.iter().any(|t| t.token == record.token) {
            return Err(StoreError::DuplicateToken);
        }
        record.id = next_id(&records.tokens, |t| t.id);
        let id = record.id;
        records.tokens.push(record);
        Ok(id)
    }

    fn revoke_token(&self, token: &str) -> StoreResult<bool> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        match records.tokens.iter_mut().find(|t| t.token == token) {
            Some(record) => {
                record.revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl DeviceStore for InMemoryStore {
    fn find_device(&self, device_id: &str) -> StoreResult<Option<DeviceRecord>> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records
            .devices
            .iter()
            .find(|d| d.device_id == device_id)
            .cloned())
    }

    fn register_device(
        &self,
        registration: DeviceRegistration,
        now: DateTime<Utc>,
    ) -> StoreResult<DeviceRecord> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        let license_id = records
            .licenses
            .iter()
            .find(|l| l.device_id == registration.device_id)
            .map(|l| l.id);

        if let Some(existing) = records
            .devices
            .iter_mut()
            .find(|d| d.device_id == registration.device_id)
        {
            existing.device_name = registration.device_name;
            existing.app_id = registration.app_id;
            existing.license_id = license_id.or(existing.license_id);
            existing.last_seen = now;
            return Ok(existing.clone());
        }

        let record = DeviceRecord {
            id: next_id(&records.devices, |d| d.id),
            device_id: registration.device_id,
            device_name: registration.device_name,
            app_id: registration.app_id,
            license_id,
            status: DeviceStatus::Active,
            registered_at: now,
            last_seen: now,
        };
        records.devices.push(record.clone());
        Ok(record)
    }

    fn touch_device(&self, device_id: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        match records.devices.iter_mut().find(|d| d.device_id == device_id) {
            Some(device) => {
                device.last_seen = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
