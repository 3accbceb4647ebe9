//! Remote license authority.
//!
//! Answers the online half of license verification:
//! - `POST /api/v1/license/verify/online` with `{device_id, app_id}` returns the
//!   [`VerifyResult`] for the license recorded against that device
//! - `POST /api/v1/license/verify/dual` with `{license_key, device_id, app_id}`
//!   does the same for a registered device, and also checks the license key
//!   when the server holds verifier keys
//! - `POST /api/v1/device/register` and `GET /api/v1/device/{device_id}` keep
//!   the device registry
//! - `GET /api/health` for liveness checks
//!
//! When token enforcement is on, every `/api/v1` endpoint requires an
//! `Authorization: Bearer <token>` header naming a live client token for the
//! requested app, or any admin token.

pub mod auth;
mod error;
pub mod keyfiles;
pub mod sqlite;
pub mod store;

pub use error::{ApiError, ErrorBody, ErrorDetail};

use auth::{validate_token, TokenType};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use licensor_license::{LicenseType, OfflineVerifier, VerifierKeys, VerifyResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use store::{DeviceRegistration, DeviceStatus, DeviceStore, LicenseStore, TokenStore};
use tracing::{debug, info, warn};

/// Body of an online verification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub device_id: String,
    #[serde(default)]
    pub app_id: String,
}

/// Body of a server-side dual verification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DualVerifyRequest {
    #[serde(default)]
    pub license_key: String,
    pub device_id: String,
    #[serde(default)]
    pub app_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDeviceRequest {
    pub device_id: String,
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub app_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDeviceResponse {
    pub id: u64,
    pub device_id: String,
    /// Always `"registered"`.
    pub status: String,
}

/// A registered device, plus its license if one is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceResponse {
    pub device_id: String,
    pub device_name: String,
    pub registered_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub status: DeviceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    licenses: Arc<dyn LicenseStore>,
    tokens: Arc<dyn TokenStore>,
    devices: Arc<dyn DeviceStore>,
    offline: Option<OfflineVerifier>,
    require_token: bool,
}

impl AppState {
    /// State backed by one store serving licenses, tokens and devices. Token
    /// enforcement starts off and no verifier keys are held.
    pub fn new<S>(store: Arc<S>) -> Self
    where
        S: LicenseStore + TokenStore + DeviceStore + 'static,
    {
        Self {
            licenses: store.clone(),
            tokens: store.clone(),
            devices: store,
            offline: None,
            require_token: false,
        }
    }

    #[must_use]
    pub fn with_token_enforcement(mut self, require_token: bool) -> Self {
        self.require_token = require_token;
        self
    }

    /// Lets `verify/dual` check the submitted license key itself.
    #[must_use]
    pub fn with_verifier_keys(mut self, keys: VerifierKeys) -> Self {
        self.offline = Some(OfflineVerifier::new(keys));
        self
    }

    fn authorize(
        &self,
        headers: &HeaderMap,
        app_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        if !self.require_token {
            return Ok(());
        }
        let token = bearer_token(headers)
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
        validate_token(self.tokens.as_ref(), token, TokenType::Client, app_id, now)
            .inspect_err(|e| warn!(%app_id, "rejected API token: {e}"))?;
        Ok(())
    }
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

async fn verify_online_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResult>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let now = Utc::now();
    state.authorize(&headers, &request.app_id, now)?;

    let record = state
        .licenses
        .find_license_by_device(&request.device_id)?
        .ok_or_else(|| {
            debug!("no license recorded for device");
            ApiError::LicenseNotFound
        })?;

    let expired = now > record.expiry_date;
    info!(app_id = %request.app_id, expired, "online verification");

    Ok(Json(VerifyResult {
        valid: !expired,
        expired,
        expiry_date: Some(record.expiry_date),
        device_id: request.device_id,
        license_type: record.license_type,
        offline_valid: None,
        online_valid: None,
        message: if expired {
            "License expired".to_string()
        } else {
            "Online verification".to_string()
        },
    }))
}

async fn verify_dual_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<DualVerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResult>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let now = Utc::now();
    state.authorize(&headers, &request.app_id, now)?;

    if state.devices.find_device(&request.device_id)?.is_none() {
        debug!("dual verification for unregistered device");
        return Err(ApiError::DeviceNotFound);
    }
    let record = state
        .licenses
        .find_license_by_device(&request.device_id)?
        .ok_or(ApiError::LicenseNotFound)?;
    state.devices.touch_device(&request.device_id, now)?;

    let expired = now > record.expiry_date;
    let online_valid = !expired;
    // Without verifier keys the license key is not inspected.
    let offline_valid = state.offline.as_ref().map(|offline| {
        offline
            .verify_at(&request.license_key, &request.device_id, now)
            .inspect_err(|e| warn!(error = %e.error, "dual verification: license key rejected"))
            .is_ok()
    });
    let valid = online_valid && offline_valid.unwrap_or(true);
    info!(app_id = %request.app_id, valid, expired, "dual verification");

    let message = if valid {
        "Dual verification"
    } else if expired {
        "License expired"
    } else {
        "Offline verification failed"
    };

    Ok(Json(VerifyResult {
        valid,
        expired,
        expiry_date: Some(record.expiry_date),
        device_id: request.device_id,
        license_type: LicenseType::Dual,
        offline_valid,
        online_valid: Some(online_valid),
        message: message.to_string(),
    }))
}

async fn register_device_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RegisterDeviceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterDeviceResponse>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    if request.device_id.trim().is_empty() {
        return Err(ApiError::InvalidRequest("device_id is required".to_string()));
    }
    let now = Utc::now();
    state.authorize(&headers, &request.app_id, now)?;

    let record = state.devices.register_device(
        DeviceRegistration {
            device_id: request.device_id,
            device_name: request.device_name,
            app_id: request.app_id,
        },
        now,
    )?;
    info!(id = record.id, app_id = %record.app_id, "device registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterDeviceResponse {
            id: record.id,
            device_id: record.device_id,
            status: "registered".to_string(),
        }),
    ))
}

/// Client tokens only see devices registered for their own app, so an
/// unknown device answers 401 to them and 404 to admin tokens.
async fn get_device_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let now = Utc::now();
    let device = state.devices.find_device(&device_id)?;
    let app_id = device.as_ref().map(|d| d.app_id.as_str()).unwrap_or_default();
    state.authorize(&headers, app_id, now)?;
    let device = device.ok_or(ApiError::DeviceNotFound)?;

    let license = state.licenses.find_license_by_device(&device_id)?;
    Ok(Json(DeviceResponse {
        device_id: device.device_id,
        device_name: device.device_name,
        registered_at: device.registered_at,
        last_seen: device.last_seen,
        status: device.status,
        license_status: license.as_ref().map(|_| "active".to_string()),
        expiry_date: license.map(|l| l.expiry_date),
    }))
}

/// Build the HTTP API router over `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/v1/license/verify/online", post(verify_online_handler))
        .route("/api/v1/license/verify/dual", post(verify_dual_handler))
        .route("/api/v1/device/register", post(register_device_handler))
        .route("/api/v1/device/{device_id}", get(get_device_handler))
        .with_state(state)
}
