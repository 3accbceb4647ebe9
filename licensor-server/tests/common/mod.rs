//! Shared helpers for server tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use licensor_license::LicenseType;
use licensor_server::auth::TokenType;
use licensor_server::store::{
    DeviceRecord, DeviceStatus, InMemoryStore, LicenseRecord, Records, TokenRecord,
};
use licensor_server::{build_router, AppState};
use std::sync::Arc;

pub const APP_ID: &str = "app-1";
pub const LIVE_DEVICE: &str = "device-live";
pub const EXPIRED_DEVICE: &str = "device-expired";
/// Registered, but no license recorded.
pub const UNLICENSED_DEVICE: &str = "device-unlicensed";
/// Licensed, but never registered.
pub const UNREGISTERED_DEVICE: &str = "device-unregistered";
pub const CLIENT_TOKEN: &str = "client-token";
pub const OTHER_APP_TOKEN: &str = "other-app-token";
pub const ADMIN_TOKEN: &str = "admin-token";
pub const REVOKED_TOKEN: &str = "revoked-token";
pub const EXPIRED_TOKEN: &str = "expired-token";

pub fn license(id: u64, device_id: &str, expiry_date: DateTime<Utc>) -> LicenseRecord {
    LicenseRecord {
        id,
        device_id: device_id.to_string(),
        license_key: String::new(),
        license_type: LicenseType::Online,
        expiry_date,
        created_at: Utc::now(),
    }
}

pub fn device(id: u64, device_id: &str, app_id: &str, license_id: Option<u64>) -> DeviceRecord {
    let now = Utc::now();
    DeviceRecord {
        id,
        device_id: device_id.to_string(),
        device_name: format!("{device_id} laptop"),
        app_id: app_id.to_string(),
        license_id,
        status: DeviceStatus::Active,
        registered_at: now - Duration::days(7),
        last_seen: now - Duration::days(1),
    }
}

pub fn token(
    id: u64,
    value: &str,
    token_type: TokenType,
    app_id: &str,
    expires_at: Option<DateTime<Utc>>,
    revoked: bool,
) -> TokenRecord {
    TokenRecord {
        id,
        token: value.to_string(),
        token_type,
        app_id: app_id.to_string(),
        created_at: Utc::now(),
        expires_at,
        revoked,
    }
}

pub fn seed_records() -> Records {
    let now = Utc::now();
    Records {
        licenses: vec![
            license(1, LIVE_DEVICE, now + Duration::days(30)),
            license(2, EXPIRED_DEVICE, now - Duration::days(1)),
            license(3, UNREGISTERED_DEVICE, now + Duration::days(30)),
        ],
        tokens: vec![
            token(1, CLIENT_TOKEN, TokenType::Client, APP_ID, None, false),
            token(2, OTHER_APP_TOKEN, TokenType::Client, "app-2", None, false),
            token(3, ADMIN_TOKEN, TokenType::Admin, "", None, false),
            token(4, REVOKED_TOKEN, TokenType::Client, APP_ID, None, true),
            token(
                5,
                EXPIRED_TOKEN,
                TokenType::Client,
                APP_ID,
                Some(now - Duration::hours(1)),
                false,
            ),
        ],
        devices: vec![
            device(1, LIVE_DEVICE, APP_ID, Some(1)),
            device(2, EXPIRED_DEVICE, APP_ID, Some(2)),
            device(3, UNLICENSED_DEVICE, APP_ID, None),
        ],
    }
}

/// Spin up the HTTP server over the seed records, returning the base URL.
pub async fn spawn_server(require_token: bool) -> String {
    spawn_state(seeded_state(require_token)).await
}

pub fn seeded_state(require_token: bool) -> AppState {
    let store = Arc::new(InMemoryStore::from_records(seed_records()));
    AppState::new(store).with_token_enforcement(require_token)
}

/// Serve `state` on an OS-assigned port, returning the base URL.
pub async fn spawn_state(state: AppState) -> String {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{port}")
}
