//! Shared fixtures for license tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use licensor_license::{issue, IssuerKeys, LicenseType, VerifierKeys};

pub const RSA_A_PRIVATE: &str = include_str!("../fixtures/rsa_a.pem");
pub const RSA_A_PUBLIC: &str = include_str!("../fixtures/rsa_a_pub.pem");
pub const RSA_B_PRIVATE: &str = include_str!("../fixtures/rsa_b.pem");
pub const RSA_B_PUBLIC: &str = include_str!("../fixtures/rsa_b_pub.pem");
pub const RSA_2048_PRIVATE: &str = include_str!("../fixtures/rsa_2048.pem");

pub const AES_KEY: [u8; 32] = [0x42; 32];
pub const OTHER_AES_KEY: [u8; 32] = [0x24; 32];

pub const DEVICE: &str = "device123";
pub const OTHER_DEVICE: &str = "device999";

/// Issuer keys built from key pair A and [`AES_KEY`].
pub fn issuer_keys() -> IssuerKeys {
    IssuerKeys::from_bytes(RSA_A_PRIVATE.as_bytes(), &AES_KEY).unwrap()
}

/// Verifier keys matching [`issuer_keys`].
pub fn verifier_keys() -> VerifierKeys {
    VerifierKeys::from_bytes(RSA_A_PUBLIC.as_bytes(), &AES_KEY).unwrap()
}

pub fn days_from_now(days: i64) -> DateTime<Utc> {
    Utc::now() + Duration::days(days)
}

/// Issues a token for `device_id` with key pair A.
pub fn issue_token(device_id: &str, license_type: LicenseType, expiry: DateTime<Utc>) -> String {
    let keys = issuer_keys();
    issue(
        device_id,
        license_type,
        expiry,
        vec!["pro".to_string()],
        keys.signing_key(),
        keys.symmetric_key(),
    )
    .unwrap()
}

/// Serves `router` on an ephemeral local port and returns its `/api/v1` base URL.
pub async fn serve(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api/v1")
}

/// A base URL on which nothing is listening.
pub async fn refused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api/v1")
}
