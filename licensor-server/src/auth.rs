//! API token lifecycle.

use crate::store::{StoreError, TokenRecord, TokenStore};
use base64::{engine::general_purpose::URL_SAFE, Engine};
use chrono::{DateTime, Duration, Months, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Random bytes in a freshly generated token.
pub const DEFAULT_TOKEN_BYTES: usize = 32;

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Scoped to one application.
    Client,
    /// Any application.
    Admin,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Client => "client",
            Self::Admin => "admin",
        })
    }
}

impl FromStr for TokenType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown token type '{other}' (expected client or admin)")),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unknown token")]
    UnknownToken,

    #[error("token revoked")]
    Revoked,

    #[error("token expired")]
    Expired,

    #[error("token type {found} cannot be used where {required} is required")]
    WrongType { required: TokenType, found: TokenType },

    #[error("token is not valid for this application")]
    WrongApp,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// URL-safe base64 of `len` random bytes.
pub fn generate_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE.encode(bytes)
}

/// Expiry `days` from now. Zero means effectively never: 100 years out.
pub fn token_expiry(days: u32) -> DateTime<Utc> {
    let now = Utc::now();
    if days == 0 {
        return now
            .checked_add_months(Months::new(100 * 12))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
    }
    now + Duration::days(i64::from(days))
}

/// Builds an unsaved token record with a fresh random token.
pub fn new_token_record(token_type: TokenType, app_id: &str, days: u32) -> TokenRecord {
    TokenRecord {
        id: 0,
        token: generate_token(DEFAULT_TOKEN_BYTES),
        token_type,
        app_id: app_id.to_string(),
        created_at: Utc::now(),
        expires_at: Some(token_expiry(days)),
        revoked: false,
    }
}

/// Checks `token` against the store.
///
/// Admin tokens satisfy any requirement and any app. Client tokens satisfy a
/// client requirement only for their own `app_id`.
pub fn validate_token(
    store: &dyn TokenStore,
    token: &str,
    required: TokenType,
    app_id: &str,
    now: DateTime<Utc>,
) -> Result<TokenRecord, AuthError> {
    let record = store.find_token(token)?.ok_or(AuthError::UnknownToken)?;

    if record.revoked {
        return Err(AuthError::Revoked);
    }
    if record.expires_at.is_some_and(|at| now > at) {
        return Err(AuthError::Expired);
    }

    match (required, record.token_type) {
        (_, TokenType::Admin) => {}
        (TokenType::Client, TokenType::Client) => {
            if record.app_id != app_id {
                return Err(AuthError::WrongApp);
            }
        }
        (TokenType::Admin, TokenType::Client) => {
            return Err(AuthError::WrongType {
                required,
                found: record.token_type,
            });
        }
    }

    Ok(record)
}
