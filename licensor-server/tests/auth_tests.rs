mod common;

use base64::{engine::general_purpose::URL_SAFE, Engine};
use chrono::{Duration, Utc};
use common::{
    seed_records, token, ADMIN_TOKEN, APP_ID, CLIENT_TOKEN, EXPIRED_TOKEN, OTHER_APP_TOKEN,
    REVOKED_TOKEN,
};
use licensor_server::auth::{
    generate_token, new_token_record, token_expiry, validate_token, AuthError, TokenType,
    DEFAULT_TOKEN_BYTES,
};
use licensor_server::store::{InMemoryStore, TokenStore};

fn store() -> InMemoryStore {
    InMemoryStore::from_records(seed_records())
}

#[test]
fn generated_tokens_are_url_safe_and_unique() {
    let a = generate_token(DEFAULT_TOKEN_BYTES);
    let b = generate_token(DEFAULT_TOKEN_BYTES);
    assert_ne!(a, b);
    assert_eq!(URL_SAFE.decode(&a).unwrap().len(), DEFAULT_TOKEN_BYTES);
    assert!(!a.contains('+') && !a.contains('/'));
}

#[test]
fn token_expiry_in_days() {
    let expiry = token_expiry(7);
    let delta = expiry - Utc::now();
    assert!(delta > Duration::days(6) && delta <= Duration::days(7));
}

#[test]
fn zero_day_expiry_is_a_century_out() {
    let expiry = token_expiry(0);
    assert!(expiry - Utc::now() > Duration::days(365 * 99));
}

#[test]
fn client_token_valid_for_its_app() {
    let record = validate_token(&store(), CLIENT_TOKEN, TokenType::Client, APP_ID, Utc::now())
        .unwrap();
    assert_eq!(record.token_type, TokenType::Client);
}

#[test]
fn client_token_rejected_for_other_app() {
    let err = validate_token(&store(), OTHER_APP_TOKEN, TokenType::Client, APP_ID, Utc::now())
        .unwrap_err();
    assert!(matches!(err, AuthError::WrongApp));
}

#[test]
fn client_token_cannot_act_as_admin() {
    let err = validate_token(&store(), CLIENT_TOKEN, TokenType::Admin, APP_ID, Utc::now())
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::WrongType {
            required: TokenType::Admin,
            found: TokenType::Client
        }
    ));
}

#[test]
fn admin_token_valid_anywhere() {
    let store = store();
    for required in [TokenType::Client, TokenType::Admin] {
        assert!(validate_token(&store, ADMIN_TOKEN, required, "whatever", Utc::now()).is_ok());
    }
}

#[test]
fn revoked_and_expired_tokens_rejected() {
    let store = store();
    let err = validate_token(&store, REVOKED_TOKEN, TokenType::Client, APP_ID, Utc::now())
        .unwrap_err();
    assert!(matches!(err, AuthError::Revoked));

    let err = validate_token(&store, EXPIRED_TOKEN, TokenType::Client, APP_ID, Utc::now())
        .unwrap_err();
    assert!(matches!(err, AuthError::Expired));
}

#[test]
fn unknown_token_rejected() {
    let err = validate_token(&store(), "nope", TokenType::Client, APP_ID, Utc::now()).unwrap_err();
    assert!(matches!(err, AuthError::UnknownToken));
}

#[test]
fn expiry_is_checked_against_supplied_clock() {
    let store = InMemoryStore::new();
    let expires = Utc::now() + Duration::days(1);
    store
        .save_token(token(0, "t", TokenType::Client, APP_ID, Some(expires), false))
        .unwrap();

    assert!(validate_token(&store, "t", TokenType::Client, APP_ID, expires).is_ok());
    let later = expires + Duration::seconds(1);
    assert!(matches!(
        validate_token(&store, "t", TokenType::Client, APP_ID, later),
        Err(AuthError::Expired)
    ));
}

#[test]
fn revoking_a_token_takes_effect() {
    let store = store();
    assert!(store.revoke_token(CLIENT_TOKEN).unwrap());
    assert!(!store.revoke_token("missing").unwrap());

    let err = validate_token(&store, CLIENT_TOKEN, TokenType::Client, APP_ID, Utc::now())
        .unwrap_err();
    assert!(matches!(err, AuthError::Revoked));
}

#[test]
fn new_token_record_is_usable() {
    let store = InMemoryStore::new();
    let record = new_token_record(TokenType::Client, APP_ID, 30);
    let value = record.token.clone();
    store.save_token(record).unwrap();
    assert!(validate_token(&store, &value, TokenType::Client, APP_ID, Utc::now()).is_ok());
}

#[test]
fn token_type_parsing() {
    assert_eq!("Admin".parse::<TokenType>().unwrap(), TokenType::Admin);
    assert_eq!("client".parse::<TokenType>().unwrap(), TokenType::Client);
    assert!("root".parse::<TokenType>().is_err());
    assert_eq!(serde_json::to_string(&TokenType::Admin).unwrap(), "\"admin\"");
}
