mod common;

use chrono::{Duration, Utc};
use common::{license, seed_records, token, APP_ID, CLIENT_TOKEN, LIVE_DEVICE, UNREGISTERED_DEVICE};
use licensor_server::auth::TokenType;
use licensor_server::store::{
    DeviceRegistration, DeviceStatus, DeviceStore, InMemoryStore, LicenseStore, Records,
    StoreError, TokenStore,
};

#[test]
fn finds_first_license_for_device() {
    let now = Utc::now();
    let store = InMemoryStore::from_records(Records {
        licenses: vec![
            license(1, "d", now + Duration::days(1)),
            license(2, "d", now + Duration::days(9)),
        ],
        ..Records::default()
    });

    let found = store.find_license_by_device("d").unwrap().unwrap();
    assert_eq!(found.id, 1);
    assert!(store.find_license_by_device("other").unwrap().is_none());
}

#[test]
fn save_assigns_increasing_ids() {
    let store = InMemoryStore::from_records(seed_records());
    let id = store
        .save_license(license(0, "new-device", Utc::now() + Duration::days(1)))
        .unwrap();
    assert_eq!(id, 4);
    assert_eq!(store.find_license_by_device("new-device").unwrap().unwrap().id, 4);
}

#[test]
fn duplicate_token_rejected() {
    let store = InMemoryStore::from_records(seed_records());
    let err = store
        .save_token(token(0, CLIENT_TOKEN, TokenType::Client, APP_ID, None, false))
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateToken));
}

#[test]
fn snapshot_reflects_writes() {
    let store = InMemoryStore::new();
    store
        .save_license(license(0, "d", Utc::now() + Duration::days(1)))
        .unwrap();
    assert_eq!(store.snapshot().unwrap().licenses.len(), 1);
}

fn registration(device_id: &str, name: &str) -> DeviceRegistration {
    DeviceRegistration {
        device_id: device_id.to_string(),
        device_name: name.to_string(),
        app_id: APP_ID.to_string(),
    }
}

#[test]
fn registering_links_existing_license() {
    let store = InMemoryStore::from_records(seed_records());
    let now = Utc::now();
    let device = store
        .register_device(registration(UNREGISTERED_DEVICE, "desk"), now)
        .unwrap();

    assert_eq!(device.id, 4);
    assert_eq!(device.license_id, Some(3));
    assert_eq!(device.status, DeviceStatus::Active);
    assert_eq!(device.registered_at, now);
    assert_eq!(device.last_seen, now);
    assert_eq!(store.find_device(UNREGISTERED_DEVICE).unwrap(), Some(device));
}

#[test]
fn reregistering_refreshes_but_keeps_identity() {
    let store = InMemoryStore::from_records(seed_records());
    let original = store.find_device(LIVE_DEVICE).unwrap().unwrap();
    let later = Utc::now() + Duration::minutes(5);

    let updated = store
        .register_device(registration(LIVE_DEVICE, "renamed"), later)
        .unwrap();
    assert_eq!(updated.id, original.id);
    assert_eq!(updated.registered_at, original.registered_at);
    assert_eq!(updated.license_id, original.license_id);
    assert_eq!(updated.device_name, "renamed");
    assert_eq!(updated.last_seen, later);
    assert_eq!(store.snapshot().unwrap().devices.len(), 3);
}

#[test]
fn touching_unknown_device_reports_false() {
    let store = InMemoryStore::from_records(seed_records());
    let now = Utc::now();
    assert!(store.touch_device(LIVE_DEVICE, now).unwrap());
    assert_eq!(store.find_device(LIVE_DEVICE).unwrap().unwrap().last_seen, now);
    assert!(!store.touch_device("nobody", now).unwrap());
}
