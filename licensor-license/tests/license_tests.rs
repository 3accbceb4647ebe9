use chrono::{Datelike, Duration, Timelike, Utc};
use licensor_license::{parse_expiry_date, License, LicenseError, LicenseType, VerifyResult};

// ── LicenseType ──────────────────────────────────────────────────

#[test]
fn license_type_wire_names() {
    assert_eq!(serde_json::to_string(&LicenseType::Offline).unwrap(), "\"offline\"");
    assert_eq!(serde_json::to_string(&LicenseType::Online).unwrap(), "\"online\"");
    assert_eq!(serde_json::to_string(&LicenseType::Dual).unwrap(), "\"dual\"");
}

#[test]
fn license_type_from_str() {
    assert_eq!("Dual".parse::<LicenseType>().unwrap(), LicenseType::Dual);
    assert_eq!(" offline ".parse::<LicenseType>().unwrap(), LicenseType::Offline);
    assert!("hybrid".parse::<LicenseType>().is_err());
}

#[test]
fn license_type_rejects_unknown_on_decode() {
    let parsed: Result<LicenseType, _> = serde_json::from_str("\"hybrid\"");
    assert!(parsed.is_err());
}

// ── License ──────────────────────────────────────────────────────

#[test]
fn license_expiry_is_strict() {
    let expiry = Utc::now();
    let license = License::new("d", LicenseType::Offline, expiry, vec![]);
    assert!(!license.is_expired_at(expiry));
    assert!(!license.is_expired_at(expiry - Duration::seconds(1)));
    assert!(license.is_expired_at(expiry + Duration::milliseconds(1)));
}

#[test]
fn license_json_field_names() {
    let license = License::new("d", LicenseType::Dual, Utc::now(), vec!["pro".into()]);
    let value = serde_json::to_value(&license).unwrap();
    for field in ["device_id", "expiry_date", "license_type", "features", "created_at"] {
        assert!(value.get(field).is_some(), "missing {field}");
    }
    assert_eq!(value["license_type"], "dual");
}

#[test]
fn license_features_default_to_empty() {
    let json = r#"{
        "device_id": "d",
        "expiry_date": "2030-01-01T00:00:00Z",
        "license_type": "offline",
        "created_at": "2025-01-01T00:00:00Z"
    }"#;
    let license: License = serde_json::from_str(json).unwrap();
    assert!(license.features.is_empty());
}

// ── VerifyResult ─────────────────────────────────────────────────

#[test]
fn single_mode_result_omits_sub_flags() {
    let license = License::new("d", LicenseType::Offline, Utc::now() + Duration::days(1), vec![]);
    let result = VerifyResult::for_license(&license, Utc::now(), "Offline verification");
    let value = serde_json::to_value(&result).unwrap();
    assert!(value.get("offline_valid").is_none());
    assert!(value.get("online_valid").is_none());
    assert_eq!(value["valid"], true);
}

#[test]
fn result_without_expiry_date_decodes() {
    let json = r#"{
        "valid": false,
        "expired": false,
        "device_id": "d",
        "license_type": "online",
        "message": "not found"
    }"#;
    let result: VerifyResult = serde_json::from_str(json).unwrap();
    assert_eq!(result.expiry_date, None);
    assert_eq!(result.offline_valid, None);
}

// ── parse_expiry_date ────────────────────────────────────────────

#[test]
fn parse_expiry_date_is_midnight_utc() {
    let date = parse_expiry_date("2026-12-31").unwrap();
    assert_eq!((date.year(), date.month(), date.day()), (2026, 12, 31));
    assert_eq!((date.hour(), date.minute(), date.second()), (0, 0, 0));
}

#[test]
fn parse_expiry_date_rejects_other_formats() {
    for bad in ["31/12/2026", "2026-13-01", "tomorrow", ""] {
        let err = parse_expiry_date(bad).unwrap_err();
        assert!(matches!(err, LicenseError::InvalidExpiryDate(_)));
    }
}
