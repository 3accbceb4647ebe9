mod common;

use common::{AES_KEY, RSA_2048_PRIVATE, RSA_A_PRIVATE, RSA_A_PUBLIC};
use licensor_license::{IssuerKeys, LicenseError, VerifierKeys};
use std::fs;

#[test]
fn issuer_and_verifier_keys_pair_up() {
    let issuer = IssuerKeys::from_bytes(RSA_A_PRIVATE.as_bytes(), &AES_KEY).unwrap();
    let verifier = VerifierKeys::from_bytes(RSA_A_PUBLIC.as_bytes(), &AES_KEY).unwrap();

    let derived = issuer.verifier_keys();
    assert_eq!(derived.verification_key(), verifier.verification_key());
    assert_eq!(derived.symmetric_key(), verifier.symmetric_key());
}

#[test]
fn rejects_2048_bit_keys() {
    let err = IssuerKeys::from_bytes(RSA_2048_PRIVATE.as_bytes(), &AES_KEY).unwrap_err();
    assert!(matches!(err, LicenseError::InvalidKeyFormat(_)));
    assert!(err.to_string().contains("4096"));
}

#[test]
fn rejects_short_symmetric_key() {
    let err = VerifierKeys::from_bytes(RSA_A_PUBLIC.as_bytes(), &[0u8; 16]).unwrap_err();
    assert!(matches!(
        err,
        LicenseError::InvalidKeyLength {
            expected: 32,
            actual: 16
        }
    ));
}

#[test]
fn rejects_swapped_key_kinds() {
    let err = VerifierKeys::from_bytes(RSA_A_PRIVATE.as_bytes(), &AES_KEY).unwrap_err();
    assert!(matches!(err, LicenseError::KeyTypeMismatch(_)));

    let err = IssuerKeys::from_bytes(RSA_A_PUBLIC.as_bytes(), &AES_KEY).unwrap_err();
    assert!(matches!(err, LicenseError::KeyTypeMismatch(_)));
}

#[test]
fn rejects_garbage_pem() {
    let err = VerifierKeys::from_bytes(b"not a pem", &AES_KEY).unwrap_err();
    assert!(matches!(err, LicenseError::InvalidKeyFormat(_)));
}

#[test]
fn load_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let private_path = dir.path().join("private_key.pem");
    let public_path = dir.path().join("public_key.pem");
    let aes_path = dir.path().join("aes_key.bin");
    fs::write(&private_path, RSA_A_PRIVATE).unwrap();
    fs::write(&public_path, RSA_A_PUBLIC).unwrap();
    fs::write(&aes_path, AES_KEY).unwrap();

    let issuer = IssuerKeys::load(&private_path, &aes_path).unwrap();
    let verifier = VerifierKeys::load(&public_path, &aes_path).unwrap();
    assert_eq!(
        issuer.verifier_keys().verification_key(),
        verifier.verification_key()
    );
}

#[test]
fn load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = VerifierKeys::load(&dir.path().join("nope.pem"), &dir.path().join("nope.bin"))
        .unwrap_err();
    assert!(matches!(err, LicenseError::Io(_)));
}
