//! Device-bound license tokens.
//!
//! This crate handles:
//! - Issuing tokens: a JSON [`License`] sealed with AES-256-GCM, the sealed
//!   box signed with RSA-PSS-4096, all base64-encoded
//! - Offline verification with local key material
//! - Online verification against a remote authority
//! - Dual verification, where both must pass
//! - Device fingerprinting for license binding
//!
//! # Token Format
//!
//! `base64(signature[512] || nonce[12] || ciphertext || tag[16])`
//!
//! The signature covers everything after it. A token that fails the signature
//! check is never decrypted.
//!
//! # Verification Modes
//!
//! The caller chooses the mode. The `license_type` field inside a token is
//! informational and does not route verification.

mod codec;
mod device;
mod error;
mod keys;
mod license;
mod verify;

pub use codec::{decode, encode, issue, load_token_from_file, SIGNATURE_LEN};
pub use device::{
    canonical_arch, canonical_os, derive_device_id, device_id_from_parts, DeviceFingerprint,
    DeviceInfo,
};
pub use error::{LicenseError, LicenseResult, VerifyError, VerifyOutcome};
pub use keys::{IssuerKeys, VerifierKeys};
pub use license::{parse_expiry_date, License, LicenseType, VerifyResult};
pub use verify::{verify_offline, OfflineVerifier, Verifier, VerifyContext};

#[cfg(feature = "online")]
pub use verify::{
    combine, verify_dual, verify_online, DualVerifier, OnlineConfig, OnlineVerifier,
    DEFAULT_TIMEOUT_MS, VERIFY_ONLINE_PATH,
};
