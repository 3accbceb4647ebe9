//! Shared fixtures for crypto tests.

#![allow(dead_code)]

use licensor_crypto::{SigningKey, VerificationKey};

pub const RSA_A_PRIVATE: &str = include_str!("../fixtures/rsa_a.pem");
pub const RSA_A_PRIVATE_PKCS8: &str = include_str!("../fixtures/rsa_a_pkcs8.pem");
pub const RSA_A_PUBLIC: &str = include_str!("../fixtures/rsa_a_pub.pem");
pub const RSA_B_PRIVATE: &str = include_str!("../fixtures/rsa_b.pem");
pub const RSA_B_PUBLIC: &str = include_str!("../fixtures/rsa_b_pub.pem");
pub const EC_PRIVATE: &str = include_str!("../fixtures/ec_priv.pem");
pub const EC_PUBLIC: &str = include_str!("../fixtures/ec_pub.pem");

/// Key pair A (RSA-4096).
pub fn key_pair_a() -> (SigningKey, VerificationKey) {
    let sk = SigningKey::from_pem(RSA_A_PRIVATE).unwrap();
    let vk = VerificationKey::from_pem(RSA_A_PUBLIC).unwrap();
    (sk, vk)
}

/// Key pair B (RSA-4096), unrelated to A.
pub fn key_pair_b() -> (SigningKey, VerificationKey) {
    let sk = SigningKey::from_pem(RSA_B_PRIVATE).unwrap();
    let vk = VerificationKey::from_pem(RSA_B_PUBLIC).unwrap();
    (sk, vk)
}
