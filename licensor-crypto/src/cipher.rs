//! Payload sealing using AES-256-GCM.
//!
//! A sealed box is `nonce || ciphertext || tag` in one byte sequence.

use crate::error::{CryptoError, CryptoResult};
use crate::key::SymmetricKey;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;

/// Size of nonce in bytes (96 bits for AES-GCM).
pub const NONCE_SIZE: usize = 12;

/// Size of authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Encrypts plaintext, returning `nonce || ciphertext || tag`.
///
/// A fresh random nonce is drawn for every call, so sealing the same
/// plaintext twice yields different boxes.
pub fn seal(key: &SymmetricKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Opens a sealed box produced by [`seal`].
///
/// # Errors
/// Returns [`CryptoError::AuthenticationFailed`] if the box is shorter than a
/// nonce, was sealed under another key, or has been modified.
pub fn open(key: &SymmetricKey, sealed: &[u8]) -> CryptoResult<Vec<u8>> {
    if sealed.len() < NONCE_SIZE {
        return Err(CryptoError::AuthenticationFailed);
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CryptoError::AuthenticationFailed)
}
