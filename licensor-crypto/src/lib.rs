//! Cryptographic primitives for licensor tokens.
//!
//! - [`cipher`]: AES-256-GCM sealed boxes (`nonce || ciphertext || tag`)
//! - [`signer`]: RSA-PSS/SHA-256 signatures and PEM key armor
//! - [`key`]: the shared AES-256 key
//!
//! Everything here is stateless; key material is always passed in.

pub mod cipher;
mod error;
pub mod key;
pub mod signer;

pub use cipher::{open, seal, NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use key::{SymmetricKey, KEY_SIZE};
pub use signer::{
    generate_signing_key, sign, verify, SigningKey, VerificationKey, RSA_KEY_BITS, SIGNATURE_SIZE,
};
