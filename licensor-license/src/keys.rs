//! Key bundles for issuing and verifying tokens.
//!
//! Tokens carry no key identifier, so the caller decides which key material
//! applies and hands it in explicitly. The token layout splits at a fixed
//! 512-byte signature, so only RSA-4096 keys are accepted.

use crate::error::{LicenseError, LicenseResult};
use licensor_crypto::{SigningKey, SymmetricKey, VerificationKey, RSA_KEY_BITS};
use std::fs;
use std::path::Path;

/// Key material held by the issuer: the private signing key and the shared
/// symmetric key.
#[derive(Debug, Clone)]
pub struct IssuerKeys {
    signing_key: SigningKey,
    symmetric_key: SymmetricKey,
}

impl IssuerKeys {
    /// Bundles already-decoded keys.
    ///
    /// # Errors
    /// [`LicenseError::InvalidKeyFormat`] if the signing key is not RSA-4096.
    pub fn new(signing_key: SigningKey, symmetric_key: SymmetricKey) -> LicenseResult<Self> {
        check_bits(signing_key.bits())?;
        Ok(Self {
            signing_key,
            symmetric_key,
        })
    }

    /// Decodes a PEM private key and raw 32-byte symmetric key.
    pub fn from_bytes(private_key_pem: &[u8], symmetric_key: &[u8]) -> LicenseResult<Self> {
        let pem = pem_str(private_key_pem)?;
        Self::new(
            SigningKey::from_pem(pem)?,
            SymmetricKey::from_slice(symmetric_key)?,
        )
    }

    /// Loads `private_key.pem` / `aes_key.bin` style files.
    pub fn load(private_key_path: &Path, symmetric_key_path: &Path) -> LicenseResult<Self> {
        Self::from_bytes(
            &fs::read(private_key_path)?,
            &fs::read(symmetric_key_path)?,
        )
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn symmetric_key(&self) -> &SymmetricKey {
        &self.symmetric_key
    }

    /// The verifier-side bundle matching these keys.
    pub fn verifier_keys(&self) -> VerifierKeys {
        VerifierKeys {
            verification_key: self.signing_key.verification_key(),
            symmetric_key: self.symmetric_key.clone(),
        }
    }
}

/// Key material held by verifiers: the public verification key and the
/// shared symmetric key.
#[derive(Debug, Clone)]
pub struct VerifierKeys {
    verification_key: VerificationKey,
    symmetric_key: SymmetricKey,
}

impl VerifierKeys {
    /// Bundles already-decoded keys.
    ///
    /// # Errors
    /// [`LicenseError::InvalidKeyFormat`] if the verification key is not RSA-4096.
    pub fn new(
        verification_key: VerificationKey,
        symmetric_key: SymmetricKey,
    ) -> LicenseResult<Self> {
        check_bits(verification_key.bits())?;
        Ok(Self {
            verification_key,
            symmetric_key,
        })
    }

    /// Decodes a PEM public key and raw 32-byte symmetric key.
    pub fn from_bytes(public_key_pem: &[u8], symmetric_key: &[u8]) -> LicenseResult<Self> {
        let pem = pem_str(public_key_pem)?;
        Self::new(
            VerificationKey::from_pem(pem)?,
            SymmetricKey::from_slice(symmetric_key)?,
        )
    }

    /// Loads `public_key.pem` / `aes_key.bin` style files.
    pub fn load(public_key_path: &Path, symmetric_key_path: &Path) -> LicenseResult<Self> {
        Self::from_bytes(
            &fs::read(public_key_path)?,
            &fs::read(symmetric_key_path)?,
        )
    }

    pub fn verification_key(&self) -> &VerificationKey {
        &self.verification_key
    }

    pub fn symmetric_key(&self) -> &SymmetricKey {
        &self.symmetric_key
    }
}

fn check_bits(bits: usize) -> LicenseResult<()> {
    if bits != RSA_KEY_BITS {
        return Err(LicenseError::InvalidKeyFormat(format!(
            "RSA key must be {RSA_KEY_BITS} bits, got {bits}"
        )));
    }
    Ok(())
}

fn pem_str(bytes: &[u8]) -> LicenseResult<&str> {
    std::str::from_utf8(bytes)
        .map_err(|e| LicenseError::InvalidKeyFormat(format!("PEM is not UTF-8: {e}")))
}
