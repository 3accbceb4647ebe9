//! RSA-PSS signatures over SHA-256 digests, plus PEM key armor.
//!
//! Private keys encode as PKCS#1 (`RSA PRIVATE KEY`), public keys as SPKI
//! (`PUBLIC KEY`). Decoding additionally accepts PKCS#8 private keys and
//! PKCS#1 public keys.

use crate::error::{CryptoError, CryptoResult};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, LineEnding};
use rsa::pkcs8::{spki, DecodePrivateKey, DecodePublicKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Pss, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Modulus size used for license signing keys.
pub const RSA_KEY_BITS: usize = 4096;

/// Signature length in bytes for a [`RSA_KEY_BITS`] key.
pub const SIGNATURE_SIZE: usize = RSA_KEY_BITS / 8;

/// The private half of the license key pair. Held only by the issuer.
#[derive(Clone)]
pub struct SigningKey {
    inner: RsaPrivateKey,
}

impl SigningKey {
    /// Decodes a PEM private key.
    ///
    /// # Errors
    /// [`CryptoError::KeyTypeMismatch`] if the armor holds a public key or a
    /// non-RSA private key, [`CryptoError::InvalidKeyFormat`] otherwise.
    pub fn from_pem(pem: &str) -> CryptoResult<Self> {
        let pkcs1_err = match RsaPrivateKey::from_pkcs1_pem(pem) {
            Ok(inner) => return Ok(Self { inner }),
            Err(e) => e,
        };

        match RsaPrivateKey::from_pkcs8_pem(pem) {
            Ok(inner) => Ok(Self { inner }),
            Err(rsa::pkcs8::Error::PublicKey(spki::Error::OidUnknown { .. })) => {
                Err(CryptoError::KeyTypeMismatch {
                    expected: "RSA private key",
                    found: "non-RSA private key",
                })
            }
            Err(_) if looks_like_public_key(pem) => Err(CryptoError::KeyTypeMismatch {
                expected: "RSA private key",
                found: "public key",
            }),
            Err(_) => Err(CryptoError::InvalidKeyFormat(pkcs1_err.to_string())),
        }
    }

    /// Encodes the key as a PKCS#1 PEM document.
    pub fn to_pem(&self) -> CryptoResult<Zeroizing<String>> {
        self.inner
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))
    }

    /// Returns the matching verification key.
    pub fn verification_key(&self) -> VerificationKey {
        VerificationKey {
            inner: self.inner.to_public_key(),
        }
    }

    /// Signature length in bytes produced by this key.
    pub fn signature_size(&self) -> usize {
        self.inner.size()
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        self.inner.n().bits()
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("bits", &self.bits())
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// The public half of the license key pair. Distributed to verifiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationKey {
    inner: RsaPublicKey,
}

impl VerificationKey {
    /// Decodes a PEM public key.
    ///
    /// # Errors
    /// [`CryptoError::KeyTypeMismatch`] if the armor holds a private key or a
    /// non-RSA public key, [`CryptoError::InvalidKeyFormat`] otherwise.
    pub fn from_pem(pem: &str) -> CryptoResult<Self> {
        let spki_err = match RsaPublicKey::from_public_key_pem(pem) {
            Ok(inner) => return Ok(Self { inner }),
            Err(spki::Error::OidUnknown { .. }) => {
                return Err(CryptoError::KeyTypeMismatch {
                    expected: "RSA public key",
                    found: "non-RSA public key",
                });
            }
            Err(e) => e,
        };

        if let Ok(inner) = RsaPublicKey::from_pkcs1_pem(pem) {
            return Ok(Self { inner });
        }

        if looks_like_private_key(pem) {
            return Err(CryptoError::KeyTypeMismatch {
                expected: "RSA public key",
                found: "private key",
            });
        }

        Err(CryptoError::InvalidKeyFormat(spki_err.to_string()))
    }

    /// Encodes the key as an SPKI PEM document.
    pub fn to_pem(&self) -> CryptoResult<String> {
        self.inner
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))
    }

    /// Signature length in bytes this key verifies.
    pub fn signature_size(&self) -> usize {
        self.inner.size()
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        self.inner.n().bits()
    }
}

/// Generates a new [`RSA_KEY_BITS`] signing key. Slow: expect seconds.
pub fn generate_signing_key() -> CryptoResult<SigningKey> {
    let mut rng = rand::rngs::OsRng;
    let inner = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
    Ok(SigningKey { inner })
}

/// Signs `message` with RSA-PSS over its SHA-256 digest.
///
/// PSS salts are random, so signing identical input twice gives different
/// signatures.
pub fn sign(message: &[u8], key: &SigningKey) -> CryptoResult<Vec<u8>> {
    let digest = Sha256::digest(message);
    let mut rng = rand::rngs::OsRng;
    key.inner
        .sign_with_rng(&mut rng, Pss::new::<Sha256>(), &digest)
        .map_err(|e| CryptoError::Signing(e.to_string()))
}

/// Verifies an RSA-PSS signature produced by [`sign`].
///
/// Returns `Ok(false)` on any mismatch.
///
/// # Errors
/// [`CryptoError::MalformedSignature`] if `signature` is not exactly the key's
/// modulus length.
pub fn verify(message: &[u8], signature: &[u8], key: &VerificationKey) -> CryptoResult<bool> {
    let expected = key.signature_size();
    if signature.len() != expected {
        return Err(CryptoError::MalformedSignature {
            expected,
            actual: signature.len(),
        });
    }

    let digest = Sha256::digest(message);
    Ok(key
        .inner
        .verify(Pss::new::<Sha256>(), &digest, signature)
        .is_ok())
}

fn looks_like_public_key(pem: &str) -> bool {
    pem.contains("PUBLIC KEY-----")
}

fn looks_like_private_key(pem: &str) -> bool {
    pem.contains("PRIVATE KEY-----")
}
