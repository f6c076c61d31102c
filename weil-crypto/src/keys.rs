use std::path::Path;

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use weil_types::error::WeilError;
use zeroize::Zeroizing;

use crate::hash::sha256;

/// Length of a raw secret scalar.
pub const SECRET_KEY_LEN: usize = 32;

/// Length of an uncompressed SEC1 public key (`0x04 ‖ X ‖ Y`).
pub const UNCOMPRESSED_PUBLIC_KEY_LEN: usize = 65;

/// Length of a compressed SEC1 public key.
pub const COMPRESSED_PUBLIC_KEY_LEN: usize = 33;

/// Length of a fixed-width `r ‖ s` signature.
pub const SIGNATURE_LEN: usize = 64;

/// Wrapper around a secp256k1 signing key.
pub struct Keypair {
    inner: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        Self {
            inner: SigningKey::random(&mut rand::rngs::OsRng),
        }
    }

    /// Create a keypair from a 32-byte big-endian secret scalar.
    /// Shorter inputs are rejected rather than zero-padded.
    pub fn from_bytes(secret: &[u8]) -> Result<Self, WeilError> {
        if secret.len() != SECRET_KEY_LEN {
            return Err(WeilError::InvalidKeyMaterial);
        }
        let inner = SigningKey::from_slice(secret).map_err(|_| WeilError::InvalidKeyMaterial)?;
        Ok(Self { inner })
    }

    /// Parse a hex-encoded private key. Surrounding whitespace is ignored.
    pub fn from_hex(hex_key: &str) -> Result<Self, WeilError> {
        let trimmed = hex_key.trim();
        if trimmed.is_empty() {
            return Err(WeilError::KeyLoad {
                reason: "private key is empty".to_string(),
            });
        }
        let bytes = Zeroizing::new(hex::decode(trimmed).map_err(|e| WeilError::KeyLoad {
            reason: format!("private key is not valid hex: {}", e),
        })?);
        if bytes.len() != SECRET_KEY_LEN {
            return Err(WeilError::KeyLoad {
                reason: format!(
                    "private key must be {} bytes, got {}",
                    SECRET_KEY_LEN,
                    bytes.len()
                ),
            });
        }
        Self::from_bytes(&bytes).map_err(|_| WeilError::KeyLoad {
            reason: "private key is not a valid secp256k1 scalar".to_string(),
        })
    }

    /// Load a hex-encoded private key from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WeilError> {
        let path = path.as_ref();
        let contents =
            Zeroizing::new(
                std::fs::read_to_string(path).map_err(|e| WeilError::KeyLoad {
                    reason: format!("failed to read '{}': {}", path.display(), e),
                })?,
            );
        Self::from_hex(&contents)
    }

    /// Uncompressed SEC1 public key (65 bytes).
    pub fn public_key(&self) -> [u8; UNCOMPRESSED_PUBLIC_KEY_LEN] {
        let point = self.inner.verifying_key().as_affine().to_encoded_point(false);
        let mut out = [0u8; UNCOMPRESSED_PUBLIC_KEY_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Compressed SEC1 public key (33 bytes).
    pub fn compressed_public_key(&self) -> [u8; COMPRESSED_PUBLIC_KEY_LEN] {
        let point = self.inner.verifying_key().as_affine().to_encoded_point(true);
        let mut out = [0u8; COMPRESSED_PUBLIC_KEY_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Hex of the uncompressed public key, as carried in transaction headers.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }

    /// Get a reference to the underlying signing key.
    pub fn signing_key(&self) -> &SigningKey {
        &self.inner
    }

    /// The 32-byte secret scalar. Wiped when the returned value is dropped.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.inner.to_bytes().into())
    }

    /// Sign the SHA-256 digest of `payload`, returning the hex of the
    /// fixed-width big-endian `r ‖ s` signature.
    pub fn sign(&self, payload: &[u8]) -> Result<String, WeilError> {
        let digest = sha256(payload);
        let signature: Signature =
            self.inner
                .sign_prehash(&digest)
                .map_err(|e| WeilError::Signing {
                    reason: e.to_string(),
                })?;
        Ok(hex::encode(signature.to_bytes()))
    }
}

impl From<SigningKey> for Keypair {
    fn from(inner: SigningKey) -> Self {
        Self { inner }
    }
}

// SigningKey implements ZeroizeOnDrop, so the secret scalar is wiped when
// the Keypair is dropped.

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// Verify a hex `r ‖ s` signature over the SHA-256 digest of `payload`.
/// `public_key` may be compressed or uncompressed SEC1.
pub fn verify(payload: &[u8], signature_hex: &str, public_key: &[u8]) -> Result<(), WeilError> {
    let verifying_key =
        VerifyingKey::from_sec1_bytes(public_key).map_err(|e| WeilError::InvalidPublicKey {
            reason: e.to_string(),
        })?;
    let raw = hex::decode(signature_hex.trim()).map_err(|e| WeilError::InvalidSignature {
        reason: format!("not valid hex: {}", e),
    })?;
    if raw.len() != SIGNATURE_LEN {
        return Err(WeilError::InvalidSignature {
            reason: format!("expected {} bytes, got {}", SIGNATURE_LEN, raw.len()),
        });
    }
    let signature = Signature::from_slice(&raw).map_err(|e| WeilError::InvalidSignature {
        reason: e.to_string(),
    })?;
    let digest = sha256(payload);
    verifying_key
        .verify_prehash(&digest, &signature)
        .map_err(|_| WeilError::InvalidSignature {
            reason: "signature does not match payload and public key".to_string(),
        })
}
