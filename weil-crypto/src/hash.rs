use sha2::{Digest, Sha256};
use sha3::Keccak256;

/// Compute the SHA-256 hash of the given data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Compute the Keccak-256 hash of the given data.
///
/// This is the original Keccak padding, not NIST SHA3-256; the two produce
/// different digests for the same input.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}
