use weil_types::error::WeilError;

use crate::hash::{keccak256, sha256};
use crate::keys::UNCOMPRESSED_PUBLIC_KEY_LEN;

/// How an address was derived from a public key.
///
/// The two schemes are not interchangeable: the same key yields unrelated
/// addresses under each, so callers must keep track of which one produced a
/// given address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AddressScheme {
    /// `hex(SHA-256(uncompressed public key))`. Used by key-file accounts.
    #[default]
    Direct,
    /// `0x` + hex of the last 20 bytes of Keccak-256 over the 64-byte point.
    /// Used by accounts derived from a mnemonic.
    Derived,
}

/// Scheme A: hex of the SHA-256 of the 65-byte uncompressed key.
pub fn direct_address(public_key: &[u8; UNCOMPRESSED_PUBLIC_KEY_LEN]) -> String {
    hex::encode(sha256(public_key))
}

/// Scheme B: `0x` followed by the last 20 bytes of Keccak-256 over the
/// uncompressed point without its SEC1 tag. Accepts the key in 65- or
/// 64-byte form.
pub fn derived_address(public_key: &[u8]) -> Result<String, WeilError> {
    let point = match public_key.len() {
        65 if public_key[0] == 0x04 => &public_key[1..],
        64 => public_key,
        n => {
            return Err(WeilError::InvalidPublicKey {
                reason: format!("expected an uncompressed key of 64 or 65 bytes, got {}", n),
            })
        }
    };
    Ok(keccak_address(point))
}

fn keccak_address(point: &[u8]) -> String {
    let hash = keccak256(point);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Derive an address from an uncompressed public key under `scheme`.
pub fn pubkey_to_address(
    public_key: &[u8; UNCOMPRESSED_PUBLIC_KEY_LEN],
    scheme: AddressScheme,
) -> String {
    match scheme {
        AddressScheme::Direct => direct_address(public_key),
        AddressScheme::Derived => keccak_address(&public_key[1..]),
    }
}
