use bip39::Mnemonic;
use weil_types::error::WeilError;
use zeroize::Zeroizing;

/// Generate a new 24-word BIP-39 mnemonic.
pub fn generate_mnemonic() -> Result<Mnemonic, WeilError> {
    // 24 words = 256 bits of entropy
    let mut entropy = Zeroizing::new([0u8; 32]);
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut entropy[..]);
    Mnemonic::from_entropy(&entropy[..]).map_err(|_| WeilError::InvalidMnemonic)
}

/// Parse a mnemonic from a string of space-separated words.
pub fn parse_mnemonic(phrase: &str) -> Result<Mnemonic, WeilError> {
    Mnemonic::parse_normalized(phrase.trim()).map_err(|_| WeilError::InvalidMnemonic)
}

/// Derive the 64-byte BIP-39 seed (PBKDF2) with an optional passphrase.
pub fn mnemonic_to_seed(mnemonic: &Mnemonic, passphrase: &str) -> Zeroizing<[u8; 64]> {
    Zeroizing::new(mnemonic.to_seed(passphrase))
}
