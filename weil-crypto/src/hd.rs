//! Hierarchically derived accounts.
//!
//! Keys follow BIP-32 over secp256k1, seeded from a BIP-39 mnemonic. Every
//! account lives under [`DERIVATION_PATH`] at a non-hardened child index, and
//! its address uses [`AddressScheme::Derived`].

use std::collections::HashMap;
use std::path::Path;

use bip32::{ChildNumber, DerivationPath, XPrv};
use bip39::Mnemonic;
use serde::{Deserialize, Serialize};
use weil_types::constants::{DERIVATION_PATH, STORED_WALLET_VERSION};
use weil_types::error::WeilError;
use zeroize::Zeroizing;

use crate::address::{pubkey_to_address, AddressScheme};
use crate::keys::{Keypair, UNCOMPRESSED_PUBLIC_KEY_LEN};
use crate::seed::{generate_mnemonic, mnemonic_to_seed, parse_mnemonic};

/// First index of the hardened range.
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

fn derivation_err(e: bip32::Error) -> WeilError {
    WeilError::Derivation {
        reason: e.to_string(),
    }
}

/// A BIP-32 extended private key.
#[derive(Clone)]
pub struct ExtendedKey {
    xprv: XPrv,
    keypair: Keypair,
}

impl ExtendedKey {
    fn from_xprv(xprv: XPrv) -> Self {
        let keypair = Keypair::from(xprv.private_key().clone());
        Self { xprv, keypair }
    }

    /// Master key for a BIP-39 seed.
    pub fn master(seed: &[u8]) -> Result<Self, WeilError> {
        XPrv::new(seed)
            .map(Self::from_xprv)
            .map_err(derivation_err)
    }

    /// Child key at `index`. Indices at or above [`HARDENED_OFFSET`] are hardened.
    pub fn child(&self, index: u32) -> Result<Self, WeilError> {
        let child = ChildNumber::new(index % HARDENED_OFFSET, index >= HARDENED_OFFSET)
            .map_err(derivation_err)?;
        self.xprv
            .derive_child(child)
            .map(Self::from_xprv)
            .map_err(derivation_err)
    }

    /// Walk `path` from this key.
    pub fn derive(&self, path: &DerivationPath) -> Result<Self, WeilError> {
        let mut xprv = self.xprv.clone();
        for child in path.iter() {
            xprv = xprv.derive_child(child).map_err(derivation_err)?;
        }
        Ok(Self::from_xprv(xprv))
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.xprv.attrs().chain_code
    }
}

impl std::fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtendedKey")
            .field("keypair", &self.keypair)
            .field("depth", &self.xprv.attrs().depth)
            .finish_non_exhaustive()
    }
}

/// Parse a path such as `m/44'/9345'/0'/0`. Both `'` and `h` mark a hardened
/// component.
pub fn parse_path(path: &str) -> Result<DerivationPath, WeilError> {
    path.trim()
        .replace('h', "'")
        .parse::<DerivationPath>()
        .map_err(|e| WeilError::Derivation {
            reason: format!("invalid path '{}': {}", path, e),
        })
}

/// An account derived from a [`MnemonicWallet`].
#[derive(Debug, Clone)]
pub struct WalletAccount {
    pub index: u32,
    pub keypair: Keypair,
    pub public_key: [u8; UNCOMPRESSED_PUBLIC_KEY_LEN],
    pub address: String,
}

/// On-disk form of a mnemonic wallet.
#[derive(Debug, Serialize, Deserialize)]
struct StoredWallet {
    version: u32,
    mnemonic: String,
    derivation_path: String,
}

/// A BIP-39 mnemonic and the accounts derived from it.
pub struct MnemonicWallet {
    mnemonic: Mnemonic,
    derivation_path: String,
    base: ExtendedKey,
    accounts: HashMap<u32, WalletAccount>,
}

impl MnemonicWallet {
    /// Create a wallet with a freshly generated 24-word mnemonic.
    pub fn generate() -> Result<Self, WeilError> {
        Self::from_mnemonic(generate_mnemonic()?)
    }

    /// Restore a wallet from a mnemonic phrase.
    pub fn from_phrase(phrase: &str) -> Result<Self, WeilError> {
        Self::from_mnemonic(parse_mnemonic(phrase)?)
    }

    pub fn from_mnemonic(mnemonic: Mnemonic) -> Result<Self, WeilError> {
        Self::with_path(mnemonic, DERIVATION_PATH)
    }

    fn with_path(mnemonic: Mnemonic, derivation_path: &str) -> Result<Self, WeilError> {
        let path = parse_path(derivation_path)?;
        let seed = mnemonic_to_seed(&mnemonic, "");
        let base = XPrv::derive_from_path(&seed[..], &path)
            .map(ExtendedKey::from_xprv)
            .map_err(derivation_err)?;
        Ok(Self {
            mnemonic,
            derivation_path: derivation_path.to_string(),
            base,
            accounts: HashMap::new(),
        })
    }

    pub fn mnemonic(&self) -> &Mnemonic {
        &self.mnemonic
    }

    pub fn derivation_path(&self) -> &str {
        &self.derivation_path
    }

    /// Account at the non-hardened child `index` of the base path.
    pub fn derive_account(&mut self, index: u32) -> Result<WalletAccount, WeilError> {
        if let Some(account) = self.accounts.get(&index) {
            return Ok(account.clone());
        }
        if index >= HARDENED_OFFSET {
            return Err(WeilError::Derivation {
                reason: format!("account index {} is in the hardened range", index),
            });
        }
        let keypair = self.base.child(index)?.keypair().clone();
        let public_key = keypair.public_key();
        let account = WalletAccount {
            index,
            address: pubkey_to_address(&public_key, AddressScheme::Derived),
            public_key,
            keypair,
        };
        self.accounts.insert(index, account.clone());
        Ok(account)
    }

    /// Write the wallet as JSON. The file is created owner-only on Unix.
    pub fn store(&self, path: impl AsRef<Path>) -> Result<(), WeilError> {
        let path = path.as_ref();
        let file_err = |reason: String| WeilError::WalletFile {
            path: path.display().to_string(),
            reason,
        };
        let stored = StoredWallet {
            version: STORED_WALLET_VERSION,
            mnemonic: self.mnemonic.to_string(),
            derivation_path: self.derivation_path.clone(),
        };
        let data = Zeroizing::new(
            serde_json::to_string_pretty(&stored).map_err(|e| file_err(e.to_string()))?,
        );
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| file_err(e.to_string()))?;
            }
        }

        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path)
                .map_err(|e| file_err(e.to_string()))?;
            file.write_all(data.as_bytes())
                .map_err(|e| file_err(e.to_string()))?;
        }

        #[cfg(not(unix))]
        {
            std::fs::write(path, data.as_bytes()).map_err(|e| file_err(e.to_string()))?;
        }

        Ok(())
    }

    /// Read a wallet written by [`MnemonicWallet::store`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WeilError> {
        let path = path.as_ref();
        let file_err = |reason: String| WeilError::WalletFile {
            path: path.display().to_string(),
            reason,
        };
        let data =
            Zeroizing::new(std::fs::read_to_string(path).map_err(|e| file_err(e.to_string()))?);
        let stored: StoredWallet =
            serde_json::from_str(&data).map_err(|e| file_err(e.to_string()))?;
        if stored.version != STORED_WALLET_VERSION {
            return Err(file_err(format!(
                "unsupported version {} (expected {})",
                stored.version, STORED_WALLET_VERSION
            )));
        }
        let mnemonic = parse_mnemonic(&stored.mnemonic)?;
        Self::with_path(mnemonic, &stored.derivation_path)
    }
}

impl std::fmt::Debug for MnemonicWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MnemonicWallet")
            .field("derivation_path", &self.derivation_path)
            .field("accounts", &self.accounts.len())
            .finish_non_exhaustive()
    }
}
