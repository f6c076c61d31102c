use thiserror::Error;

/// Errors shared by the type and crypto layers.
#[derive(Debug, Error)]
pub enum WeilError {
    #[error("invalid contract id '{contract_id}': {reason}")]
    InvalidContractId { contract_id: String, reason: String },

    #[error("failed to load private key: {reason}")]
    KeyLoad { reason: String },

    #[error("invalid key material")]
    InvalidKeyMaterial,

    #[error("invalid public key: {reason}")]
    InvalidPublicKey { reason: String },

    #[error("signing failed: {reason}")]
    Signing { reason: String },

    #[error("invalid signature: {reason}")]
    InvalidSignature { reason: String },

    #[error("invalid mnemonic")]
    InvalidMnemonic,

    #[error("key derivation failed: {reason}")]
    Derivation { reason: String },

    #[error("canonical encoding failed: {reason}")]
    Encoding { reason: String },

    #[error("wallet file '{path}': {reason}")]
    WalletFile { path: String, reason: String },
}
