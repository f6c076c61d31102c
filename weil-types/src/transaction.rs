//! Transaction wire types.
//!
//! A call is authorized by signing the canonical encoding of a
//! [`SigningPayload`]; the signature is then attached to a
//! [`TransactionHeader`] and shipped inside a [`SubmitTxnRequest`] envelope.
//! Field names here are part of the wire contract with the sentinel.

use serde::{Deserialize, Serialize};

use crate::canonical;
use crate::constants::{DEFAULT_VERIFIER, SMART_CONTRACT_EXECUTOR};
use crate::contract::ContractId;
use crate::error::WeilError;

/// Milliseconds since the UNIX epoch.
pub fn current_time_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Header of a transaction. The signature is attached once; signing again
/// requires building a fresh header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHeader {
    pub nonce: u64,
    /// Hex-encoded uncompressed secp256k1 public key (65 bytes).
    pub public_key: String,
    pub from_addr: String,
    pub to_addr: String,
    signature: Option<String>,
    /// Pod counter of the target contract, used for shard routing.
    #[serde(rename = "weilpod_counter")]
    pub routing_counter: i32,
    /// Milliseconds since the UNIX epoch.
    pub creation_time: u64,
}

impl TransactionHeader {
    /// Build an unsigned header stamped with the current time.
    pub fn new(
        nonce: u64,
        public_key: String,
        from_addr: String,
        to_addr: String,
        routing_counter: i32,
    ) -> Self {
        Self {
            nonce,
            public_key,
            from_addr,
            to_addr,
            signature: None,
            routing_counter,
            creation_time: current_time_millis(),
        }
    }

    /// Attach a hex-encoded signature, consuming the unsigned header.
    pub fn attach_signature(mut self, signature: String) -> Result<Self, WeilError> {
        if self.signature.is_some() {
            return Err(WeilError::Signing {
                reason: "header is already signed".to_string(),
            });
        }
        self.signature = Some(signature);
        Ok(self)
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

/// The user call being authorized: a method invocation on an applet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTransaction {
    #[serde(rename = "type")]
    pub ty: String,
    pub contract_address: ContractId,
    pub contract_method: String,
    pub contract_input_bytes: Option<String>,
    pub should_hide_args: bool,
}

impl UserTransaction {
    /// A contract-execution call.
    pub fn execute(
        contract_address: ContractId,
        contract_method: impl Into<String>,
        contract_input_bytes: Option<String>,
        should_hide_args: bool,
    ) -> Self {
        Self {
            ty: SMART_CONTRACT_EXECUTOR.to_string(),
            contract_address,
            contract_method: contract_method.into(),
            contract_input_bytes,
            should_hide_args,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verifier {
    #[serde(rename = "type")]
    pub ty: String,
}

impl Default for Verifier {
    fn default() -> Self {
        Self {
            ty: DEFAULT_VERIFIER.to_string(),
        }
    }
}

/// The exact object whose canonical bytes are signed.
#[derive(Debug, Clone, Serialize)]
pub struct SigningPayload<'a> {
    pub from_addr: &'a str,
    pub nonce: u64,
    pub to_addr: &'a str,
    pub user_txn: &'a UserTransaction,
}

impl<'a> SigningPayload<'a> {
    pub fn new(header: &'a TransactionHeader, user_txn: &'a UserTransaction) -> Self {
        Self {
            from_addr: &header.from_addr,
            nonce: header.nonce,
            to_addr: &header.to_addr,
            user_txn,
        }
    }

    /// Canonical bytes the signature is computed over.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, WeilError> {
        canonical::to_canonical_bytes(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Set for calls routed across pods; client submissions are always local.
    pub is_xpod: bool,
    pub txn_header: TransactionHeader,
    pub verifier: Verifier,
    pub user_txn: UserTransaction,
}

/// Envelope posted to the sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitTxnRequest {
    pub transaction: Transaction,
}

impl SubmitTxnRequest {
    pub fn new(txn_header: TransactionHeader, user_txn: UserTransaction) -> Self {
        Self {
            transaction: Transaction {
                is_xpod: false,
                txn_header,
                verifier: Verifier::default(),
                user_txn,
            },
        }
    }

    pub fn header(&self) -> &TransactionHeader {
        &self.transaction.txn_header
    }
}

/// Lifecycle state reported by the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    #[default]
    InProgress,
    Committed,
    Confirmed,
    Finalized,
    Failed,
}

/// Final result of a blocking submission.
///
/// Decoding is strict: unknown fields are rejected so that a nonce-failure
/// body is never mistaken for a result. Missing fields take defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransactionResult {
    pub status: TransactionStatus,
    pub block_height: u64,
    pub batch_id: String,
    pub batch_author: String,
    pub tx_idx: u32,
    /// Applet output, itself a JSON document encoded as a string.
    pub txn_result: String,
    pub creation_time: String,
}
