//! Building and signing transactions.
//!
//! Every attempt builds a fresh header: a retry after a nonce conflict never
//! reuses a previously signed header.

use std::path::Path;

use weil_crypto::address::{pubkey_to_address, AddressScheme};
use weil_crypto::hd::WalletAccount;
use weil_crypto::keys::Keypair;
use weil_types::contract::ContractId;
use weil_types::error::WeilError;
use weil_types::transaction::{SigningPayload, SubmitTxnRequest, TransactionHeader, UserTransaction};

use crate::nonce::nonce_key;

/// A signing identity: the key, its public key, and the address derived
/// under a known scheme.
#[derive(Debug, Clone)]
pub struct Account {
    keypair: Keypair,
    public_key_hex: String,
    address: String,
    scheme: AddressScheme,
}

impl Account {
    pub fn new(keypair: Keypair, scheme: AddressScheme) -> Self {
        let public_key = keypair.public_key();
        Self {
            public_key_hex: hex::encode(public_key),
            address: pubkey_to_address(&public_key, scheme),
            keypair,
            scheme,
        }
    }

    /// Load a key-file account. Its address uses [`AddressScheme::Direct`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WeilError> {
        Ok(Self::new(Keypair::load(path)?, AddressScheme::Direct))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key_hex(&self) -> &str {
        &self.public_key_hex
    }

    pub fn scheme(&self) -> AddressScheme {
        self.scheme
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn sign(&self, payload: &[u8]) -> Result<String, WeilError> {
        self.keypair.sign(payload)
    }
}

impl From<WalletAccount> for Account {
    fn from(account: WalletAccount) -> Self {
        Self {
            public_key_hex: hex::encode(account.public_key),
            address: account.address,
            keypair: account.keypair,
            scheme: AddressScheme::Derived,
        }
    }
}

/// A method call on one contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub contract: ContractId,
    pub method: String,
    /// JSON-encoded arguments.
    pub args: Option<String>,
    pub hide_args: bool,
}

impl ContractCall {
    /// Arguments are hidden from the public ledger unless
    /// [`ContractCall::hide_args`] turns that off.
    pub fn new(contract: ContractId, method: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            contract,
            method: method.into(),
            args: Some(args.into()),
            hide_args: true,
        }
    }

    pub fn hide_args(mut self, hide: bool) -> Self {
        self.hide_args = hide;
        self
    }

    pub fn routing_counter(&self) -> i32 {
        self.contract.pod_counter()
    }
}

/// A signed envelope ready for submission.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    envelope: SubmitTxnRequest,
    nonce_key: String,
}

impl SignedTransaction {
    pub fn envelope(&self) -> &SubmitTxnRequest {
        &self.envelope
    }

    pub fn nonce(&self) -> u64 {
        self.envelope.header().nonce
    }

    /// Tracker key the nonce was drawn from.
    pub fn nonce_key(&self) -> &str {
        &self.nonce_key
    }
}

/// Assembles headers and user calls for one account and signs them.
#[derive(Debug, Clone, Copy)]
pub struct TransactionBuilder<'a> {
    account: &'a Account,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(account: &'a Account) -> Self {
        Self { account }
    }

    /// Tracker key for calls from this account to `call`'s pod.
    pub fn nonce_key(&self, call: &ContractCall) -> String {
        nonce_key(call.routing_counter(), self.account.address())
    }

    /// Build, canonically encode and sign `call` at `nonce`.
    pub fn build(&self, call: &ContractCall, nonce: u64) -> Result<SignedTransaction, WeilError> {
        let routing_counter = call.routing_counter();
        let from_addr = self.account.address().to_string();
        let header = TransactionHeader::new(
            nonce,
            self.account.public_key_hex().to_string(),
            from_addr.clone(),
            from_addr,
            routing_counter,
        );
        let user_txn = UserTransaction::execute(
            call.contract.clone(),
            call.method.clone(),
            call.args.clone(),
            call.hide_args,
        );

        let payload = SigningPayload::new(&header, &user_txn).canonical_bytes()?;
        let signature = self.account.sign(&payload)?;
        let header = header.attach_signature(signature)?;

        Ok(SignedTransaction {
            envelope: SubmitTxnRequest::new(header, user_txn),
            nonce_key: self.nonce_key(call),
        })
    }
}
