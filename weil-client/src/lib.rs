//! Client for submitting signed applet transactions to a WeilChain sentinel.
//!
//! A call flows through [`builder::TransactionBuilder`] (header, canonical
//! payload, signature), an [`api::Submitter`] (HTTP exchange) and the
//! [`retry::RetryCoordinator`], which reconciles the [`nonce::NonceTracker`]
//! when the sentinel reports a stale nonce.

pub mod api;
pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod nonce;
pub mod retry;
pub mod streaming;

pub use api::{HttpSubmitter, SubmitOutcome, Submitter};
pub use builder::{Account, ContractCall, SignedTransaction, TransactionBuilder};
pub use client::{WeilClient, WeilContractClient};
pub use config::ClientConfig;
pub use error::ClientError;
pub use nonce::NonceTracker;
pub use retry::RetryCoordinator;
pub use streaming::ByteStream;
