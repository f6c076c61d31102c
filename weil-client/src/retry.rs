//! Nonce-conflict retry loop.
//!
//! ```text
//! Building ──sign──▶ Signed ──submit──▶ Submitted ─┬─▶ Committed
//!    ▲                                              ├─▶ Conflicted ──bump nonce──┐
//!    └──────────────── attempts < max ──────────────┼────────────────────────────┘
//!                                                   └─▶ Failed
//! ```
//!
//! Only an explicit nonce-conflict response is retried. Transport failures,
//! timeouts and unrecognised bodies surface on the first occurrence.

use std::sync::Arc;

use tracing::{debug, info, warn};
use weil_types::constants::MAX_RETRIES;
use weil_types::transaction::TransactionResult;

use crate::api::{SubmitOutcome, Submitter};
use crate::builder::{Account, ContractCall, TransactionBuilder};
use crate::error::ClientError;
use crate::nonce::NonceTracker;

/// Drives a [`Submitter`] and a [`NonceTracker`] until a call commits, is
/// accepted, or runs out of attempts.
#[derive(Debug)]
pub struct RetryCoordinator<S> {
    submitter: S,
    tracker: Arc<NonceTracker>,
    max_retries: u32,
}

impl<S: Submitter> RetryCoordinator<S> {
    pub fn new(submitter: S, tracker: Arc<NonceTracker>) -> Self {
        Self {
            submitter,
            tracker,
            max_retries: MAX_RETRIES,
        }
    }

    /// Cap the number of submissions per call. At least one is always made.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn submitter(&self) -> &S {
        &self.submitter
    }

    pub fn tracker(&self) -> &Arc<NonceTracker> {
        &self.tracker
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Sign and submit `call` from `account`, re-signing with a refreshed
    /// nonce after each conflict.
    ///
    /// A non-blocking submission returns a default (placeholder) result as
    /// soon as the sentinel accepts it; no conflict can be detected there.
    pub async fn execute(
        &self,
        account: &Account,
        call: &ContractCall,
        blocking: bool,
    ) -> Result<TransactionResult, ClientError> {
        let builder = TransactionBuilder::new(account);
        let key = builder.nonce_key(call);
        let mut attempts = 0u32;

        loop {
            let nonce = self.tracker.get_or_init(&key);
            let signed = builder.build(call, nonce)?;
            attempts += 1;
            debug!(
                method = %call.method,
                nonce,
                attempt = attempts,
                blocking,
                "submitting transaction"
            );

            match self.submitter.submit(signed.envelope(), blocking).await? {
                SubmitOutcome::Committed(result) => {
                    info!(
                        method = %call.method,
                        nonce,
                        status = ?result.status,
                        block_height = result.block_height,
                        "transaction committed"
                    );
                    return Ok(result);
                }
                SubmitOutcome::Accepted => {
                    debug!(method = %call.method, nonce, "transaction accepted");
                    return Ok(TransactionResult::default());
                }
                SubmitOutcome::NonceConflict(failure) => {
                    warn!(
                        method = %call.method,
                        sent = nonce,
                        expected = failure.expected_nonce,
                        attempt = attempts,
                        "nonce conflict"
                    );
                    self.tracker
                        .bump_if_present(&key, u64::from(failure.expected_nonce));
                    if attempts >= self.max_retries {
                        warn!(method = %call.method, attempts, "giving up after nonce conflicts");
                        return Err(ClientError::MaxRetriesReached { attempts });
                    }
                }
            }
        }
    }
}
