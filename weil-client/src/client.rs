//! High-level client bound to one account.
//!
//! [`WeilClient`] is cheap to clone and safe to share across tasks. All
//! clones share the HTTP connection pool, the nonce tracker and the
//! in-flight submission limit.

use std::sync::Arc;

use tokio::sync::{OnceCell, Semaphore, SemaphorePermit};
use tracing::debug;
use weil_types::constants::AUDIT_APPLET_SVC_NAME;
use weil_types::contract::ContractId;
use weil_types::transaction::TransactionResult;

use crate::api::HttpSubmitter;
use crate::builder::{Account, ContractCall, SignedTransaction, TransactionBuilder};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::nonce::NonceTracker;
use crate::retry::RetryCoordinator;
use crate::streaming::ByteStream;

/// Method invoked on the audit applet.
const AUDIT_METHOD: &str = "audit";

#[derive(Clone)]
pub struct WeilClient {
    account: Arc<Account>,
    coordinator: Arc<RetryCoordinator<HttpSubmitter>>,
    semaphore: Arc<Semaphore>,
    audit_contract: Arc<OnceCell<ContractId>>,
}

impl WeilClient {
    /// Client with its own nonce tracker.
    pub fn new(account: Account, config: &ClientConfig) -> Result<Self, ClientError> {
        Self::with_tracker(account, config, Arc::new(NonceTracker::new()))
    }

    /// Client sharing `tracker` with other clients in this process.
    pub fn with_tracker(
        account: Account,
        config: &ClientConfig,
        tracker: Arc<NonceTracker>,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        let submitter = HttpSubmitter::from_config(config)?;
        let coordinator =
            RetryCoordinator::new(submitter, tracker).with_max_retries(config.max_retries);
        debug!(
            sentinel = %config.sentinel_url,
            address = account.address(),
            concurrency = config.concurrency,
            "client ready"
        );
        Ok(Self {
            account: Arc::new(account),
            coordinator: Arc::new(coordinator),
            semaphore: Arc::new(Semaphore::new(config.concurrency)),
            audit_contract: Arc::new(OnceCell::new()),
        })
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn tracker(&self) -> &Arc<NonceTracker> {
        self.coordinator.tracker()
    }

    pub fn to_contract_client(&self, contract_id: ContractId) -> WeilContractClient {
        WeilContractClient {
            contract_id,
            client: self.clone(),
        }
    }

    async fn permit(&self) -> Result<SemaphorePermit<'_>, ClientError> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| ClientError::Closed)
    }

    /// Submit `call` through the retry loop.
    pub async fn call(
        &self,
        call: &ContractCall,
        blocking: bool,
    ) -> Result<TransactionResult, ClientError> {
        let _permit = self.permit().await?;
        self.coordinator.execute(&self.account, call, blocking).await
    }

    /// Execute a method and wait for its result.
    pub async fn execute(
        &self,
        contract_id: ContractId,
        method: impl Into<String>,
        args: impl Into<String>,
    ) -> Result<TransactionResult, ClientError> {
        self.call(&ContractCall::new(contract_id, method, args), true)
            .await
    }

    /// Execute a method without waiting for the commit.
    pub async fn execute_non_blocking(
        &self,
        contract_id: ContractId,
        method: impl Into<String>,
        args: impl Into<String>,
    ) -> Result<TransactionResult, ClientError> {
        self.call(&ContractCall::new(contract_id, method, args), false)
            .await
    }

    /// Execute a method and stream the raw response body.
    pub async fn execute_with_streaming(
        &self,
        contract_id: ContractId,
        method: impl Into<String>,
        args: impl Into<String>,
    ) -> Result<ByteStream, ClientError> {
        let call = ContractCall::new(contract_id, method, args);
        let signed = self.sign(&call)?;
        let _permit = self.permit().await?;
        self.coordinator
            .submitter()
            .submit_streaming(signed.envelope())
            .await
    }

    /// Submit `call` as JSON to the plain submission endpoint, returning the
    /// sentinel's `Ok` payload.
    pub async fn submit_txn(&self, call: &ContractCall) -> Result<String, ClientError> {
        let signed = self.sign(call)?;
        let _permit = self.permit().await?;
        self.coordinator
            .submitter()
            .submit_txn(signed.envelope())
            .await
    }

    fn sign(&self, call: &ContractCall) -> Result<SignedTransaction, ClientError> {
        let builder = TransactionBuilder::new(&self.account);
        let nonce = self.tracker().get_or_init(&builder.nonce_key(call));
        Ok(builder.build(call, nonce)?)
    }

    pub async fn resolve_applet(&self, svc_name: &str) -> Result<ContractId, ClientError> {
        self.coordinator.submitter().resolve_applet(svc_name).await
    }

    /// Write `log` to the audit applet, fire-and-forget. The applet's
    /// address is looked up once per client.
    pub async fn audit(&self, log: &str) -> Result<TransactionResult, ClientError> {
        let contract_id = self
            .audit_contract
            .get_or_try_init(|| self.resolve_applet(AUDIT_APPLET_SVC_NAME))
            .await?
            .clone();
        self.call(&audit_call(contract_id, log), false).await
    }
}

/// Audit entries are published with their arguments visible.
fn audit_call(contract_id: ContractId, log: &str) -> ContractCall {
    let args = serde_json::json!({ "log": log }).to_string();
    ContractCall::new(contract_id, AUDIT_METHOD, args).hide_args(false)
}

impl std::fmt::Debug for WeilClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeilClient")
            .field("address", &self.account.address())
            .field("sentinel", &self.coordinator.submitter().base_url())
            .finish_non_exhaustive()
    }
}

/// A [`WeilClient`] pinned to one contract.
#[derive(Debug, Clone)]
pub struct WeilContractClient {
    contract_id: ContractId,
    client: WeilClient,
}

impl WeilContractClient {
    pub fn contract_id(&self) -> &ContractId {
        &self.contract_id
    }

    pub async fn execute(
        &self,
        method: impl Into<String>,
        args: impl Into<String>,
    ) -> Result<TransactionResult, ClientError> {
        self.client
            .execute(self.contract_id.clone(), method, args)
            .await
    }

    pub async fn execute_non_blocking(
        &self,
        method: impl Into<String>,
        args: impl Into<String>,
    ) -> Result<TransactionResult, ClientError> {
        self.client
            .execute_non_blocking(self.contract_id.clone(), method, args)
            .await
    }

    pub async fn execute_with_streaming(
        &self,
        method: impl Into<String>,
        args: impl Into<String>,
    ) -> Result<ByteStream, ClientError> {
        self.client
            .execute_with_streaming(self.contract_id.clone(), method, args)
            .await
    }
}
