//! HTTP exchange with the sentinel.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::{multipart, Client, Response};
use serde::Serialize;
use tracing::debug;
use weil_types::constants::{
    DEFAULT_REQUEST_TIMEOUT, EXECUTE_SMARTCONTRACT_PATH, GET_APPLET_ADDRESS_PATH, NON_BLOCKING_HEADER, SUBMIT_TXN_PATH,
    TRANSACTION_FIELD_NAME, TRANSACTION_FILE_NAME, TRANSACTION_MIME,
};
use weil_types::contract::ContractId;
use weil_types::response::{AppletAddressRequest, ExecutionResponse, NonceFailureResponse, TaggedResult};
use weil_types::transaction::{SubmitTxnRequest, TransactionResult};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::streaming::ByteStream;

/// What the sentinel made of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blocking submission reached a final result.
    Committed(TransactionResult),
    /// Blocking submission was rejected for a stale nonce.
    NonceConflict(NonceFailureResponse),
    /// Non-blocking submission was accepted; nothing else is known.
    Accepted,
}

/// Sends a signed envelope to the ledger.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(
        &self,
        envelope: &SubmitTxnRequest,
        blocking: bool,
    ) -> Result<SubmitOutcome, ClientError>;
}

#[async_trait]
impl<S: Submitter + ?Sized> Submitter for std::sync::Arc<S> {
    async fn submit(
        &self,
        envelope: &SubmitTxnRequest,
        blocking: bool,
    ) -> Result<SubmitOutcome, ClientError> {
        (**self).submit(envelope, blocking).await
    }
}

/// JSON-serialize `value` and gzip the bytes.
pub fn compress<T: Serialize>(value: &T) -> Result<Vec<u8>, ClientError> {
    let json = serde_json::to_vec(value)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}

/// [`Submitter`] backed by the sentinel's HTTP API.
///
/// Blocking, JSON and lookup requests are bounded end to end by
/// `request_timeout`. A streaming execution is bounded only up to its
/// response headers and then between chunks, so a long response that keeps
/// producing output is never cut off.
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    http: Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpSubmitter {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Build the HTTP client from `config`: connect timeout and TLS policy.
    /// No client-wide total timeout is set; see the type docs.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .connect_timeout(config.request_timeout())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| ClientError::Config {
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self::new(http, config.sentinel_url.clone())
            .with_request_timeout(config.request_timeout()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Post `envelope` to the execution endpoint. With `streaming` set the
    /// timeout stops applying once the response headers arrive.
    async fn post_execution(
        &self,
        op: &'static str,
        envelope: &SubmitTxnRequest,
        non_blocking: bool,
        streaming: bool,
    ) -> Result<Response, ClientError> {
        let payload = compress(envelope)?;
        let part = multipart::Part::bytes(payload)
            .file_name(TRANSACTION_FILE_NAME)
            .mime_str(TRANSACTION_MIME)
            .map_err(|e| ClientError::from_reqwest(op, e))?;
        let form = multipart::Form::new().part(TRANSACTION_FIELD_NAME, part);

        let mut request = self
            .http
            .post(self.url(EXECUTE_SMARTCONTRACT_PATH))
            .multipart(form);
        if non_blocking {
            request = request.header(NON_BLOCKING_HEADER, "true");
        }
        if !streaming {
            request = request.timeout(self.request_timeout);
        }

        let header = envelope.header();
        debug!(
            op,
            nonce = header.nonce,
            routing_counter = header.routing_counter,
            non_blocking,
            streaming,
            "posting transaction"
        );
        let response = tokio::time::timeout(self.request_timeout, request.send())
            .await
            .map_err(|_| ClientError::Timeout { op })?
            .map_err(|e| ClientError::from_reqwest(op, e))?;
        ensure_success(op, response).await
    }

    /// Post `envelope` blocking and hand back the raw response body as a
    /// stream. The body is not classified. The stream fails with
    /// [`ClientError::Timeout`] if no chunk arrives within the request
    /// timeout.
    pub async fn submit_streaming(
        &self,
        envelope: &SubmitTxnRequest,
    ) -> Result<ByteStream, ClientError> {
        let op = "execute_with_streaming";
        let response = self.post_execution(op, envelope, false, true).await?;
        Ok(ByteStream::from_response(op, response, self.request_timeout))
    }

    /// Post `envelope` as plain JSON to the submission endpoint.
    pub async fn submit_txn(&self, envelope: &SubmitTxnRequest) -> Result<String, ClientError> {
        let op = "submit_txn";
        let response = self
            .http
            .post(self.url(SUBMIT_TXN_PATH))
            .timeout(self.request_timeout)
            .json(envelope)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(op, e))?;
        let body = read_body(op, ensure_success(op, response).await?).await?;
        decode_tagged(op, &body)
    }

    /// Look up the contract id of a named service applet.
    pub async fn resolve_applet(&self, svc_name: &str) -> Result<ContractId, ClientError> {
        let op = "resolve_applet";
        let request = AppletAddressRequest {
            svc_name: svc_name.to_string(),
        };
        let response = self
            .http
            .post(self.url(GET_APPLET_ADDRESS_PATH))
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(op, e))?;
        let body = read_body(op, ensure_success(op, response).await?).await?;
        let contract_id = decode_tagged(op, &body)?;
        debug!(svc_name, contract_id = %contract_id, "resolved applet");
        Ok(ContractId::parse(&contract_id)?)
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(
        &self,
        envelope: &SubmitTxnRequest,
        blocking: bool,
    ) -> Result<SubmitOutcome, ClientError> {
        let op = "execute";
        let response = self.post_execution(op, envelope, !blocking, false).await?;
        if !blocking {
            return Ok(SubmitOutcome::Accepted);
        }

        let body = read_body(op, response).await?;
        match ExecutionResponse::decode(&body) {
            Some(ExecutionResponse::Committed(result)) => Ok(SubmitOutcome::Committed(result)),
            Some(ExecutionResponse::NonceConflict(failure)) => {
                Ok(SubmitOutcome::NonceConflict(failure))
            }
            None => Err(ClientError::InvalidResponse {
                op,
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }
}

async fn ensure_success(op: &'static str, response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::HttpStatus {
        op,
        status: status.as_u16(),
        body,
    })
}

async fn read_body(op: &'static str, response: Response) -> Result<Vec<u8>, ClientError> {
    response
        .bytes()
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|e| ClientError::from_reqwest(op, e))
}

fn decode_tagged(op: &'static str, body: &[u8]) -> Result<String, ClientError> {
    let tagged: TaggedResult<String> =
        serde_json::from_slice(body).map_err(|_| ClientError::InvalidResponse {
            op,
            body: String::from_utf8_lossy(body).into_owned(),
        })?;
    tagged
        .into_result()
        .map_err(|message| ClientError::Rejected { op, message })
}
