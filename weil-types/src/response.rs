use serde::{Deserialize, Serialize};

use crate::transaction::TransactionResult;

/// Returned by the sentinel instead of a result when the submitted nonce is
/// stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NonceFailureResponse {
    pub expected_nonce: u32,
    pub received_nonce: u32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

/// Body of a blocking contract execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResponse {
    Committed(TransactionResult),
    NonceConflict(NonceFailureResponse),
}

impl ExecutionResponse {
    /// Classify a response body. A [`TransactionResult`] takes precedence;
    /// a [`NonceFailureResponse`] is tried only if that strict decode fails.
    /// Returns `None` when the body matches neither shape.
    pub fn decode(body: &[u8]) -> Option<Self> {
        if let Ok(result) = serde_json::from_slice::<TransactionResult>(body) {
            return Some(Self::Committed(result));
        }
        serde_json::from_slice::<NonceFailureResponse>(body)
            .ok()
            .map(Self::NonceConflict)
    }
}

/// Tagged result used by the sentinel's JSON endpoints:
/// `{"Ok": value}` or `{"Err": message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaggedResult<T> {
    Ok(T),
    Err(String),
}

impl<T> TaggedResult<T> {
    pub fn into_result(self) -> Result<T, String> {
        match self {
            TaggedResult::Ok(value) => Ok(value),
            TaggedResult::Err(message) => Err(message),
        }
    }
}

/// Request body of the applet-address lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppletAddressRequest {
    pub svc_name: String,
}
