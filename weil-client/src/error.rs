use thiserror::Error;
use weil_types::error::WeilError;

/// Errors surfaced by the transaction pipeline and the sentinel client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Weil(#[from] WeilError),

    #[error("{op}: transport error: {source}")]
    Transport {
        op: &'static str,
        source: reqwest::Error,
    },

    #[error("{op}: request timed out")]
    Timeout { op: &'static str },

    #[error("{op}: sentinel returned HTTP {status}: {body}")]
    HttpStatus {
        op: &'static str,
        status: u16,
        body: String,
    },

    #[error("{op}: invalid response body: {body}")]
    InvalidResponse { op: &'static str, body: String },

    #[error("max retries reached after {attempts} attempts")]
    MaxRetriesReached { attempts: u32 },

    #[error("{op}: rejected by sentinel: {message}")]
    Rejected { op: &'static str, message: String },

    #[error("config error: {reason}")]
    Config { reason: String },

    #[error("client is shut down")]
    Closed,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Map a reqwest failure, keeping timeouts distinct from other transport
    /// errors.
    pub(crate) fn from_reqwest(op: &'static str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ClientError::Timeout { op }
        } else {
            ClientError::Transport { op, source }
        }
    }
}
