use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::{self, BoxStream, Stream, StreamExt};

use crate::error::ClientError;

/// Response body of a streaming execution, yielded chunk by chunk as the
/// sentinel produces it.
pub struct ByteStream {
    inner: BoxStream<'static, Result<Vec<u8>, ClientError>>,
}

impl ByteStream {
    /// Chunks of `response`'s body. A gap longer than `idle_timeout` between
    /// chunks ends the stream with [`ClientError::Timeout`].
    pub(crate) fn from_response(
        op: &'static str,
        response: reqwest::Response,
        idle_timeout: Duration,
    ) -> Self {
        let chunks = response.bytes_stream().boxed();
        let inner = stream::unfold(Some(chunks), move |state| async move {
            let mut chunks = state?;
            match tokio::time::timeout(idle_timeout, chunks.next()).await {
                Ok(Some(chunk)) => {
                    let chunk = chunk
                        .map(|bytes| bytes.to_vec())
                        .map_err(|e| ClientError::from_reqwest(op, e));
                    Some((chunk, Some(chunks)))
                }
                Ok(None) => None,
                Err(_) => Some((Err(ClientError::Timeout { op }), None)),
            }
        })
        .boxed();
        Self { inner }
    }

    /// Wrap an arbitrary chunk stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Vec<u8>, ClientError>> + Send + 'static,
    {
        Self {
            inner: stream.boxed(),
        }
    }

    /// Drain the stream into one buffer.
    pub async fn collect_bytes(mut self) -> Result<Vec<u8>, ClientError> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}

impl Stream for ByteStream {
    type Item = Result<Vec<u8>, ClientError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStream").finish_non_exhaustive()
    }
}
