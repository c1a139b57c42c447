//! # Generation Service
//!
//! The collaborator that turns an [`ActionRequest`] into a byte stream. The
//! session only relies on the contract below; transport, prompts and retries
//! belong to the implementation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use tokio_stream::Stream;

use crate::actions::ActionRequest;
use crate::errors::TransportError;

/// Raw response body, in arrival order
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

pub trait GenerationService {
    /// Start generating.
    ///
    /// Fails when no response body is available; failures while reading the
    /// body are reported as items of the stream instead.
    fn generate(
        &self,
        request: &ActionRequest,
    ) -> impl Future<Output = Result<ByteStream, TransportError>> + Send;
}

/// Encode one delta as a wire line
pub fn encode_delta(delta: &str) -> String {
    format!("0:{}\n", serde_json::Value::from(delta))
}

/// Serves a recorded response body in fixed-size chunks
#[derive(Debug)]
pub struct ReplayService {
    body: Option<Vec<u8>>,
    chunk_size: usize,
    interrupt_after: Option<usize>,
    requests: Mutex<Vec<ActionRequest>>,
}

impl ReplayService {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: Some(body.into()),
            chunk_size: 64,
            interrupt_after: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Body made of one wire line per delta
    pub fn from_deltas<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let body: String = deltas
            .into_iter()
            .map(|delta| encode_delta(delta.as_ref()))
            .collect();
        Self::new(body)
    }

    /// A service whose response has no body
    pub fn without_body() -> Self {
        Self {
            body: None,
            chunk_size: 64,
            interrupt_after: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Fail the stream after `chunks` chunks were delivered
    pub fn interrupt_after(mut self, chunks: usize) -> Self {
        self.interrupt_after = Some(chunks);
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ActionRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl GenerationService for ReplayService {
    async fn generate(&self, request: &ActionRequest) -> Result<ByteStream, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let body = self.body.as_ref().ok_or(TransportError::MissingBody)?;
        let mut chunks: Vec<Result<Vec<u8>, TransportError>> = body
            .chunks(self.chunk_size)
            .map(|chunk| Ok(chunk.to_vec()))
            .collect();
        if let Some(limit) = self.interrupt_after {
            chunks.truncate(limit);
            chunks.push(Err(TransportError::Interrupted(format!(
                "connection reset after {} chunks",
                limit
            ))));
        }

        tracing::debug!(chunks = chunks.len(), "replaying recorded response");
        Ok(Box::pin(tokio_stream::iter(chunks)))
    }
}
