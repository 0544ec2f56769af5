use crate::api::client::{ByteStream, StreamSource};
use crate::error::AskError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// One scripted item of a mock response body.
#[derive(Debug, Clone)]
pub enum MockChunk {
    Data(Bytes),
    /// The transport breaks at this point of the body.
    Fail(String),
}

#[derive(Debug, Clone)]
pub enum MockResponse {
    Stream(Vec<MockChunk>),
    /// The request never gets a streaming body (connect error, non-2xx).
    Refuse(String),
    /// Delivers the chunks, then stays open without ever ending.
    Hang(Vec<MockChunk>),
}

/// A query/token pair seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRequest {
    pub query: String,
    pub bearer_token: String,
}

/// `StreamSource` that replays scripted responses, one per request.
#[derive(Clone, Default)]
pub struct MockStreamSource {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<MockRequest>>>,
}

impl MockStreamSource {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            requests: Arc::default(),
        }
    }

    /// A single successful response made of the given raw text chunks.
    pub fn with_chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let chunks = chunks
            .into_iter()
            .map(|chunk| MockChunk::Data(Bytes::from(chunk.into())))
            .collect();
        Self::new(vec![MockResponse::Stream(chunks)])
    }

    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl StreamSource for MockStreamSource {
    async fn open_stream(&self, query: &str, bearer_token: &str) -> Result<ByteStream, AskError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MockRequest {
                query: query.to_string(),
                bearer_token: bearer_token.to_string(),
            });

        let next = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match next {
            None => Err(AskError::Transport(
                "MockStreamSource: no more responses configured".to_string(),
            )),
            Some(MockResponse::Refuse(message)) => Err(AskError::Transport(message)),
            Some(MockResponse::Stream(chunks)) => Ok(Box::pin(stream::iter(scripted(chunks)))),
            Some(MockResponse::Hang(chunks)) => Ok(Box::pin(
                stream::iter(scripted(chunks)).chain(stream::pending()),
            )),
        }
    }
}

fn scripted(chunks: Vec<MockChunk>) -> Vec<Result<Bytes, AskError>> {
    chunks
        .into_iter()
        .map(|chunk| match chunk {
            MockChunk::Data(bytes) => Ok(bytes),
            MockChunk::Fail(message) => Err(AskError::Transport(message)),
        })
        .collect()
}
