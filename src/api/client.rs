use crate::config::Config;
use crate::error::AskError;
use crate::util::is_local_endpoint_url;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::AUTHORIZATION;
use reqwest::Url;
use std::pin::Pin;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, AskError>> + Send>>;

const ASK_STREAM_PATH: &str = "ask/stream";

/// Opens the streamed answer for one natural-language query.
#[async_trait]
pub trait StreamSource: Send + Sync {
    async fn open_stream(&self, query: &str, bearer_token: &str) -> Result<ByteStream, AskError>;
}

#[derive(Clone)]
pub struct AskClient {
    http: reqwest::Client,
    api_url: String,
}

impl AskClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.clone(),
        }
    }

    /// `<base>/ask/stream?query=<query>`, tolerating a trailing `/` on the base.
    pub fn stream_url(&self, query: &str) -> Result<Url, AskError> {
        let base = format!("{}/", self.api_url.trim().trim_end_matches('/'));
        let mut url = Url::parse(&base)
            .and_then(|base| base.join(ASK_STREAM_PATH))
            .map_err(|error| AskError::InvalidUrl {
                url: self.api_url.clone(),
                reason: error.to_string(),
            })?;
        url.query_pairs_mut().append_pair("query", query);
        Ok(url)
    }
}

#[async_trait]
impl StreamSource for AskClient {
    async fn open_stream(&self, query: &str, bearer_token: &str) -> Result<ByteStream, AskError> {
        let url = self.stream_url(query)?;
        let request_url = url.to_string();
        tracing::debug!(url = %request_url, "opening answer stream");

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {bearer_token}"))
            .send()
            .await
            .map_err(|error| map_transport_error(error, &request_url))?
            .error_for_status()
            .map_err(|error| map_transport_error(error, &request_url))?;

        let stream = response
            .bytes_stream()
            .map(move |item| item.map_err(|error| map_transport_error(error, &request_url)));
        Ok(Box::pin(stream))
    }
}

fn map_transport_error(error: reqwest::Error, request_url: &str) -> AskError {
    let message = if error.is_connect() && is_local_endpoint_url(request_url) {
        format!(
            "cannot reach local API endpoint '{request_url}': {error}. Start your local server or update SMARTSQL_API_URL."
        )
    } else if error.is_connect() {
        format!("cannot reach API endpoint '{request_url}': {error}")
    } else if error.is_timeout() {
        format!("API request to '{request_url}' timed out: {error}")
    } else if let Some(status) = error.status() {
        format!("API endpoint '{request_url}' returned HTTP {status}: {error}")
    } else {
        format!("API request to '{request_url}' failed: {error}")
    };
    AskError::Transport(message)
}
