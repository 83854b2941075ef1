//! HTTP query backend speaking the dashboard's JSON contract.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use parley_chat::{BackendRequest, BackendResponse, ChatError, QueryBackend};

/// Backend that forwards queries to the dashboard's chat endpoint.
pub struct HttpBackend {
    client: reqwest::Client,
    url: String,
}

impl HttpBackend {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ChatError::Backend(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl QueryBackend for HttpBackend {
    async fn query(&self, request: BackendRequest) -> Result<BackendResponse, ChatError> {
        debug!(url = %self.url, "Sending query to backend");
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChatError::Backend(format!(
                "backend returned {}",
                response.status()
            )));
        }

        response
            .json::<BackendResponse>()
            .await
            .map_err(|e| ChatError::Backend(e.to_string()))
    }
}
