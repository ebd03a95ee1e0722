//! HTTP client for the assistant chat endpoint.
//!
//! This module only sends requests; deciding what kind of reply came back is
//! the job of [`crate::negotiate`].

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::negotiate::{JSON_CONTENT_TYPE, STREAM_CONTENT_TYPE};
use crate::types::ChatRequest;

/// Client for the assistant service.
#[derive(Debug, Clone)]
pub struct AssistantClient {
    client: Client,
    config: ClientConfig,
}

impl AssistantClient {
    /// Create a new assistant client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { client, config })
    }

    /// Build headers for chat requests.
    fn chat_headers(&self) -> HeaderMap {
        let accept = if self.config.prefer_stream {
            STREAM_CONTENT_TYPE
        } else {
            JSON_CONTENT_TYPE
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        headers
    }

    /// Post a chat request and return the raw response.
    ///
    /// Non-success statuses are returned as responses, not errors; the
    /// negotiator decodes their error body.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the request could not be sent or the
    /// deadline expired before headers arrived.
    pub async fn post_chat(&self, request: &ChatRequest) -> Result<Response> {
        let url = self.config.chat_url();

        tracing::debug!(
            url = %url,
            has_session = request.session_id.is_some(),
            age_group = request.age_group.as_str(),
            "Posting chat request"
        );

        let response = self
            .client
            .post(&url)
            .headers(self.chat_headers())
            .json(request)
            .send()
            .await?;

        Ok(response)
    }

    /// Get the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}
