//! HTTP streaming client for the Responses endpoint

use std::time::Instant;

use async_trait::async_trait;
use tracing::{error, info};

use super::config::BackendConfig;
use super::{EventStream, ResponsesBackend, ResponsesRequest};
use crate::ai::error::BackendError;
use crate::ai::sse::decode_event_stream;

/// `ResponsesBackend` over HTTP with server-sent events
#[derive(Debug, Clone)]
pub struct HttpResponsesClient {
    http: reqwest::Client,
    config: BackendConfig,
}

impl HttpResponsesClient {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn with_http_client(config: BackendConfig, http: reqwest::Client) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn build_request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .post(url)
            .header("content-type", "application/json")
            .header("accept", "text/event-stream");
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }
        request
    }
}

async fn ensure_success(
    response: reqwest::Response,
    call_start: Instant,
) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    info!("Responses stream opened: {} in {:?}", status, call_start.elapsed());

    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    error!("Responses call failed: {} - {}", status, body);
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ResponsesBackend for HttpResponsesClient {
    async fn stream_response(&self, request: ResponsesRequest) -> Result<EventStream, BackendError> {
        let call_start = Instant::now();
        let mut builder = self.build_request(&self.config.responses_url());
        for (name, value) in &request.extra_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        info!(
            agent = %request.agent_name,
            items = request.input.len(),
            "Calling Responses API"
        );
        let response = builder.json(&request.body()).send().await?;
        let response = ensure_success(response, call_start).await?;

        Ok(Box::pin(decode_event_stream(Box::pin(response.bytes_stream()))))
    }
}
