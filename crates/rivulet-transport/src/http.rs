// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP transport for the chat endpoint.
//!
//! Provides [`HttpTransport`] which posts chat requests, hands the response
//! body to the NDJSON decoder, and queries the health and model routes.
//! Every request is a single attempt.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use rivulet_config::model::EndpointConfig;
use rivulet_core::{ChatRequest, ChatTransport, FrameStream, HealthStatus, RivuletError};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::ndjson::decode_frames;
use crate::types::{ErrorBody, HealthResponse, ModelInfo};

/// reqwest-backed [`ChatTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: EndpointConfig,
}

impl HttpTransport {
    /// Builds a transport for the given endpoint settings.
    pub fn new(endpoint: &EndpointConfig) -> Result<Self, RivuletError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(endpoint.connect_timeout_secs))
            .timeout(Duration::from_secs(endpoint.request_timeout_secs))
            .build()
            .map_err(|e| RivuletError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.clone(),
        })
    }

    /// Returns the endpoint this transport talks to.
    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Fetches the raw health probe body.
    pub async fn health(&self) -> Result<HealthResponse, RivuletError> {
        self.get_json(&self.endpoint.health_path).await
    }

    /// Fetches the model catalog.
    pub async fn models(&self) -> Result<Vec<ModelInfo>, RivuletError> {
        self.get_json(&self.endpoint.models_path).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RivuletError> {
        let url = self.endpoint.url_for(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RivuletError::TransportOpen {
                status: None,
                message: format!("GET {url} failed: {e}"),
            })?;

        let status = response.status();
        debug!(status = %status, url = %url, "response received");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RivuletError::TransportOpen {
                status: Some(status.as_u16()),
                message: error_message(status, &body),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| RivuletError::TransportStream {
                message: format!("failed to read response body: {e}"),
            })?;
        serde_json::from_str(&body).map_err(|e| RivuletError::Decode {
            message: format!("unexpected response from {url}: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<FrameStream, RivuletError> {
        let url = self.endpoint.url_for(&self.endpoint.stream_path);
        debug!(
            url = %url,
            model = %request.model,
            messages = request.messages.len(),
            "opening chat stream"
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| RivuletError::TransportOpen {
                status: None,
                message: format!("request to {url} failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(status, &body);
            warn!(status = %status, message = %message, "chat stream rejected");
            return Err(RivuletError::TransportOpen {
                status: Some(status.as_u16()),
                message,
            });
        }

        debug!(status = %status, "chat stream opened");
        Ok(decode_frames(response.bytes_stream()))
    }

    async fn health_check(&self) -> Result<HealthStatus, RivuletError> {
        let health = match self.health().await {
            Ok(health) => health,
            Err(e) => return Ok(HealthStatus::Unhealthy(e.to_string())),
        };

        if !health.status.eq_ignore_ascii_case("ok") {
            return Ok(HealthStatus::Degraded(format!(
                "endpoint reports status `{}`",
                health.status
            )));
        }
        if !health.any_provider_available() {
            return Ok(HealthStatus::Degraded(
                "no model provider is available".to_string(),
            ));
        }
        Ok(HealthStatus::Healthy)
    }
}

/// Builds a readable message from a non-success response body.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(err) = serde_json::from_str::<ErrorBody>(body) {
        return format!("endpoint returned {status}: {}", err.error);
    }
    let body = body.trim();
    if body.is_empty() {
        format!("endpoint returned {status}")
    } else {
        format!("endpoint returned {status}: {body}")
    }
}
