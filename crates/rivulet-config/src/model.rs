// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Rivulet chat client.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Rivulet configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RivuletConfig {
    /// Client-wide settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Chat endpoint location and timeouts.
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Generation parameters sent with every request.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Session defaults.
    #[serde(default)]
    pub sessions: SessionsConfig,
}

impl RivuletConfig {
    /// Renders the resolved configuration as TOML.
    pub fn to_toml(&self) -> Result<String, crate::ConfigError> {
        toml::to_string_pretty(self).map_err(|e| crate::ConfigError::Other(e.to_string()))
    }
}

/// Client-wide configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Chat endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    /// Scheme, host and port of the chat backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the NDJSON streaming chat route.
    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    /// Path of the health probe.
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Path of the model catalog.
    #[serde(default = "default_models_path")]
    pub models_path: String,

    /// Upper bound on a whole streamed response, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Upper bound on establishing the connection, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            stream_path: default_stream_path(),
            health_path: default_health_path(),
            models_path: default_models_path(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl EndpointConfig {
    /// Joins `base_url` and `path` without doubling the slash.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8082".to_string()
}

fn default_stream_path() -> String {
    "/api/claude/chat/stream".to_string()
}

fn default_health_path() -> String {
    "/api/health".to_string()
}

fn default_models_path() -> String {
    "/api/claude/models".to_string()
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Generation parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// Model used for new requests unless the session picks another one.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Maximum tokens to generate per response.
    ///
    /// Sent as `maxTokens`. Endpoints that only read `max_tokens` ignore it
    /// and apply their own limit.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature. `None` leaves it to the endpoint.
    #[serde(default)]
    pub temperature: Option<f64>,

    /// System prompt sent with every request.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: None,
            system_prompt: None,
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

/// Session defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionsConfig {
    /// Title given to newly created sessions.
    #[serde(default = "default_title")]
    pub default_title: String,

    /// Maximum characters shown in a session's preview text.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            default_title: default_title(),
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_title() -> String {
    "New chat".to_string()
}

fn default_preview_chars() -> usize {
    80
}
