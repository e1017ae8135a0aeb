// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response bodies of the non-streaming endpoint routes.

use serde::{Deserialize, Serialize};

/// Body of the health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub app: String,
    #[serde(default)]
    pub uptime_seconds: u64,
    #[serde(default)]
    pub providers: Vec<ProviderInfo>,
}

impl HealthResponse {
    /// True if at least one upstream provider can serve requests.
    pub fn any_provider_available(&self) -> bool {
        self.providers.iter().any(|p| p.available)
    }
}

/// Availability of one upstream model provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub available: bool,
}

/// One entry of the model catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tier: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

/// Error body returned by the endpoint on non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}
