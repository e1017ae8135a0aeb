// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as URL schemes, route paths and numeric ranges.

use crate::diagnostic::ConfigError;
use crate::model::RivuletConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &RivuletConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let level = config.client.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "client.log_level `{}` is not one of {}",
                config.client.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    let base_url = config.endpoint.base_url.trim();
    if base_url.is_empty() {
        errors.push(ConfigError::Validation {
            message: "endpoint.base_url must not be empty".to_string(),
        });
    } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        errors.push(ConfigError::Validation {
            message: format!("endpoint.base_url `{base_url}` must start with http:// or https://"),
        });
    }

    for (key, path) in [
        ("stream_path", &config.endpoint.stream_path),
        ("health_path", &config.endpoint.health_path),
        ("models_path", &config.endpoint.models_path),
    ] {
        if !path.starts_with('/') {
            errors.push(ConfigError::Validation {
                message: format!("endpoint.{key} `{path}` must start with `/`"),
            });
        }
    }

    if config.endpoint.request_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "endpoint.request_timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.endpoint.connect_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "endpoint.connect_timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.generation.default_model.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "generation.default_model must not be empty".to_string(),
        });
    }

    if config.generation.max_tokens == 0 {
        errors.push(ConfigError::Validation {
            message: "generation.max_tokens must be greater than 0".to_string(),
        });
    }

    if let Some(temperature) = config.generation.temperature
        && !(0.0..=1.0).contains(&temperature)
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "generation.temperature must be between 0.0 and 1.0, got {temperature}"
            ),
        });
    }

    if config.sessions.default_title.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "sessions.default_title must not be empty".to_string(),
        });
    }

    if config.sessions.preview_chars == 0 {
        errors.push(ConfigError::Validation {
            message: "sessions.preview_chars must be greater than 0".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
