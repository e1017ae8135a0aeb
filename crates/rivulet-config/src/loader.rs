// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./rivulet.toml` > `~/.config/rivulet/rivulet.toml` > `/etc/rivulet/rivulet.toml`
//! with environment variable overrides via `RIVULET_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::RivuletConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/rivulet/rivulet.toml` (system-wide)
/// 3. `~/.config/rivulet/rivulet.toml` (user XDG config)
/// 4. `./rivulet.toml` (local directory)
/// 5. `RIVULET_*` environment variables
pub fn load_config() -> Result<RivuletConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<RivuletConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RivuletConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RivuletConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RivuletConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RivuletConfig::default()))
        .merge(Toml::file("/etc/rivulet/rivulet.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("rivulet/rivulet.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("rivulet.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` instead of `Env::split("_")` because key names contain
/// underscores: `RIVULET_ENDPOINT_BASE_URL` must map to `endpoint.base_url`,
/// not `endpoint.base.url`.
fn env_provider() -> Env {
    Env::prefixed("RIVULET_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name to its dotted config key.
pub(crate) fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 4] = ["client", "endpoint", "generation", "sessions"];

    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
