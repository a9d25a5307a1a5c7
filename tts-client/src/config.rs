use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, TtsError};

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Provider-specific configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key or subscription key (optional, can use env var instead)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Service region (azure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Custom base URL (for API providers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Path or name of the executable (for CLI providers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,

    /// Request timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    /// Request timeout, falling back to the default.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

/// Per-provider configuration keyed by registry name
pub type ProvidersConfig = HashMap<String, ProviderConfig>;

/// Lookup for environment values, injectable for tests.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Reads the real process environment, treating blank values as unset.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get a credential from config or environment variable
pub(crate) fn resolve_credential(
    configured: Option<&String>,
    env: EnvLookup<'_>,
    env_var: &str,
    provider_name: &str,
) -> Result<String> {
    // Check config first
    if let Some(value) = configured.filter(|v| !v.trim().is_empty()) {
        return Ok(value.clone());
    }

    // Fall back to environment variable
    env(env_var).ok_or_else(|| TtsError::MissingCredential {
        provider: provider_name.to_string(),
        env_var: env_var.to_string(),
    })
}
