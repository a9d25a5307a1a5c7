//! narrate configuration management.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tts_client::{ProviderConfig, ProvidersConfig, VoiceParameters};

use crate::book::{NewlineMode, TitleMode};

/// Chunk size used for a provider without an entry in `chunk_limits`.
pub const DEFAULT_CHUNK_LIMIT: usize = 1800;

const DEFAULT_LANGUAGE: &str = "en-US";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarratorConfig {
    /// Default TTS provider
    #[serde(default = "default_tts")]
    pub tts: String,

    /// Default language tag, also selects the chunking strategy
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub title_mode: TitleMode,

    #[serde(default)]
    pub newline_mode: NewlineMode,

    #[serde(default)]
    pub remove_endnotes: bool,

    /// Default voice settings
    #[serde(default)]
    pub voice: VoiceParameters,

    /// Maximum characters per synthesis request, by provider
    #[serde(default = "default_chunk_limits")]
    pub chunk_limits: BTreeMap<String, usize>,

    /// Provider credentials, endpoints and executables
    #[serde(default)]
    pub providers: ProvidersConfig,
}

fn default_tts() -> String {
    tts_client::default_provider().to_string()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_chunk_limits() -> BTreeMap<String, usize> {
    tts_client::list_supported_providers()
        .into_iter()
        .map(|name| (name.to_string(), DEFAULT_CHUNK_LIMIT))
        .collect()
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            tts: default_tts(),
            language: default_language(),
            title_mode: TitleMode::default(),
            newline_mode: NewlineMode::default(),
            remove_endnotes: false,
            voice: VoiceParameters::default(),
            chunk_limits: default_chunk_limits(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl NarratorConfig {
    /// Get the config file path: ~/.config/cli-programs/narrator.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cli-programs")
            .join("narrator.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: NarratorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Chunk limit for a provider.
    pub fn chunk_limit(&self, provider: &str) -> usize {
        self.chunk_limits
            .get(&provider.to_lowercase())
            .copied()
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_CHUNK_LIMIT)
    }

    /// Provider section, empty if not configured.
    pub fn provider_config(&self, provider: &str) -> ProviderConfig {
        self.providers
            .get(&provider.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    /// Mutable provider section, created on first use.
    pub fn provider_config_mut(&mut self, provider: &str) -> &mut ProviderConfig {
        self.providers.entry(provider.to_lowercase()).or_default()
    }
}
