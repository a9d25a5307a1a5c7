//! TTS provider implementations and the provider registry

mod azure;
mod edge;
pub mod mock;
mod openai;
mod piper;
mod process;

pub use azure::AzureProvider;
pub use edge::EdgeProvider;
pub use mock::MockProvider;
pub use openai::OpenAIProvider;
pub use piper::PiperProvider;

use crate::config::{EnvLookup, ProviderConfig, process_env};
use crate::error::{Result, TtsError};
use crate::provider::TtsProvider;

type Constructor = fn(&ProviderConfig, EnvLookup<'_>) -> Result<Box<dyn TtsProvider>>;

/// A registry entry: backend name and the constructor that builds it.
pub struct ProviderEntry {
    pub name: &'static str,
    build: Constructor,
}

/// Supported providers, in preference order. The first entry is the default.
static REGISTRY: &[ProviderEntry] = &[
    ProviderEntry {
        name: azure::NAME,
        build: build_azure,
    },
    ProviderEntry {
        name: openai::NAME,
        build: build_openai,
    },
    ProviderEntry {
        name: edge::NAME,
        build: build_edge,
    },
    ProviderEntry {
        name: piper::NAME,
        build: build_piper,
    },
];

fn build_azure(config: &ProviderConfig, env: EnvLookup<'_>) -> Result<Box<dyn TtsProvider>> {
    Ok(Box::new(AzureProvider::new(config, env)?))
}

fn build_openai(config: &ProviderConfig, env: EnvLookup<'_>) -> Result<Box<dyn TtsProvider>> {
    Ok(Box::new(OpenAIProvider::new(config, env)?))
}

fn build_edge(config: &ProviderConfig, _env: EnvLookup<'_>) -> Result<Box<dyn TtsProvider>> {
    Ok(Box::new(EdgeProvider::new(config)?))
}

fn build_piper(config: &ProviderConfig, _env: EnvLookup<'_>) -> Result<Box<dyn TtsProvider>> {
    Ok(Box::new(PiperProvider::new(config)?))
}

/// Names of all supported providers, in registry order
pub fn list_supported_providers() -> Vec<&'static str> {
    REGISTRY.iter().map(|entry| entry.name).collect()
}

/// The provider used when none is selected
pub fn default_provider() -> &'static str {
    REGISTRY[0].name
}

/// Whether `name` is a registered provider
pub fn is_supported(name: &str) -> bool {
    find_entry(name).is_some()
}

fn find_entry(name: &str) -> Option<&'static ProviderEntry> {
    let name = name.trim().to_lowercase();
    REGISTRY.iter().find(|entry| entry.name == name)
}

/// Create a provider by name, reading missing credentials from the process environment
pub fn create_provider(name: &str, config: &ProviderConfig) -> Result<Box<dyn TtsProvider>> {
    create_provider_with_env(name, config, &process_env)
}

/// Create a provider by name with an explicit environment lookup
pub fn create_provider_with_env(
    name: &str,
    config: &ProviderConfig,
    env: EnvLookup<'_>,
) -> Result<Box<dyn TtsProvider>> {
    let entry = find_entry(name).ok_or_else(|| TtsError::UnknownProvider {
        name: name.to_string(),
        available: list_supported_providers().join(", "),
    })?;

    log::debug!("Creating TTS provider: {}", entry.name);
    (entry.build)(config, env)
}
