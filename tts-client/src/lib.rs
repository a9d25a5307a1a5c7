//! Text-to-speech client library for the book-narrator workspace
//!
//! Provides a unified interface for multiple speech synthesis backends:
//! - Azure Cognitive Services (REST, SSML)
//! - OpenAI speech API
//! - Microsoft Edge read-aloud (edge-tts subprocess)
//! - Piper (local subprocess)
//!
//! Backends are resolved by name through an immutable registry.

pub mod config;
pub mod error;
pub mod provider;
pub mod providers;

pub use config::{EnvLookup, ProviderConfig, ProvidersConfig, process_env};
pub use error::{Result, TtsError};
pub use provider::{AudioFormat, DEFAULT_BREAK_MARKER, SynthesizedAudio, TtsProvider, VoiceParameters};
pub use providers::{
    MockProvider, create_provider, create_provider_with_env, default_provider, is_supported,
    list_supported_providers,
};
