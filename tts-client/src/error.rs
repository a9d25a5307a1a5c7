use thiserror::Error;

#[derive(Error, Debug)]
pub enum TtsError {
    #[error("Credential not found for {provider}. Set {env_var} environment variable or add to config.")]
    MissingCredential { provider: String, env_var: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported TTS provider: {name}. Available: {available}")]
    UnknownProvider { name: String, available: String },

    #[error("{provider} synthesis failed: {message}")]
    Synthesis { provider: String, message: String },

    #[error("API error{}: {message}", status_code.map(|c| format!(" (HTTP {})", c)).unwrap_or_default())]
    Api {
        message: String,
        status_code: Option<u16>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TtsError {
    /// Shorthand for a synthesis failure attributed to `provider`.
    pub fn synthesis(provider: &str, message: impl Into<String>) -> Self {
        Self::Synthesis {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TtsError>;
