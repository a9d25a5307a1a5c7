//! OpenAI speech API provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{EnvLookup, ProviderConfig, resolve_credential};
use crate::error::{Result, TtsError};
use crate::provider::{
    AudioFormat, SynthesizedAudio, TtsProvider, VoiceParameters, check_output_format,
};

pub(crate) const NAME: &str = "openai";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "tts-1";
const DEFAULT_VOICE: &str = "alloy";
const DEFAULT_FORMAT: &str = "mp3";

/// Provider for the OpenAI `/audio/speech` endpoint
pub struct OpenAIProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    pub fn new(config: &ProviderConfig, env: EnvLookup<'_>) -> Result<Self> {
        let api_key = resolve_credential(config.api_key.as_ref(), env, "OPENAI_API_KEY", "OpenAI")?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TtsError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            client,
        })
    }
}

// OpenAI API request/error types

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

fn speech_request<'a>(text: &'a str, voice: &'a VoiceParameters) -> SpeechRequest<'a> {
    SpeechRequest {
        model: voice.model_name.as_deref().unwrap_or(DEFAULT_MODEL),
        input: text,
        voice: voice.voice_name.as_deref().unwrap_or(DEFAULT_VOICE),
        response_format: voice.output_format.as_deref().unwrap_or(DEFAULT_FORMAT),
    }
}

#[async_trait]
impl TtsProvider for OpenAIProvider {
    async fn synthesize(&self, text: &str, voice: &VoiceParameters) -> Result<SynthesizedAudio> {
        self.validate_voice(voice)?;
        let request = speech_request(text, voice);
        let url = format!("{}/audio/speech", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| TtsError::synthesis(NAME, format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message =
                if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&error_text) {
                    error_response.error.message
                } else {
                    error_text
                };

            return Err(TtsError::Api {
                message,
                status_code: Some(status.as_u16()),
            });
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| TtsError::synthesis(NAME, format!("Failed to read audio: {}", e)))?;

        Ok(SynthesizedAudio {
            data: data.to_vec(),
            format: self.output_format(voice),
        })
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn validate_voice(&self, voice: &VoiceParameters) -> Result<()> {
        check_output_format(NAME, voice)
    }

    fn output_format(&self, voice: &VoiceParameters) -> AudioFormat {
        voice
            .output_format
            .as_deref()
            .and_then(AudioFormat::from_identifier)
            .unwrap_or(AudioFormat::Mp3)
    }

    fn supports_concurrent_requests(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let voice = VoiceParameters::default();
        let json = serde_json::to_value(speech_request("Hello", &voice)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "tts-1",
                "input": "Hello",
                "voice": "alloy",
                "response_format": "mp3",
            })
        );
    }

    #[test]
    fn test_request_uses_voice_parameters() {
        let voice = VoiceParameters {
            model_name: Some("tts-1-hd".to_string()),
            voice_name: Some("echo".to_string()),
            output_format: Some("opus".to_string()),
            break_duration_ms: Some(900),
            ..Default::default()
        };
        let request = speech_request("Hi", &voice);
        assert_eq!(request.model, "tts-1-hd");
        assert_eq!(request.voice, "echo");
        assert_eq!(request.response_format, "opus");
    }

    #[test]
    fn test_base_url_trimmed() {
        let config = ProviderConfig {
            api_key: Some("sk-test".to_string()),
            base_url: Some("http://localhost:8080/v1/".to_string()),
            ..Default::default()
        };
        let env = |_: &str| -> Option<String> { None };
        let provider = OpenAIProvider::new(&config, &env).unwrap();
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_parse_error_response() {
        let body = r#"{"error": {"message": "Invalid voice", "type": "invalid_request_error"}}"#;
        let parsed: ErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "Invalid voice");
    }
}
