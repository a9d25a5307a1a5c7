//! Azure Cognitive Services provider
//!
//! Sends SSML to the regional text-to-speech REST endpoint.

use async_trait::async_trait;
use reqwest::Client;

use crate::config::{EnvLookup, ProviderConfig, resolve_credential};
use crate::error::{Result, TtsError};
use crate::provider::{
    AudioFormat, SynthesizedAudio, TtsProvider, VoiceParameters, check_output_format,
};

pub(crate) const NAME: &str = "azure";

const BREAK_MARKER: &str = " @BRK# ";
const DEFAULT_LANGUAGE: &str = "en-US";
const DEFAULT_VOICE: &str = "en-US-GuyNeural";
const DEFAULT_OUTPUT_FORMAT: &str = "audio-24khz-48kbitrate-mono-mp3";
const DEFAULT_BREAK_MS: u32 = 1250;

/// Provider for the Azure text-to-speech REST API
pub struct AzureProvider {
    subscription_key: String,
    endpoint: String,
    client: Client,
}

impl AzureProvider {
    /// Create a new Azure provider
    ///
    /// Requires a subscription key and region, from config or
    /// `MS_TTS_KEY` / `MS_TTS_REGION`.
    pub fn new(config: &ProviderConfig, env: EnvLookup<'_>) -> Result<Self> {
        let subscription_key = resolve_credential(config.api_key.as_ref(), env, "MS_TTS_KEY", "Azure")?;

        let endpoint = match &config.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let region = resolve_credential(config.region.as_ref(), env, "MS_TTS_REGION", "Azure")?;
                format!("https://{}.tts.speech.microsoft.com/cognitiveservices/v1", region)
            }
        };

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TtsError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            subscription_key,
            endpoint,
            client,
        })
    }
}

/// Escape text for inclusion in an SSML document
fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Build the SSML request body for a chunk.
///
/// Section markers become `<break>` elements of the configured duration.
fn build_ssml(text: &str, voice: &VoiceParameters) -> String {
    let language = voice.language.as_deref().unwrap_or(DEFAULT_LANGUAGE);
    let voice_name = voice.voice_name.as_deref().unwrap_or(DEFAULT_VOICE);
    let break_ms = voice.break_duration_ms.unwrap_or(DEFAULT_BREAK_MS);

    let break_tag = format!("<break time=\"{}ms\" />", break_ms);
    let mut body = escape_xml(text.trim()).replace(BREAK_MARKER.trim(), &break_tag);

    let mut prosody = Vec::new();
    if let Some(rate) = &voice.voice_rate {
        prosody.push(format!("rate=\"{}\"", escape_xml(rate)));
    }
    if let Some(pitch) = &voice.voice_pitch {
        prosody.push(format!("pitch=\"{}\"", escape_xml(pitch)));
    }
    if let Some(volume) = &voice.voice_volume {
        prosody.push(format!("volume=\"{}\"", escape_xml(volume)));
    }
    if !prosody.is_empty() {
        body = format!("<prosody {}>{}</prosody>", prosody.join(" "), body);
    }

    format!(
        "<speak version=\"1.0\" xmlns=\"http://www.w3.org/2001/10/synthesis\" xml:lang=\"{}\"><voice name=\"{}\">{}</voice></speak>",
        escape_xml(language),
        escape_xml(voice_name),
        body
    )
}

#[async_trait]
impl TtsProvider for AzureProvider {
    async fn synthesize(&self, text: &str, voice: &VoiceParameters) -> Result<SynthesizedAudio> {
        self.validate_voice(voice)?;
        let ssml = build_ssml(text, voice);
        let output_format = voice.output_format.as_deref().unwrap_or(DEFAULT_OUTPUT_FORMAT);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", &self.subscription_key)
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", output_format)
            .header("User-Agent", "book-narrator")
            .body(ssml)
            .send()
            .await
            .map_err(|e| TtsError::synthesis(NAME, format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TtsError::Api {
                message: if message.is_empty() {
                    status.to_string()
                } else {
                    message
                },
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

    fn break_marker(&self) -> &str {
        BREAK_MARKER
    }

    fn output_format(&self, voice: &VoiceParameters) -> AudioFormat {
        voice
            .output_format
            .as_deref()
            .and_then(AudioFormat::from_identifier)
            .unwrap_or(AudioFormat::Mp3)
    }

    fn supports_concurrent_requests(&self) -> bool {
        // reqwest::Client is shareable; each request is independent
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_env(key: &str) -> Option<String> {
        match key {
            "MS_TTS_KEY" => Some("key".to_string()),
            "MS_TTS_REGION" => Some("westus".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_endpoint_from_region() {
        let provider = AzureProvider::new(&ProviderConfig::default(), &test_env).unwrap();
        assert_eq!(
            provider.endpoint,
            "https://westus.tts.speech.microsoft.com/cognitiveservices/v1"
        );
    }

    #[test]
    fn test_missing_region() {
        let env = |key: &str| (key == "MS_TTS_KEY").then(|| "key".to_string());
        let result = AzureProvider::new(&ProviderConfig::default(), &env);
        match result {
            Err(TtsError::MissingCredential { env_var, .. }) => assert_eq!(env_var, "MS_TTS_REGION"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn test_ssml_defaults() {
        let ssml = build_ssml("Hello world.", &VoiceParameters::default());
        assert_eq!(
            ssml,
            "<speak version=\"1.0\" xmlns=\"http://www.w3.org/2001/10/synthesis\" xml:lang=\"en-US\"><voice name=\"en-US-GuyNeural\">Hello world.</voice></speak>"
        );
    }

    #[test]
    fn test_ssml_breaks_and_escaping() {
        let voice = VoiceParameters {
            break_duration_ms: Some(500),
            ..Default::default()
        };
        let ssml = build_ssml("Tom & Jerry @BRK# <Part two>", &voice);
        assert!(ssml.contains("Tom &amp; Jerry <break time=\"500ms\" /> &lt;Part two&gt;"));
    }

    #[test]
    fn test_ssml_prosody() {
        let voice = VoiceParameters {
            voice_name: Some("en-GB-RyanNeural".to_string()),
            voice_rate: Some("+10%".to_string()),
            voice_pitch: Some("-5Hz".to_string()),
            ..Default::default()
        };
        let ssml = build_ssml("Hi.", &voice);
        assert!(ssml.contains("<voice name=\"en-GB-RyanNeural\">"));
        assert!(ssml.contains("<prosody rate=\"+10%\" pitch=\"-5Hz\">Hi.</prosody>"));
    }

    #[test]
    fn test_output_format() {
        let provider = AzureProvider::new(&ProviderConfig::default(), &test_env).unwrap();
        assert_eq!(provider.output_format(&VoiceParameters::default()), AudioFormat::Mp3);
        let voice = VoiceParameters {
            output_format: Some("riff-24khz-16bit-mono-pcm".to_string()),
            ..Default::default()
        };
        assert_eq!(provider.output_format(&voice), AudioFormat::Wav);
    }

    #[test]
    fn test_validate_voice_rejects_unknown_format() {
        let provider = AzureProvider::new(&ProviderConfig::default(), &test_env).unwrap();
        assert!(provider.validate_voice(&VoiceParameters::default()).is_ok());
        let voice = VoiceParameters {
            output_format: Some("amr-wb-16000hz".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            provider.validate_voice(&voice),
            Err(TtsError::Configuration(_))
        ));
    }
}
