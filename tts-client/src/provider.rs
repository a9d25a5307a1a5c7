use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TtsError};

/// Paragraph marker used by providers that have no special handling for section breaks.
pub const DEFAULT_BREAK_MARKER: &str = "\n\n";

/// Container format of synthesized audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Opus,
    Aac,
    Flac,
    Wav,
    Pcm,
    Ogg,
    Webm,
}

impl AudioFormat {
    /// Resolve a provider output-format identifier.
    ///
    /// Accepts bare names (`mp3`, `wav`) as well as vendor identifiers such as
    /// `audio-24khz-48kbitrate-mono-mp3` or `riff-24khz-16bit-mono-pcm`.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let id = identifier.trim().to_lowercase();
        match id.as_str() {
            "mp3" => return Some(Self::Mp3),
            "opus" => return Some(Self::Opus),
            "aac" => return Some(Self::Aac),
            "flac" => return Some(Self::Flac),
            "wav" => return Some(Self::Wav),
            "pcm" => return Some(Self::Pcm),
            "ogg" => return Some(Self::Ogg),
            "webm" => return Some(Self::Webm),
            _ => {}
        }

        if id.starts_with("riff-") {
            return Some(Self::Wav);
        }
        if id.starts_with("raw-") {
            return Some(Self::Pcm);
        }
        if id.starts_with("ogg-") {
            return Some(Self::Ogg);
        }
        if id.starts_with("webm-") {
            return Some(Self::Webm);
        }
        if id.ends_with("-mp3") {
            return Some(Self::Mp3);
        }
        if id.ends_with("-opus") {
            return Some(Self::Opus);
        }
        None
    }

    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
            Self::Aac => "aac",
            Self::Flac => "flac",
            Self::Wav => "wav",
            Self::Pcm => "pcm",
            Self::Ogg => "ogg",
            Self::Webm => "webm",
        }
    }

    /// Whether segments of this format stay playable when appended byte-wise.
    pub fn is_appendable(&self) -> bool {
        matches!(self, Self::Mp3 | Self::Aac | Self::Pcm)
    }

    /// Whether an ID3 tag can be stamped onto files of this format.
    pub fn supports_id3(&self) -> bool {
        matches!(self, Self::Mp3)
    }
}

/// Reject an `output_format` identifier that does not name a known container.
///
/// An unset identifier is accepted; providers fall back to their default.
pub(crate) fn check_output_format(provider: &str, voice: &VoiceParameters) -> Result<()> {
    match voice.output_format.as_deref() {
        Some(id) if AudioFormat::from_identifier(id).is_none() => Err(TtsError::Configuration(
            format!("{provider}: unsupported output format '{id}'"),
        )),
        _ => Ok(()),
    }
}

/// Audio produced for one chunk of text.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub data: Vec<u8>,
    pub format: AudioFormat,
}

/// Voice settings for a synthesis request.
///
/// Every field is optional. Each provider reads the settings it understands
/// and ignores the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceParameters {
    /// Language tag, e.g. `en-US`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Provider-specific voice identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_name: Option<String>,

    /// Provider-specific output format identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,

    /// Neural model name (openai) or model file (piper)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    /// Speaking rate, e.g. `+10%`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_rate: Option<String>,

    /// Volume, e.g. `-20%`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_volume: Option<String>,

    /// Baseline pitch, e.g. `+5Hz`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_pitch: Option<String>,

    /// Proxy URL for providers that go through one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Pause inserted at section breaks, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_duration_ms: Option<u32>,

    /// Speaker id for multi-speaker piper models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub piper_speaker: Option<u32>,

    /// Seconds of silence after each sentence (piper)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub piper_sentence_silence: Option<f32>,

    /// Phoneme length scale (piper)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub piper_length_scale: Option<f32>,
}

/// Trait for text-to-speech providers
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Synthesize one bounded chunk of text
    async fn synthesize(&self, text: &str, voice: &VoiceParameters) -> Result<SynthesizedAudio>;

    /// Registry name of the provider
    fn name(&self) -> &'static str;

    /// Marker the provider wants between sections of a chapter
    fn break_marker(&self) -> &str {
        DEFAULT_BREAK_MARKER
    }

    /// Check voice settings before any audio is requested.
    ///
    /// Callers run this once before a batch so that a bad setting fails the
    /// run up front instead of at the first chunk.
    fn validate_voice(&self, _voice: &VoiceParameters) -> Result<()> {
        Ok(())
    }

    /// Output format produced for the given voice settings
    fn output_format(&self, voice: &VoiceParameters) -> AudioFormat;

    /// Whether concurrent `synthesize` calls on one instance are safe.
    ///
    /// Callers must serialize calls on an instance that returns `false`.
    fn supports_concurrent_requests(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_bare_names() {
        assert_eq!(AudioFormat::from_identifier("mp3"), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::from_identifier("WAV"), Some(AudioFormat::Wav));
        assert_eq!(AudioFormat::from_identifier("opus"), Some(AudioFormat::Opus));
        assert_eq!(AudioFormat::from_identifier("mp4"), None);
    }

    #[test]
    fn test_format_from_vendor_identifiers() {
        assert_eq!(
            AudioFormat::from_identifier("audio-24khz-48kbitrate-mono-mp3"),
            Some(AudioFormat::Mp3)
        );
        assert_eq!(
            AudioFormat::from_identifier("riff-24khz-16bit-mono-pcm"),
            Some(AudioFormat::Wav)
        );
        assert_eq!(
            AudioFormat::from_identifier("raw-16khz-16bit-mono-pcm"),
            Some(AudioFormat::Pcm)
        );
        assert_eq!(
            AudioFormat::from_identifier("ogg-48khz-16bit-mono-opus"),
            Some(AudioFormat::Ogg)
        );
    }

    #[test]
    fn test_unknown_vendor_format_rejected() {
        for id in ["amr-wb-16000hz", "g722-16khz-64kbps", "audio-16khz-16kbps-mono-siren"] {
            assert_eq!(AudioFormat::from_identifier(id), None);
            let voice = VoiceParameters {
                output_format: Some(id.to_string()),
                ..Default::default()
            };
            assert!(matches!(
                check_output_format("azure", &voice),
                Err(TtsError::Configuration(_))
            ));
        }
        assert!(check_output_format("azure", &VoiceParameters::default()).is_ok());
    }

    #[test]
    fn test_format_capabilities() {
        assert!(AudioFormat::Mp3.is_appendable());
        assert!(AudioFormat::Mp3.supports_id3());
        assert!(!AudioFormat::Wav.is_appendable());
        assert!(!AudioFormat::Flac.supports_id3());
        assert_eq!(AudioFormat::Ogg.extension(), "ogg");
    }

    #[test]
    fn test_voice_parameters_ignore_unknown_keys() {
        let toml_str = r#"
voice_name = "en-US-GuyNeural"
break_duration_ms = 750
something_else = "ignored"
"#;
        let voice: VoiceParameters = toml::from_str(toml_str).unwrap();
        assert_eq!(voice.voice_name.as_deref(), Some("en-US-GuyNeural"));
        assert_eq!(voice.break_duration_ms, Some(750));
        assert!(voice.model_name.is_none());
    }
}
