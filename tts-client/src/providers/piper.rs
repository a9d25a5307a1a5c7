//! Piper local neural TTS provider
//!
//! Text is piped to the `piper` executable, which writes a WAV file.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

use super::process::{locate_executable, run_command};
use crate::config::ProviderConfig;
use crate::error::{Result, TtsError};
use crate::provider::{AudioFormat, SynthesizedAudio, TtsProvider, VoiceParameters};

pub(crate) const NAME: &str = "piper";

const DEFAULT_EXECUTABLE: &str = "piper";

/// Provider backed by the `piper` executable
pub struct PiperProvider {
    executable: PathBuf,
    timeout: Duration,
}

impl PiperProvider {
    /// Create a new Piper provider
    ///
    /// Returns an error if the `piper` executable cannot be found.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let executable = locate_executable(config.executable.as_deref(), DEFAULT_EXECUTABLE, "Piper")?;
        Ok(Self {
            executable,
            timeout: config.timeout(),
        })
    }

    /// Voice model from `model_name`; piper cannot run without one.
    fn model(voice: &VoiceParameters) -> Result<&str> {
        voice
            .model_name
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| {
                TtsError::Configuration("Piper: no voice model configured (set model_name)".to_string())
            })
    }

    /// Command line arguments for one request, excluding the output file.
    fn arguments(voice: &VoiceParameters) -> Result<Vec<String>> {
        let model = Self::model(voice)?;

        let mut args = vec!["--model".to_string(), model.to_string()];

        if let Some(speaker) = voice.piper_speaker {
            args.push("--speaker".to_string());
            args.push(speaker.to_string());
        }
        if let Some(silence) = voice.piper_sentence_silence {
            args.push("--sentence_silence".to_string());
            args.push(silence.to_string());
        }
        if let Some(scale) = voice.piper_length_scale {
            args.push("--length_scale".to_string());
            args.push(scale.to_string());
        }

        Ok(args)
    }
}

#[async_trait]
impl TtsProvider for PiperProvider {
    async fn synthesize(&self, text: &str, voice: &VoiceParameters) -> Result<SynthesizedAudio> {
        let args = Self::arguments(voice)?;

        let workdir = tempfile::tempdir()?;
        let output_path = workdir.path().join("chunk.wav");

        let mut cmd = Command::new(&self.executable);
        cmd.args(args).arg("--output_file").arg(&output_path);

        run_command(cmd, Some(text), self.timeout, NAME).await?;

        let data = tokio::fs::read(&output_path)
            .await
            .map_err(|e| TtsError::synthesis(NAME, format!("No audio written: {}", e)))?;

        Ok(SynthesizedAudio {
            data,
            format: AudioFormat::Wav,
        })
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn validate_voice(&self, voice: &VoiceParameters) -> Result<()> {
        Self::model(voice).map(|_| ())
    }

    fn output_format(&self, _voice: &VoiceParameters) -> AudioFormat {
        AudioFormat::Wav
    }

    fn supports_concurrent_requests(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_require_model() {
        let result = PiperProvider::arguments(&VoiceParameters::default());
        assert!(matches!(result, Err(TtsError::Configuration(_))));
    }

    #[test]
    fn test_validate_voice_requires_model() {
        let provider = PiperProvider {
            executable: PathBuf::from("piper"),
            timeout: Duration::from_secs(5),
        };
        let blank = VoiceParameters {
            model_name: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            provider.validate_voice(&blank),
            Err(TtsError::Configuration(_))
        ));
        let voice = VoiceParameters {
            model_name: Some("voice.onnx".to_string()),
            ..Default::default()
        };
        assert!(provider.validate_voice(&voice).is_ok());
    }

    #[test]
    fn test_arguments_full() {
        let voice = VoiceParameters {
            model_name: Some("en_US-lessac-medium.onnx".to_string()),
            piper_speaker: Some(2),
            piper_sentence_silence: Some(0.2),
            piper_length_scale: Some(1.5),
            voice_rate: Some("+10%".to_string()),
            ..Default::default()
        };
        let args = PiperProvider::arguments(&voice).unwrap();
        assert_eq!(
            args,
            vec![
                "--model",
                "en_US-lessac-medium.onnx",
                "--speaker",
                "2",
                "--sentence_silence",
                "0.2",
                "--length_scale",
                "1.5",
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_synthesize_with_stand_in_executable() {
        use std::os::unix::fs::PermissionsExt;

        // Stand-in for piper: writes stdin to the --output_file path
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("piper");
        std::fs::write(
            &script,
            "#!/bin/sh\nwhile [ $# -gt 0 ]; do\n  case \"$1\" in\n    --output_file) out=\"$2\"; shift 2;;\n    *) shift;;\n  esac\ndone\ncat > \"$out\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = ProviderConfig {
            executable: Some(script),
            ..Default::default()
        };
        let provider = PiperProvider::new(&config).unwrap();
        let voice = VoiceParameters {
            model_name: Some("voice.onnx".to_string()),
            ..Default::default()
        };
        let audio = provider.synthesize("read me aloud", &voice).await.unwrap();
        assert_eq!(audio.data, b"read me aloud");
        assert_eq!(audio.format, AudioFormat::Wav);
    }
}
