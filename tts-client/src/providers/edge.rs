//! Microsoft Edge read-aloud provider
//!
//! Drives the `edge-tts` command line tool, which writes MP3 audio to a file.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

use super::process::{locate_executable, run_command};
use crate::config::ProviderConfig;
use crate::error::{Result, TtsError};
use crate::provider::{AudioFormat, SynthesizedAudio, TtsProvider, VoiceParameters};

pub(crate) const NAME: &str = "edge";

const DEFAULT_EXECUTABLE: &str = "edge-tts";
const DEFAULT_VOICE: &str = "en-US-GuyNeural";

/// Provider backed by the `edge-tts` executable
pub struct EdgeProvider {
    executable: PathBuf,
    timeout: Duration,
}

impl EdgeProvider {
    /// Create a new Edge provider
    ///
    /// Returns an error if the `edge-tts` executable cannot be found.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let executable = locate_executable(config.executable.as_deref(), DEFAULT_EXECUTABLE, "Edge TTS")?;
        Ok(Self {
            executable,
            timeout: config.timeout(),
        })
    }

    /// Command line arguments for one request, excluding the output file.
    fn arguments(text: &str, voice: &VoiceParameters) -> Vec<String> {
        let mut args = vec![
            "--voice".to_string(),
            voice.voice_name.clone().unwrap_or_else(|| DEFAULT_VOICE.to_string()),
            "--text".to_string(),
            text.to_string(),
        ];

        // `--flag=value` form keeps negative values like -10% from parsing as flags
        if let Some(rate) = &voice.voice_rate {
            args.push(format!("--rate={}", rate));
        }
        if let Some(volume) = &voice.voice_volume {
            args.push(format!("--volume={}", volume));
        }
        if let Some(pitch) = &voice.voice_pitch {
            args.push(format!("--pitch={}", pitch));
        }
        if let Some(proxy) = &voice.proxy {
            args.push(format!("--proxy={}", proxy));
        }

        args
    }
}

#[async_trait]
impl TtsProvider for EdgeProvider {
    async fn synthesize(&self, text: &str, voice: &VoiceParameters) -> Result<SynthesizedAudio> {
        let workdir = tempfile::tempdir()?;
        let output_path = workdir.path().join("chunk.mp3");

        let mut cmd = Command::new(&self.executable);
        cmd.args(Self::arguments(text, voice))
            .arg("--write-media")
            .arg(&output_path);

        run_command(cmd, None, self.timeout, NAME).await?;

        let data = tokio::fs::read(&output_path)
            .await
            .map_err(|e| TtsError::synthesis(NAME, format!("No audio written: {}", e)))?;

        Ok(SynthesizedAudio {
            data,
            format: AudioFormat::Mp3,
        })
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn output_format(&self, _voice: &VoiceParameters) -> AudioFormat {
        AudioFormat::Mp3
    }

    fn supports_concurrent_requests(&self) -> bool {
        // Each call runs its own process with its own output file
        true
    }
}
