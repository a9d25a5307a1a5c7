//! Mock TTS provider for testing
//!
//! Provides a configurable mock provider that can simulate failures and
//! records every text it was asked to speak.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Result, TtsError};
use crate::provider::{
    AudioFormat, DEFAULT_BREAK_MARKER, SynthesizedAudio, TtsProvider, VoiceParameters,
};

/// A mock provider that returns the input text as "audio" bytes
pub struct MockProvider {
    /// Number of calls to fail before succeeding (0 = always succeed)
    fail_count: AtomicUsize,
    /// Current call count
    call_count: AtomicUsize,
    /// Message for failed calls
    fail_message: String,
    /// Texts received, in call order
    received: Mutex<Vec<String>>,
    /// Format stamped on produced audio
    format: AudioFormat,
    /// Break marker reported to callers
    break_marker: String,
    /// Message returned by validate_voice(), if it should fail
    voice_error: Option<String>,
}

impl MockProvider {
    fn build(fail_count: usize, fail_message: &str) -> Self {
        Self {
            fail_count: AtomicUsize::new(fail_count),
            call_count: AtomicUsize::new(0),
            fail_message: fail_message.to_string(),
            received: Mutex::new(Vec::new()),
            format: AudioFormat::Mp3,
            break_marker: DEFAULT_BREAK_MARKER.to_string(),
            voice_error: None,
        }
    }

    /// Create a provider that always succeeds
    pub fn always_succeeds() -> Self {
        Self::build(0, "")
    }

    /// Create a provider that always fails with the given message
    pub fn always_fails(message: &str) -> Self {
        Self::build(usize::MAX, message)
    }

    /// Create a provider that fails `n` times, then succeeds
    pub fn fails_then_succeeds(n: usize, message: &str) -> Self {
        Self::build(n, message)
    }

    /// Set the format of produced audio
    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the reported break marker
    pub fn with_break_marker(mut self, marker: &str) -> Self {
        self.break_marker = marker.to_string();
        self
    }

    /// Make validate_voice() reject every voice with the given message
    pub fn with_voice_error(mut self, message: &str) -> Self {
        self.voice_error = Some(message.to_string());
        self
    }

    /// Get the number of times synthesize() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Texts passed to synthesize(), in call order
    pub fn received(&self) -> Vec<String> {
        self.received
            .lock()
            .map(|texts| texts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TtsProvider for MockProvider {
    async fn synthesize(&self, text: &str, _voice: &VoiceParameters) -> Result<SynthesizedAudio> {
        let call_num = self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Ok(mut received) = self.received.lock() {
            received.push(text.to_string());
        }

        if call_num < self.fail_count.load(Ordering::SeqCst) {
            return Err(TtsError::synthesis("mock", self.fail_message.clone()));
        }

        Ok(SynthesizedAudio {
            data: text.as_bytes().to_vec(),
            format: self.format,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn break_marker(&self) -> &str {
        &self.break_marker
    }

    fn validate_voice(&self, _voice: &VoiceParameters) -> Result<()> {
        match &self.voice_error {
            Some(message) => Err(TtsError::Configuration(message.clone())),
            None => Ok(()),
        }
    }

    fn output_format(&self, _voice: &VoiceParameters) -> AudioFormat {
        self.format
    }

    fn supports_concurrent_requests(&self) -> bool {
        true
    }
}
