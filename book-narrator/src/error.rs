use std::path::PathBuf;
use thiserror::Error;
use tts_client::TtsError;

#[derive(Error, Debug)]
pub enum NarratorError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported file format: {}", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Unsupported TTS provider '{name}'. Available: {available}")]
    UnsupportedProvider { name: String, available: String },

    #[error("Malformed search and replace rule at {}:{line}: {reason}", .path.display())]
    MalformedRule {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Synthesis failed for chapter {chapter}, chunk {chunk}: {source}")]
    Synthesis {
        chapter: usize,
        chunk: usize,
        #[source]
        source: TtsError,
    },

    #[error("Error while setting audio tags for {}: {source}", .path.display())]
    Tagging {
        path: PathBuf,
        #[source]
        source: id3::Error,
    },

    #[error("Failed to read EPUB {}: {message}", .path.display())]
    Epub { path: PathBuf, message: String },

    #[error("TTS error: {0}")]
    Tts(#[from] TtsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NarratorError>;
