//! Text processing module for TTS: language-aware chunking.

pub mod chunker;

pub use chunker::process_chapter;

/// A chunk of text ready for TTS processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The chapter this chunk belongs to
    pub chapter_id: usize,
    /// The chunk index within the chapter
    pub chunk_id: usize,
    /// The text content
    pub text: String,
}

impl TextChunk {
    /// Create a new text chunk.
    pub fn new(chapter_id: usize, chunk_id: usize, text: String) -> Self {
        Self {
            chapter_id,
            chunk_id,
            text,
        }
    }
}
