//! Language-aware text chunking for TTS processing.
//!
//! The splitting functions are pure; [`chunk_text`] wraps them with the
//! diagnostic logging the run loop wants.

use super::TextChunk;

/// Number of characters of each chunk shown in the diagnostic log.
pub const PREVIEW_CHARS: usize = 50;

/// CJK punctuation that must never open a chunk.
const CJK_PUNCTUATION: &str = "。，、？！：；“”‘’（）《》【】…—～·「」『』〈〉〖〗〔〕∶";

/// How a language's text is cut into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Codepoint by codepoint, for scripts written without spaces
    Character,
    /// Whitespace-separated words
    Word,
}

impl Strategy {
    /// Pick the strategy for a language tag such as `zh-CN` or `en-US`.
    pub fn for_language(language: &str) -> Self {
        if language.trim().to_ascii_lowercase().starts_with("zh") {
            Self::Character
        } else {
            Self::Word
        }
    }
}

/// Check if a character must stay attached to the chunk it arrives in.
///
/// Printable ASCII (33..=126) and common CJK punctuation qualify.
pub fn is_special_char(c: char) -> bool {
    let ord = c as u32;
    (33..=126).contains(&ord) || CJK_PUNCTUATION.contains(c)
}

/// Split text into chunks of at most `max_chars` characters.
///
/// The strategy is chosen from `language`. A chunk only exceeds the limit
/// when an indivisible token forces it: a single long word, or special
/// characters that may not start a chunk.
pub fn split_text(text: &str, max_chars: usize, language: &str) -> Vec<String> {
    match Strategy::for_language(language) {
        Strategy::Character => split_by_characters(text, max_chars),
        Strategy::Word => split_by_words(text, max_chars),
    }
}

/// Split text codepoint by codepoint.
///
/// Concatenating the result reproduces the input exactly.
pub fn split_by_characters(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for c in text.chars() {
        if current_len < max_chars || is_special_char(c) {
            current.push(c);
            current_len += 1;
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push(c);
            current_len = 1;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Split text on word boundaries.
///
/// Words are joined by single spaces; a word longer than `max_chars` is
/// emitted whole as its own chunk.
pub fn split_by_words(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let space_len = if current.is_empty() { 0 } else { 1 };

        if current_len + space_len + word_len <= max_chars {
            if space_len == 1 {
                current.push(' ');
            }
            current.push_str(word);
            current_len += space_len + word_len;
        } else {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            current.push_str(word);
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Log the chunk count and a short preview of each chunk.
pub fn log_chunks(chunks: &[String]) {
    log::info!("Split text into {} chunks", chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        let preview: String = chunk.chars().take(PREVIEW_CHARS).collect();
        log::info!("Chunk {}: {}...", i + 1, preview);
    }
}

/// Split text into chunks and log them.
pub fn chunk_text(text: &str, max_chars: usize, language: &str) -> Vec<String> {
    let chunks = split_text(text, max_chars, language);
    log_chunks(&chunks);
    chunks
}

/// Process a chapter's text into TTS-ready chunks.
///
/// # Arguments
/// * `chapter_id` - The chapter's index
/// * `text` - The chapter text
/// * `max_chars` - Backend-specific chunk size limit
/// * `language` - Language tag selecting the split strategy
pub fn process_chapter(
    chapter_id: usize,
    text: &str,
    max_chars: usize,
    language: &str,
) -> Vec<TextChunk> {
    chunk_text(text, max_chars, language)
        .into_iter()
        .enumerate()
        .map(|(chunk_id, text)| TextChunk::new(chapter_id, chunk_id, text))
        .collect()
}
