//! Book parsing: the parser trait, chapter model and format registry.

pub mod epub;
pub mod rules;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{NarratorError, Result};
pub use epub::EpubBookParser;
pub use rules::SearchReplaceRule;

/// Title used when a book or chapter has no usable title.
pub const UNTITLED: &str = "Untitled";

/// Author used when a book has no creator metadata.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// How chapter titles are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TitleMode {
    /// Heading tag text, unless missing or a bare number
    #[default]
    Auto,
    /// Text of the first `title`, `h1`, `h2` or `h3` tag
    #[value(name = "tag_text")]
    TagText,
    /// The first characters of the chapter body
    #[value(name = "first_few")]
    FirstFew,
}

/// How paragraph breaks are detected in chapter text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum NewlineMode {
    /// Every line break starts a paragraph
    Single,
    /// A blank line starts a paragraph
    #[default]
    Double,
    /// The whole chapter is one paragraph
    None,
}

/// Settings a book parser needs.
#[derive(Debug, Clone, Default)]
pub struct ParserConfig {
    pub input_file: PathBuf,
    pub title_mode: TitleMode,
    pub newline_mode: NewlineMode,
    pub remove_endnotes: bool,
    pub search_and_replace_file: Option<PathBuf>,
}

/// One line of chapter content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub text: String,
    /// Whether this line is the chapter's heading
    pub is_title: bool,
}

impl ContentItem {
    pub fn body(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_title: false,
        }
    }

    pub fn title(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_title: true,
        }
    }
}

/// A chapter extracted from a book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// 1-based position among the book's non-empty chapters
    pub index: usize,
    /// Filesystem-safe title
    pub title: String,
    /// Content in reading order
    pub items: Vec<ContentItem>,
    /// Separator placed between items when the chapter is read as one text
    pub break_marker: String,
}

impl Chapter {
    /// Full chapter text, items separated by the break marker.
    pub fn text(&self) -> String {
        self.items
            .iter()
            .map(|item| item.text.as_str())
            .collect::<Vec<_>>()
            .join(&self.break_marker)
    }

    /// Character count of the chapter text.
    pub fn char_count(&self) -> usize {
        self.text().chars().count()
    }
}

/// Trait for book parsers - one implementation per document format
pub trait BookParser: Send + Sync {
    /// Reject configurations this parser cannot handle.
    ///
    /// Implementations call this from their constructor, so an invalid input
    /// never yields a parser.
    fn validate_config(config: &ParserConfig) -> Result<()>
    where
        Self: Sized;

    /// Book title from metadata, or [`UNTITLED`]
    fn book_title(&self) -> String;

    /// Book author from metadata, or [`UNKNOWN_AUTHOR`]
    fn book_author(&self) -> String;

    /// Chapters in reading order, with paragraph breaks turned into `break_marker`
    fn chapters(&self, break_marker: &str) -> Vec<Chapter>;

    /// Search and replace rules applied to chapter text
    fn search_and_replaces(&self) -> &[SearchReplaceRule];
}

/// File extensions with a parser, in registry order
pub fn supported_book_parsers() -> &'static [&'static str] {
    &[epub::EXTENSION]
}

/// Lowercased extension of `path`, if any.
pub(crate) fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// Create the parser for the configured input file
pub fn get_book_parser(config: &ParserConfig) -> Result<Box<dyn BookParser>> {
    match extension_of(&config.input_file).as_deref() {
        Some(epub::EXTENSION) => Ok(Box::new(EpubBookParser::new(config.clone())?)),
        _ => Err(NarratorError::UnsupportedFormat {
            path: config.input_file.clone(),
        }),
    }
}

/// Turn a raw title into a filesystem-safe token.
///
/// Runs of non-alphanumeric characters collapse to `_` and are trimmed from
/// both ends. Blank titles, and titles with nothing alphanumeric, become
/// `fallback`.
pub fn sanitize_title(fallback: &str, raw: &str) -> String {
    let mut sanitized = String::with_capacity(raw.len());
    let mut pending_separator = false;

    for c in raw.chars() {
        if c.is_alphanumeric() {
            if pending_separator && !sanitized.is_empty() {
                sanitized.push('_');
            }
            pending_separator = false;
            sanitized.push(c);
        } else {
            pending_separator = true;
        }
    }

    if sanitized.is_empty() {
        fallback.to_string()
    } else {
        sanitized
    }
}
