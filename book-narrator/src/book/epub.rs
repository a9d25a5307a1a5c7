// EPUB parsing and text extraction

use epub::doc::EpubDoc;
use regex::Regex;
use std::sync::OnceLock;

use super::rules::{SearchReplaceRule, apply_rules, load_rules};
use super::{
    BookParser, Chapter, ContentItem, NewlineMode, ParserConfig, TitleMode, UNKNOWN_AUTHOR,
    UNTITLED, extension_of, sanitize_title,
};
use crate::error::{NarratorError, Result};

/// File extension handled by this parser.
pub const EXTENSION: &str = "epub";

/// Characters of body text used for `first_few` titles.
pub const FIRST_FEW_CHARS: usize = 60;

/// Wrap width handed to html2text, wide enough that paragraphs stay on one line.
const TEXT_WIDTH: usize = 10_000;

/// Tags searched for a chapter heading, in priority order.
const HEADING_TAGS: [&str; 4] = ["title", "h1", "h2", "h3"];

/// Parsed EPUB book
#[derive(Debug)]
pub struct EpubBookParser {
    config: ParserConfig,
    title: Option<String>,
    author: Option<String>,
    /// Content documents in spine order
    documents: Vec<String>,
    rules: Vec<SearchReplaceRule>,
}

impl EpubBookParser {
    /// Open and read an EPUB file.
    ///
    /// Validation runs first, so an unsupported path never touches the filesystem.
    pub fn new(config: ParserConfig) -> Result<Self> {
        Self::validate_config(&config)?;

        let rules = match &config.search_and_replace_file {
            Some(path) => load_rules(path)?,
            None => Vec::new(),
        };

        let epub_error = |message: String| NarratorError::Epub {
            path: config.input_file.clone(),
            message,
        };

        let mut doc = EpubDoc::new(&config.input_file).map_err(|e| epub_error(e.to_string()))?;

        let title = doc.mdata("title").map(|m| m.value.clone());
        let author = doc.mdata("creator").map(|m| m.value.clone());

        let mut documents = Vec::new();
        let spine = doc.spine.clone();
        for spine_item in spine.iter() {
            match doc.get_resource(&spine_item.idref) {
                Some((content_bytes, _mime)) => {
                    documents.push(String::from_utf8_lossy(&content_bytes).into_owned());
                }
                None => log::warn!("Spine item {} has no resource, skipping", spine_item.idref),
            }
        }

        log::info!(
            "Read {} content documents from {}",
            documents.len(),
            config.input_file.display()
        );

        Ok(Self {
            config,
            title,
            author,
            documents,
            rules,
        })
    }

    #[cfg(test)]
    fn from_parts(
        config: ParserConfig,
        title: Option<String>,
        author: Option<String>,
        documents: Vec<String>,
        rules: Vec<SearchReplaceRule>,
    ) -> Self {
        Self {
            config,
            title,
            author,
            documents,
            rules,
        }
    }

    /// Endnote removal and search and replace rules, in that order.
    fn clean(&self, text: &str) -> String {
        let text = if self.config.remove_endnotes {
            remove_endnotes(text)
        } else {
            text.to_string()
        };
        apply_rules(&self.rules, &text)
    }

    /// Build one chapter from a content document, or `None` if it has no text.
    ///
    /// Cleanup runs on the whole chapter with paragraphs already joined by
    /// `break_marker`, so rules can anchor on or span paragraph breaks. The
    /// result is split back into items at the marker.
    fn build_chapter(&self, index: usize, html: &str, break_marker: &str) -> Option<Chapter> {
        let heading = extract_heading(html);
        let paragraphs = split_paragraphs(&html_to_text(html), self.config.newline_mode);
        let text = self.clean(&paragraphs.join(break_marker));

        let separator = match break_marker.trim() {
            "" => break_marker,
            trimmed => trimmed,
        };
        let pieces: Vec<&str> = if separator.is_empty() {
            vec![text.as_str()]
        } else {
            text.split(separator).collect()
        };

        let heading_text = heading
            .as_deref()
            .map(|h| collapse_whitespace(&self.clean(h)));
        let mut title_marked = false;
        let mut items: Vec<ContentItem> = Vec::new();
        for piece in pieces {
            let cleaned = collapse_whitespace(piece);
            if cleaned.is_empty() {
                continue;
            }
            if !title_marked && heading_text.as_deref() == Some(cleaned.as_str()) {
                title_marked = true;
                items.push(ContentItem::title(cleaned));
            } else {
                items.push(ContentItem::body(cleaned));
            }
        }

        if items.is_empty() {
            return None;
        }

        let raw_title = choose_title(self.config.title_mode, heading.as_deref(), &items);
        Some(Chapter {
            index,
            title: sanitize_title(UNTITLED, &raw_title),
            items,
            break_marker: break_marker.to_string(),
        })
    }
}

impl BookParser for EpubBookParser {
    fn validate_config(config: &ParserConfig) -> Result<()> {
        if extension_of(&config.input_file).as_deref() != Some(EXTENSION) {
            return Err(NarratorError::UnsupportedFormat {
                path: config.input_file.clone(),
            });
        }
        Ok(())
    }

    fn book_title(&self) -> String {
        non_blank(self.title.as_deref()).unwrap_or_else(|| UNTITLED.to_string())
    }

    fn book_author(&self) -> String {
        non_blank(self.author.as_deref()).unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
    }

    fn chapters(&self, break_marker: &str) -> Vec<Chapter> {
        let mut chapters = Vec::new();
        for (i, html) in self.documents.iter().enumerate() {
            match self.build_chapter(chapters.len() + 1, html, break_marker) {
                Some(chapter) => chapters.push(chapter),
                None => log::debug!("Skipping empty document {}", i + 1),
            }
        }
        chapters
    }

    fn search_and_replaces(&self) -> &[SearchReplaceRule] {
        &self.rules
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Pick the raw chapter title for a title mode.
fn choose_title(mode: TitleMode, heading: Option<&str>, items: &[ContentItem]) -> String {
    let first_few = || {
        let body = items
            .iter()
            .map(|item| item.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        body.chars().take(FIRST_FEW_CHARS).collect::<String>()
    };

    match mode {
        TitleMode::TagText => heading.unwrap_or_default().to_string(),
        TitleMode::FirstFew => first_few(),
        TitleMode::Auto => match heading {
            Some(h) if !is_bare_number(h) => h.to_string(),
            _ => first_few(),
        },
    }
}

/// Headings like "7" or "12" carry no useful title.
fn is_bare_number(text: &str) -> bool {
    (1..=3).contains(&text.len()) && text.chars().all(|c| c.is_ascii_digit())
}

/// Extract the first non-empty heading (title, h1, h2 or h3), whitespace collapsed.
fn extract_heading(html: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets aligned with `html`
    let html_lower = html.to_ascii_lowercase();

    for tag in HEADING_TAGS {
        let open = format!("<{tag}");
        let close = format!("</{tag}>");

        let mut search_from = 0;
        while let Some(found) = html_lower[search_from..].find(&open) {
            let start = search_from + found;
            let after_name = start + open.len();
            search_from = after_name;

            // `<h1` must not match `<h10` or `<header`, nor `<title` match `<titles`
            match html_lower[after_name..].chars().next() {
                Some(c) if c == '>' || c == '/' || c.is_whitespace() => {}
                _ => continue,
            }

            let Some(tag_end) = html_lower[start..].find('>') else {
                break;
            };
            let content_start = start + tag_end + 1;
            let Some(end) = html_lower[content_start..].find(&close) else {
                break;
            };

            let title = collapse_whitespace(&decode_entities(&strip_html_tags(
                &html[content_start..content_start + end],
            )));
            if !title.is_empty() {
                return Some(title);
            }
        }
    }

    None
}

/// Strip HTML tags from a string
fn strip_html_tags(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;

    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    result
}

/// Decode the entities common in EPUB headings.
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&mdash;", "—")
        .replace("&ndash;", "–")
        .replace("&hellip;", "...")
        .replace("&rsquo;", "'")
        .replace("&lsquo;", "'")
        .replace("&rdquo;", "\"")
        .replace("&ldquo;", "\"")
        .replace("&amp;", "&")
}

/// Remove the `<head>` element so its `<title>` is not read as body text.
fn strip_head(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let start = lower.find("<head>").or_else(|| lower.find("<head "));
    match start {
        Some(start) => match lower[start..].find("</head>") {
            Some(end) => format!("{}{}", &html[..start], &html[start + end + "</head>".len()..]),
            None => html.to_string(),
        },
        None => html.to_string(),
    }
}

fn markup_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // Link footnote lines: "[1]: target"
            (r"(?m)^\[\d+\]: .*$", ""),
            // Link text with reference: "[text][1]"
            (r"\[([^\[\]\n]*)\]\[\d+\]", "$1"),
            // Heading marks
            (r"(?m)^#+ ", ""),
            // Emphasis
            (r"\*{1,2}([^*\n]+?)\*{1,2}", "$1"),
            // Horizontal rules
            (r"(?m)^[─━-]{3,}$", ""),
        ]
        .into_iter()
        .map(|(pattern, replacement)| {
            (
                Regex::new(pattern).expect("markup patterns are valid"),
                replacement,
            )
        })
        .collect()
    })
}

/// Convert HTML to plain text with one blank line between blocks
fn html_to_text(html: &str) -> String {
    let text = html2text::from_read(strip_head(html).as_bytes(), TEXT_WIDTH);

    markup_patterns()
        .iter()
        .fold(text, |acc, (pattern, replacement)| {
            pattern.replace_all(&acc, *replacement).into_owned()
        })
}

/// Split converted text into paragraphs according to the newline mode.
fn split_paragraphs(text: &str, mode: NewlineMode) -> Vec<String> {
    let blocks: Vec<String> = match mode {
        NewlineMode::Single => text.lines().map(str::to_string).collect(),
        NewlineMode::None => vec![text.to_string()],
        NewlineMode::Double => {
            let mut blocks = Vec::new();
            let mut current: Vec<&str> = Vec::new();
            for line in text.lines() {
                if line.trim().is_empty() {
                    if !current.is_empty() {
                        blocks.push(current.join(" "));
                        current.clear();
                    }
                } else {
                    current.push(line);
                }
            }
            if !current.is_empty() {
                blocks.push(current.join(" "));
            }
            blocks
        }
    };

    blocks
        .iter()
        .map(|block| collapse_whitespace(block))
        .filter(|block| !block.is_empty())
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip endnote numbers directly following a letter or closing punctuation.
pub fn remove_endnotes(text: &str) -> String {
    static ENDNOTE: OnceLock<Regex> = OnceLock::new();
    let pattern = ENDNOTE
        .get_or_init(|| Regex::new(r#"([a-zA-Z.,!?;”")])\d+"#).expect("endnote pattern is valid"));
    pattern.replace_all(text, "$1").into_owned()
}
