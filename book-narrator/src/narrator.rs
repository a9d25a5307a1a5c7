//! Audiobook generation: parser, chunker, provider, output files and tags.

use indicatif::{ProgressBar, ProgressStyle};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tts_client::{ProviderConfig, SynthesizedAudio, TtsError, TtsProvider, VoiceParameters};

use crate::audio::{AudioTagSet, ChapterOutput, set_audio_tags};
use crate::book::{BookParser, Chapter};
use crate::error::{NarratorError, Result};
use crate::text::{TextChunk, process_chapter};

/// Run settings that are not owned by the parser or the provider.
#[derive(Debug, Clone)]
pub struct NarratorOptions {
    pub output_folder: PathBuf,
    /// Language tag, selects the chunking strategy
    pub language: String,
    pub voice: VoiceParameters,
    /// Maximum characters per synthesis request
    pub chunk_limit: usize,
    /// First chapter to narrate, 1-based
    pub chapter_start: i64,
    /// Last chapter to narrate, 1-based; -1 means the last chapter
    pub chapter_end: i64,
    /// Write each chapter's text next to its audio
    pub output_text: bool,
    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

impl Default for NarratorOptions {
    fn default() -> Self {
        Self {
            output_folder: PathBuf::from("."),
            language: "en-US".to_string(),
            voice: VoiceParameters::default(),
            chunk_limit: crate::config::DEFAULT_CHUNK_LIMIT,
            chapter_start: 1,
            chapter_end: -1,
            output_text: false,
            show_progress: false,
        }
    }
}

/// One line of the chapter preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterSummary {
    pub index: usize,
    pub title: String,
    pub char_count: usize,
}

/// What a run produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub chapters: usize,
    pub chunks: usize,
    /// Audio files in write order
    pub audio_files: Vec<PathBuf>,
    pub text_files: Vec<PathBuf>,
}

/// Turn a 1-based inclusive chapter range into slice indices.
///
/// `end == -1` selects through the last chapter. An end past the last
/// chapter is clamped.
pub fn resolve_chapter_range(start: i64, end: i64, total: usize) -> Result<Range<usize>> {
    if start < 1 {
        return Err(NarratorError::Configuration(format!(
            "chapter_start must be 1 or greater, got {start}"
        )));
    }
    if total == 0 {
        return Ok(0..0);
    }
    let total_i64 = total as i64;
    let end = if end == -1 { total_i64 } else { end.min(total_i64) };
    if end < 1 {
        return Err(NarratorError::Configuration(format!(
            "chapter_end must be 1 or greater, or -1 for the last chapter, got {end}"
        )));
    }
    if start > end {
        return Err(NarratorError::Configuration(format!(
            "chapter_start ({start}) is after chapter_end ({end}); the book has {total} chapters"
        )));
    }
    Ok((start - 1) as usize..end as usize)
}

/// Build a provider by registry name.
///
/// An unregistered name fails like an unsupported input format.
pub fn create_tts_provider(name: &str, config: &ProviderConfig) -> Result<Arc<dyn TtsProvider>> {
    match tts_client::create_provider(name, config) {
        Ok(provider) => Ok(Arc::from(provider)),
        Err(TtsError::UnknownProvider { name, available }) => {
            Err(NarratorError::UnsupportedProvider { name, available })
        }
        Err(e) => Err(e.into()),
    }
}

/// Drives one book through a TTS provider.
pub struct AudiobookGenerator {
    parser: Box<dyn BookParser>,
    provider: Arc<dyn TtsProvider>,
    options: NarratorOptions,
}

impl AudiobookGenerator {
    pub fn new(
        parser: Box<dyn BookParser>,
        provider: Arc<dyn TtsProvider>,
        options: NarratorOptions,
    ) -> Self {
        Self {
            parser,
            provider,
            options,
        }
    }

    /// Chapters selected by the configured range, with the provider's break marker.
    pub fn selected_chapters(&self) -> Result<Vec<Chapter>> {
        let chapters = self.parser.chapters(self.provider.break_marker());
        let range = resolve_chapter_range(
            self.options.chapter_start,
            self.options.chapter_end,
            chapters.len(),
        )?;
        Ok(chapters[range].to_vec())
    }

    /// List the selected chapters without synthesizing anything.
    pub fn preview(&self) -> Result<Vec<ChapterSummary>> {
        let chapters = self.selected_chapters()?;
        let summaries = chapters
            .iter()
            .map(|chapter| ChapterSummary {
                index: chapter.index,
                title: chapter.title.clone(),
                char_count: chapter.char_count(),
            })
            .collect::<Vec<_>>();
        let total: usize = summaries.iter().map(|s| s.char_count).sum();
        log::info!("Previewed {} chapters, {} characters", summaries.len(), total);
        Ok(summaries)
    }

    /// Narrate the selected chapters into the output folder.
    ///
    /// Voice settings are checked before anything is written. Chapters are
    /// processed in order and chunks are synthesized one at a time. The first
    /// synthesis failure stops the run.
    pub async fn run(&self) -> Result<RunSummary> {
        self.provider.validate_voice(&self.options.voice)?;
        let chapters = self.selected_chapters()?;
        let mut summary = RunSummary::default();
        if chapters.is_empty() {
            log::warn!("No chapters to narrate");
            return Ok(summary);
        }

        let book_title = self.parser.book_title();
        let book_author = self.parser.book_author();
        let format = self.provider.output_format(&self.options.voice);
        log::info!(
            "Narrating \"{}\" by {} with {} ({} chapters, {} output)",
            book_title,
            book_author,
            self.provider.name(),
            chapters.len(),
            format.extension()
        );

        tokio::fs::create_dir_all(&self.options.output_folder).await?;

        let chunked: Vec<(&Chapter, Vec<TextChunk>)> = chapters
            .iter()
            .map(|chapter| {
                let chunks = process_chapter(
                    chapter.index,
                    &chapter.text(),
                    self.options.chunk_limit,
                    &self.options.language,
                );
                (chapter, chunks)
            })
            .collect();
        let total_chunks: usize = chunked.iter().map(|(_, chunks)| chunks.len()).sum();
        let progress = self.progress_bar(total_chunks as u64);

        for (chapter, chunks) in &chunked {
            progress.set_message(chapter.title.clone());
            let mut output =
                ChapterOutput::new(&self.options.output_folder, chapter.index, &chapter.title, format);

            if self.options.output_text {
                let text = chapter
                    .items
                    .iter()
                    .map(|item| item.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                summary.text_files.push(output.write_text(&text).await?);
            }

            for chunk in chunks {
                let audio = self.synthesize_chunk(chunk).await?;
                output.write_segment(chunk.chunk_id, &audio).await?;
                progress.inc(1);
            }

            if format.supports_id3() {
                let tags = AudioTagSet {
                    title: chapter.title.clone(),
                    author: book_author.clone(),
                    book_title: book_title.clone(),
                    idx: chapter.index,
                };
                for file in output.files() {
                    set_audio_tags(file, &tags)?;
                }
            }

            log::info!(
                "Chapter {} ({}) done: {} chunks",
                chapter.index,
                chapter.title,
                chunks.len()
            );
            summary.chapters += 1;
            summary.chunks += chunks.len();
            summary.audio_files.extend(output.files().iter().cloned());
        }

        progress.finish_with_message("done");
        Ok(summary)
    }

    /// Synthesize one chunk, attaching its chapter and chunk index to failures.
    async fn synthesize_chunk(&self, chunk: &TextChunk) -> Result<SynthesizedAudio> {
        self.provider
            .synthesize(&chunk.text, &self.options.voice)
            .await
            .map_err(|source| {
                log::error!(
                    "Synthesis failed for chapter {}, chunk {}: {}",
                    chunk.chapter_id,
                    chunk.chunk_id,
                    source
                );
                NarratorError::Synthesis {
                    chapter: chunk.chapter_id,
                    chunk: chunk.chunk_id,
                    source,
                }
            })
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }

    pub fn output_folder(&self) -> &Path {
        &self.options.output_folder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{ContentItem, ParserConfig, SearchReplaceRule};
    use id3::TagLike;
    use tts_client::{AudioFormat, MockProvider};

    struct FakeBook {
        chapters: Vec<(&'static str, Vec<&'static str>)>,
    }

    impl BookParser for FakeBook {
        fn validate_config(_config: &ParserConfig) -> Result<()> {
            Ok(())
        }

        fn book_title(&self) -> String {
            "Fake Book".to_string()
        }

        fn book_author(&self) -> String {
            "Fake Author".to_string()
        }

        fn chapters(&self, break_marker: &str) -> Vec<Chapter> {
            self.chapters
                .iter()
                .enumerate()
                .map(|(i, (title, paragraphs))| Chapter {
                    index: i + 1,
                    title: title.to_string(),
                    items: paragraphs.iter().map(|p| ContentItem::body(*p)).collect(),
                    break_marker: break_marker.to_string(),
                })
                .collect()
        }

        fn search_and_replaces(&self) -> &[SearchReplaceRule] {
            &[]
        }
    }

    fn book() -> Box<dyn BookParser> {
        Box::new(FakeBook {
            chapters: vec![
                ("One", vec!["Alpha beta gamma.", "Delta epsilon."]),
                ("Two", vec!["Zeta eta theta."]),
                ("Three", vec!["Iota kappa."]),
            ],
        })
    }

    fn options(dir: &Path) -> NarratorOptions {
        NarratorOptions {
            output_folder: dir.to_path_buf(),
            chunk_limit: 20,
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_chapter_range() {
        assert_eq!(resolve_chapter_range(1, -1, 5).unwrap(), 0..5);
        assert_eq!(resolve_chapter_range(2, 3, 5).unwrap(), 1..3);
        assert_eq!(resolve_chapter_range(5, -1, 5).unwrap(), 4..5);
        assert_eq!(resolve_chapter_range(2, 99, 5).unwrap(), 1..5);
        assert_eq!(resolve_chapter_range(1, -1, 0).unwrap(), 0..0);
    }

    #[test]
    fn test_resolve_chapter_range_rejects_bad_bounds() {
        assert!(resolve_chapter_range(0, -1, 5).is_err());
        assert!(resolve_chapter_range(4, 2, 5).is_err());
        assert!(resolve_chapter_range(6, -1, 5).is_err());
        assert!(resolve_chapter_range(1, -5, 5).is_err());
    }

    #[test]
    fn test_unknown_provider_is_unsupported() {
        let result = create_tts_provider("unsupported_tts", &ProviderConfig::default());
        match result {
            Err(NarratorError::UnsupportedProvider { name, available }) => {
                assert_eq!(name, "unsupported_tts");
                assert!(available.contains("azure"));
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[tokio::test]
    async fn test_run_writes_tagged_chapter_files() {
        let dir = tempfile::tempdir().unwrap();
        let generator = AudiobookGenerator::new(
            book(),
            Arc::new(MockProvider::always_succeeds()),
            options(dir.path()),
        );

        let summary = generator.run().await.unwrap();
        assert_eq!(summary.chapters, 3);
        assert_eq!(summary.audio_files.len(), 3);
        assert_eq!(summary.audio_files[0], dir.path().join("0001_One.mp3"));

        let tag = id3::Tag::read_from_path(dir.path().join("0002_Two.mp3")).unwrap();
        assert_eq!(tag.title(), Some("Two"));
        assert_eq!(tag.artist(), Some("Fake Author"));
        assert_eq!(tag.album(), Some("Fake Book"));

        let bytes = std::fs::read(dir.path().join("0002_Two.mp3")).unwrap();
        assert!(bytes.ends_with(b"Zeta eta theta."));
    }

    #[tokio::test]
    async fn test_chunks_respect_limit_and_break_marker() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::always_succeeds().with_break_marker(" <BR> "));
        let generator = AudiobookGenerator::new(
            book(),
            provider.clone(),
            NarratorOptions {
                chunk_limit: 200,
                ..options(dir.path())
            },
        );

        generator.run().await.unwrap();
        let received = provider.received();
        assert_eq!(received.len(), 3);
        assert_eq!(received[0], "Alpha beta gamma. <BR> Delta epsilon.");
    }

    #[tokio::test]
    async fn test_synthesis_failure_carries_position() {
        let dir = tempfile::tempdir().unwrap();
        let generator = AudiobookGenerator::new(
            book(),
            Arc::new(MockProvider::always_fails("quota exceeded")),
            options(dir.path()),
        );

        match generator.run().await {
            Err(NarratorError::Synthesis {
                chapter,
                chunk,
                source: TtsError::Synthesis { message, .. },
            }) => {
                assert_eq!(chapter, 1);
                assert_eq!(chunk, 0);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_voice_fails_before_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let provider =
            Arc::new(MockProvider::always_succeeds().with_voice_error("no voice model"));
        let generator = AudiobookGenerator::new(book(), provider.clone(), options(&out));

        assert!(matches!(
            generator.run().await,
            Err(NarratorError::Tts(TtsError::Configuration(_)))
        ));
        assert_eq!(provider.call_count(), 0);
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_no_retries() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::fails_then_succeeds(1, "busy"));
        let generator = AudiobookGenerator::new(
            book(),
            provider.clone(),
            options(dir.path()),
        );

        assert!(generator.run().await.is_err());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_chapter_range_selects_files() {
        let dir = tempfile::tempdir().unwrap();
        let generator = AudiobookGenerator::new(
            book(),
            Arc::new(MockProvider::always_succeeds()),
            NarratorOptions {
                chapter_start: 2,
                chapter_end: 2,
                ..options(dir.path())
            },
        );

        let summary = generator.run().await.unwrap();
        assert_eq!(summary.audio_files, vec![dir.path().join("0002_Two.mp3")]);
        assert!(!dir.path().join("0001_One.mp3").exists());
    }

    #[tokio::test]
    async fn test_non_id3_format_writes_segments_untagged() {
        let dir = tempfile::tempdir().unwrap();
        let generator = AudiobookGenerator::new(
            book(),
            Arc::new(MockProvider::always_succeeds().with_format(AudioFormat::Wav)),
            NarratorOptions {
                chapter_end: 1,
                ..options(dir.path())
            },
        );

        let summary = generator.run().await.unwrap();
        // "Alpha beta gamma." and "Delta epsilon." do not fit 20 chars together
        assert!(summary.audio_files.len() >= 2);
        let first = dir.path().join("0001_One_0000.wav");
        assert_eq!(std::fs::read(&first).unwrap(), b"Alpha beta gamma.");
        assert!(id3::Tag::read_from_path(&first).is_err());
    }

    #[tokio::test]
    async fn test_output_text() {
        let dir = tempfile::tempdir().unwrap();
        let generator = AudiobookGenerator::new(
            book(),
            Arc::new(MockProvider::always_succeeds()),
            NarratorOptions {
                output_text: true,
                ..options(dir.path())
            },
        );

        let summary = generator.run().await.unwrap();
        assert_eq!(summary.text_files.len(), 3);
        let text = std::fs::read_to_string(dir.path().join("0001_One.txt")).unwrap();
        assert_eq!(text, "Alpha beta gamma.\n\nDelta epsilon.");
    }

    #[tokio::test]
    async fn test_preview_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let provider = Arc::new(MockProvider::always_succeeds());
        let generator = AudiobookGenerator::new(
            book(),
            provider.clone(),
            options(&out),
        );

        let summaries = generator.preview().unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[1].title, "Two");
        assert_eq!(summaries[1].char_count, "Zeta eta theta.".chars().count());
        assert_eq!(provider.call_count(), 0);
        assert!(!out.exists());
    }
}
