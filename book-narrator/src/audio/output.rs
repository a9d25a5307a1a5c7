//! Output files for synthesized chapters.

use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tts_client::{AudioFormat, SynthesizedAudio};

use crate::error::Result;

/// `{index:04}_{title}.{extension}`
pub fn chapter_file_name(index: usize, title: &str, extension: &str) -> String {
    format!("{index:04}_{title}.{extension}")
}

/// `{index:04}_{title}_{chunk:04}.{extension}`, for formats that cannot be appended.
pub fn segment_file_name(index: usize, title: &str, chunk: usize, extension: &str) -> String {
    format!("{index:04}_{title}_{chunk:04}.{extension}")
}

/// Writes the audio segments of one chapter.
///
/// Appendable formats go into a single chapter file; other formats get one
/// file per segment.
#[derive(Debug)]
pub struct ChapterOutput {
    folder: PathBuf,
    index: usize,
    title: String,
    format: AudioFormat,
    files: Vec<PathBuf>,
}

impl ChapterOutput {
    pub fn new(folder: &Path, index: usize, title: &str, format: AudioFormat) -> Self {
        Self {
            folder: folder.to_path_buf(),
            index,
            title: title.to_string(),
            format,
            files: Vec::new(),
        }
    }

    /// Path of the single chapter file.
    pub fn chapter_path(&self) -> PathBuf {
        self.folder.join(chapter_file_name(
            self.index,
            &self.title,
            self.format.extension(),
        ))
    }

    /// Path of the chapter's text export.
    pub fn text_path(&self) -> PathBuf {
        self.folder
            .join(chapter_file_name(self.index, &self.title, "txt"))
    }

    /// Files written so far, in order and without duplicates.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Write one segment and return the file it went to.
    pub async fn write_segment(&mut self, chunk: usize, audio: &SynthesizedAudio) -> Result<PathBuf> {
        if self.format.is_appendable() {
            let path = self.chapter_path();
            let first = self.files.is_empty();
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .append(!first)
                .truncate(first)
                .open(&path)
                .await?;
            file.write_all(&audio.data).await?;
            file.flush().await?;
            if first {
                self.files.push(path.clone());
            }
            Ok(path)
        } else {
            let path = self.folder.join(segment_file_name(
                self.index,
                &self.title,
                chunk,
                self.format.extension(),
            ));
            tokio::fs::write(&path, &audio.data).await?;
            self.files.push(path.clone());
            Ok(path)
        }
    }

    /// Write the chapter text next to its audio.
    pub async fn write_text(&self, text: &str) -> Result<PathBuf> {
        let path = self.text_path();
        tokio::fs::write(&path, text).await?;
        Ok(path)
    }
}
