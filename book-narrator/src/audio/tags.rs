//! ID3 tagging of chapter audio files.

use id3::{ErrorKind, Tag, TagLike, Version};
use std::path::Path;

use crate::error::{NarratorError, Result};

/// Tags written to one chapter file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTagSet {
    /// Chapter title (TIT2)
    pub title: String,
    /// Book author (TPE1)
    pub author: String,
    /// Book title (TALB)
    pub book_title: String,
    /// Track number (TRCK)
    pub idx: usize,
}

/// Set title, artist, album and track on `output_file`, keeping other frames.
///
/// A file without an ID3 tag gets a fresh one. Every other failure is logged
/// and returned with the file path attached.
pub fn set_audio_tags(output_file: &Path, tags: &AudioTagSet) -> Result<()> {
    write_tags(output_file, tags).map_err(|source| {
        log::error!(
            "Error while setting audio tags: {}, {}",
            source,
            output_file.display()
        );
        NarratorError::Tagging {
            path: output_file.to_path_buf(),
            source,
        }
    })
}

fn write_tags(output_file: &Path, tags: &AudioTagSet) -> id3::Result<()> {
    let mut tag = match Tag::read_from_path(output_file) {
        Ok(tag) => tag,
        Err(e) if matches!(e.kind, ErrorKind::NoTag) => {
            log::debug!("No ID3 tag in {}, creating one", output_file.display());
            Tag::new()
        }
        Err(e) => return Err(e),
    };

    tag.set_title(tags.title.as_str());
    tag.set_artist(tags.author.as_str());
    tag.set_album(tags.book_title.as_str());
    tag.set_text("TRCK", tags.idx.to_string());

    tag.write_to_path(output_file, Version::Id3v24)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_set(title: &str, idx: usize) -> AudioTagSet {
        AudioTagSet {
            title: title.to_string(),
            author: "Jane Writer".to_string(),
            book_title: "A Book".to_string(),
            idx,
        }
    }

    #[test]
    fn test_creates_tag_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0001_Chapter_1.mp3");
        std::fs::write(&path, b"not really audio").unwrap();

        set_audio_tags(&path, &tag_set("Chapter_1", 1)).unwrap();

        let tag = Tag::read_from_path(&path).unwrap();
        assert_eq!(tag.title(), Some("Chapter_1"));
        assert_eq!(tag.artist(), Some("Jane Writer"));
        assert_eq!(tag.album(), Some("A Book"));
        assert_eq!(tag.get("TRCK").and_then(|f| f.content().text()), Some("1"));
    }

    #[test]
    fn test_overwrites_and_preserves_other_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chapter.mp3");
        std::fs::write(&path, b"audio").unwrap();

        let mut existing = Tag::new();
        existing.set_title("Old title");
        existing.set_genre("Audiobook");
        existing.write_to_path(&path, Version::Id3v24).unwrap();

        set_audio_tags(&path, &tag_set("New_title", 3)).unwrap();
        set_audio_tags(&path, &tag_set("Newer_title", 4)).unwrap();

        let tag = Tag::read_from_path(&path).unwrap();
        assert_eq!(tag.title(), Some("Newer_title"));
        assert_eq!(tag.genre(), Some("Audiobook"));
        assert_eq!(tag.get("TRCK").and_then(|f| f.content().text()), Some("4"));
    }

    #[test]
    fn test_failure_reports_path() {
        let path = Path::new("/nonexistent/dir/0001_x.mp3");
        let err = set_audio_tags(path, &tag_set("x", 1)).unwrap_err();
        match &err {
            NarratorError::Tagging { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("/nonexistent/dir/0001_x.mp3"));
    }
}
