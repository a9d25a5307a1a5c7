//! Audio output: chapter files and ID3 tagging.

pub mod output;
pub mod tags;

pub use output::ChapterOutput;
pub use tags::{AudioTagSet, set_audio_tags};
