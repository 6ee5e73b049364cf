/// Text preprocessing for guideline embeddings
use regex::Regex;
use std::sync::OnceLock;

use crate::domain::base::DomainResult;
use crate::domain::value_objects::{ChunkingConfig, Passage};

/// Cleans extracted document text and splits it into overlapping word windows
#[derive(Debug)]
pub struct TextPreprocessor {
    blank_lines_regex: Regex,
}

impl TextPreprocessor {
    pub fn new() -> Self {
        TextPreprocessor {
            // Two or more consecutive line breaks
            blank_lines_regex: Regex::new(r"(?:\r?\n){2,}").expect("blank line pattern is valid"),
        }
    }

    /// Get a singleton instance (for efficiency in batch processing)
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<TextPreprocessor> = OnceLock::new();
        INSTANCE.get_or_init(TextPreprocessor::new)
    }

    /// Collapse runs of blank lines into a single line break
    pub fn normalize(&self, text: &str) -> String {
        self.blank_lines_regex.replace_all(text, "\n").into_owned()
    }

    /// Validate raw chunking parameters, then chunk
    pub fn chunk(&self, text: &str, chunk_size: usize, overlap: usize) -> DomainResult<Vec<Passage>> {
        let config = ChunkingConfig::new(chunk_size, overlap)?;
        Ok(self.chunk_text(text, &config))
    }

    /// Split text into windows of `chunk_size` words whose starts are `stride` words apart.
    ///
    /// Windows keep being emitted until the start reaches the end of the token
    /// sequence, so the last window may be shorter than `chunk_size`.
    pub fn chunk_text(&self, text: &str, config: &ChunkingConfig) -> Vec<Passage> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < words.len() {
            let end = (start + config.chunk_size()).min(words.len());
            if let Ok(passage) = Passage::from_tokens(&words[start..end]) {
                chunks.push(passage);
            }
            start += config.stride();
        }

        chunks
    }
}

impl Default for TextPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}
