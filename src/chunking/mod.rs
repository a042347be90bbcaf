#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigError;

/// A contiguous window of words taken from one page of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The window's words joined by single spaces
    pub text: String,
    /// Word index within the page where the window starts
    pub source_offset: usize,
    /// Position of this chunk in the concatenated output
    pub chunk_index: usize,
    /// Page the window was taken from
    pub page: usize,
}

/// Window size and overlap, both counted in whitespace-separated words
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 200,
            overlap: 40,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ConfigError> {
        let config = Self {
            chunk_size,
            overlap,
        };
        config.validate()?;
        Ok(config)
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }

        // A stride of zero would never advance the window.
        if self.overlap >= self.chunk_size {
            return Err(ConfigError::InvalidOverlap {
                overlap: self.overlap,
                chunk_size: self.chunk_size,
            });
        }

        Ok(())
    }

    /// Distance in words between consecutive window starts
    #[inline]
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Number of windows produced for `word_count` words.
///
/// Windows start at `0, stride, 2 * stride, ...` while the start is below
/// `word_count`, which is `ceil(word_count / stride)`.
#[inline]
pub fn window_count(word_count: usize, config: &ChunkingConfig) -> usize {
    word_count.div_ceil(config.stride())
}

/// Split one text into overlapping word windows
///
/// `chunk("a b c d e f", 4, 2)` yields `"a b c d"`, `"c d e f"` and `"e f"`.
#[inline]
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>, ConfigError> {
    let config = ChunkingConfig::new(chunk_size, overlap)?;
    let mut chunks = Vec::new();
    push_windows(&mut chunks, text, 0, &config);
    Ok(chunks)
}

/// Chunk every page independently and concatenate the results in page order
///
/// Windows never span two pages; `chunk_index` runs contiguously across the
/// whole output.
#[inline]
pub fn chunk_pages<I, P>(pages: I, config: &ChunkingConfig) -> Result<Vec<Chunk>, ConfigError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<str>,
{
    config.validate()?;

    let mut chunks = Vec::new();
    let mut page_count = 0;
    for (page, text) in pages.into_iter().enumerate() {
        push_windows(&mut chunks, text.as_ref(), page, config);
        page_count += 1;
    }

    debug!(
        "Chunked {} pages into {} chunks (chunk_size {}, overlap {})",
        page_count,
        chunks.len(),
        config.chunk_size,
        config.overlap
    );

    Ok(chunks)
}

fn push_windows(chunks: &mut Vec<Chunk>, text: &str, page: usize, config: &ChunkingConfig) {
    let words = text.split_whitespace().collect::<Vec<_>>();
    let stride = config.stride();

    let mut start = 0;
    while start < words.len() {
        let end = (start + config.chunk_size).min(words.len());
        chunks.push(Chunk {
            text: words[start..end].join(" "),
            source_offset: start,
            chunk_index: chunks.len(),
            page,
        });
        start += stride;
    }
}
