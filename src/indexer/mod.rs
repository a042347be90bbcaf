// Indexer module
// Drives ingestion: pages are chunked, embedded in batches, normalized and
// added to a vector index

#[cfg(test)]
mod tests;

use tracing::{debug, info};

use crate::chunking::{ChunkingConfig, chunk_pages};
use crate::config::Config;
use crate::embeddings::Embedder;
use crate::embeddings::normalize::normalize_all;
use crate::index::VectorIndex;
use crate::service::EmbeddingService;
use crate::{QaError, Result};

/// Turns document pages into index entries
#[derive(Debug, Clone)]
pub struct Indexer<S> {
    embedder: Embedder<S>,
    chunking: ChunkingConfig,
    batch_size: usize,
}

/// Statistics about one ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub pages: usize,
    pub chunks: usize,
    pub batches: usize,
}

impl<S: EmbeddingService> Indexer<S> {
    #[inline]
    pub fn new(embedder: Embedder<S>, chunking: ChunkingConfig, batch_size: usize) -> Result<Self> {
        chunking.validate()?;
        if batch_size == 0 {
            return Err(QaError::InvalidArgument(
                "batch size must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            embedder,
            chunking,
            batch_size,
        })
    }

    /// Create an indexer with the chunking and batch settings from `config`
    #[inline]
    pub fn from_config(embedder: Embedder<S>, config: &Config) -> Result<Self> {
        Self::new(
            embedder,
            config.chunking,
            config.service.batch_size as usize,
        )
    }

    #[inline]
    pub const fn embedder(&self) -> &Embedder<S> {
        &self.embedder
    }

    /// Chunk, embed and normalize every page, then add the results with a
    /// single `add` call.
    ///
    /// On error the index is left exactly as it was.
    #[inline]
    pub fn ingest<P: AsRef<str>>(&self, pages: &[P], index: &mut VectorIndex) -> Result<IngestStats> {
        info!("Ingesting {} pages", pages.len());

        let chunks = chunk_pages(pages, &self.chunking)?;
        let mut stats = IngestStats {
            pages: pages.len(),
            chunks: chunks.len(),
            batches: 0,
        };

        if chunks.is_empty() {
            info!("No text to index");
            return Ok(stats);
        }

        let texts: Vec<String> = chunks.into_iter().map(|c| c.text).collect();
        stats.batches = texts.len().div_ceil(self.batch_size);
        debug!(
            "Embedding {} chunks in {} batches of up to {}",
            texts.len(),
            stats.batches,
            self.batch_size
        );

        let mut vectors = self.embedder.embed_batched(&texts, self.batch_size)?;
        normalize_all(&mut vectors)?;
        index.add(vectors, texts)?;

        info!(
            "Indexed {} chunks from {} pages, index now holds {}",
            stats.chunks,
            stats.pages,
            index.len()
        );
        Ok(stats)
    }
}
