//! Question answering over a single document.
//!
//! Page text is split into overlapping word windows ([`chunking`]), embedded
//! through a remote model ([`embeddings`], [`service`]), normalized to unit
//! length and stored in a brute-force [`index::VectorIndex`]. Questions are
//! answered by retrieving the closest windows ([`retrieval`]) and passing them
//! as context to a chat model ([`answer`]).

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QaError>;

#[derive(Error, Debug)]
pub enum QaError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("Cannot normalize a vector with zero length")]
    DegenerateVector,

    #[error("Cannot search an empty index")]
    EmptyIndex,

    #[error("Corrupt index at {}: {reason}", .path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("No index found at {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod answer;
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod index;
pub mod indexer;
pub mod retrieval;
pub mod service;

pub use answer::{Answer, AnswerGenerator};
pub use chunking::{Chunk, ChunkingConfig, chunk_pages, chunk_text};
pub use embeddings::Embedder;
pub use embeddings::normalize::normalize;
pub use index::{SearchResult, VectorIndex};
pub use indexer::{IngestStats, Indexer};
pub use retrieval::retrieve;
pub use service::{CompletionService, EmbeddingService, ModelClient, create_client};
