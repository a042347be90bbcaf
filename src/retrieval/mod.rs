
use tracing::debug;

use crate::Result;
use crate::embeddings::Embedder;
use crate::embeddings::normalize::normalize_in_place;
use crate::index::{SearchResult, VectorIndex};
use crate::service::EmbeddingService;

/// Find the `k` chunks closest to `query`, best first.
///
/// The query is embedded as a single-item batch and normalized before the
/// index is searched. Errors from the embedder, the normalizer and the
/// index are returned unchanged.
#[inline]
pub fn retrieve<S: EmbeddingService>(
    query: &str,
    index: &VectorIndex,
    embedder: &Embedder<S>,
    k: usize,
) -> Result<Vec<SearchResult>> {
    debug!("Retrieving top {} chunks for query ({} chars)", k, query.len());

    let mut vector = embedder.embed_one(query)?;
    normalize_in_place(&mut vector)?;
    index.search(&vector, k)
}
