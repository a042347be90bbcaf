//! In-memory vector index with brute-force inner-product search.
//!
//! Vectors are stored row-major in one flat buffer next to the chunk text
//! each row belongs to. Position `i` in both collections always refers to
//! the same chunk, and [`VectorIndex::add`] appends to both or to neither.
//!
//! Callers should normalize vectors before adding and searching so the
//! inner product equals cosine similarity.

mod storage;

#[cfg(test)]
mod tests;

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::path::Path;
use tracing::{debug, info};

use crate::embeddings::normalize::dot;
use crate::{QaError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    dimension: Option<usize>,
    vectors: Vec<f32>,
    chunks: Vec<String>,
}

/// One ranked chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Position of the chunk in the index
    pub index: usize,
    pub text: String,
    pub score: f32,
}

/// Heap entry ordered so that the worst-ranked candidate is the greatest.
#[derive(Debug)]
struct Ranked {
    score: f32,
    index: usize,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        // lower score is worse; on equal scores the higher index is worse
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.index.cmp(&other.index))
    }
}

/// Key used for ranking: `-0.0` folds into `0.0` so the two tie, and a NaN
/// from overflowing components ranks last.
fn rank_score(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score + 0.0
    }
}

impl VectorIndex {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Vector dimension, fixed by the first non-empty `add`.
    #[inline]
    #[must_use]
    pub const fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    #[inline]
    #[must_use]
    pub fn chunk_text(&self, index: usize) -> Option<&str> {
        self.chunks.get(index).map(String::as_str)
    }

    /// Append vectors and their chunk texts.
    ///
    /// Nothing is modified unless every vector has the index dimension (or,
    /// on an empty index, all vectors agree on one), every component is
    /// finite, and both collections have the same length.
    #[inline]
    pub fn add(&mut self, vectors: Vec<Vec<f32>>, chunk_texts: Vec<String>) -> Result<()> {
        if vectors.len() != chunk_texts.len() {
            return Err(QaError::InvalidArgument(format!(
                "{} vectors given for {} chunk texts",
                vectors.len(),
                chunk_texts.len()
            )));
        }

        let Some(first) = vectors.first() else {
            return Ok(());
        };

        let dimension = self.dimension.unwrap_or(first.len());
        if dimension == 0 {
            return Err(QaError::InvalidArgument(
                "vectors must have at least one dimension".to_string(),
            ));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(QaError::Dimension {
                expected: dimension,
                actual: bad.len(),
            });
        }
        if vectors.iter().flatten().any(|x| !x.is_finite()) {
            return Err(QaError::InvalidArgument(
                "vectors must not contain NaN or infinite components".to_string(),
            ));
        }

        let added = vectors.len();
        self.vectors.reserve(added * dimension);
        self.vectors.extend(vectors.into_iter().flatten());
        self.chunks.extend(chunk_texts);
        self.dimension = Some(dimension);

        debug!(
            "Added {} vectors ({} dimensions), index now holds {}",
            added,
            dimension,
            self.len()
        );
        Ok(())
    }

    /// Top `k` chunks by inner product with `query`, best first.
    ///
    /// Equal scores rank the lower stored position first.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let Some(dimension) = self.dimension.filter(|_| !self.is_empty()) else {
            return Err(QaError::EmptyIndex);
        };
        if k == 0 {
            return Err(QaError::InvalidArgument("k must be at least 1".to_string()));
        }
        if query.len() != dimension {
            return Err(QaError::Dimension {
                expected: dimension,
                actual: query.len(),
            });
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(QaError::InvalidArgument(
                "query must not contain NaN or infinite components".to_string(),
            ));
        }

        let keep = k.min(self.len());
        let mut heap: BinaryHeap<Ranked> = BinaryHeap::with_capacity(keep + 1);

        for (index, row) in self.vectors.chunks_exact(dimension).enumerate() {
            let candidate = Ranked {
                score: rank_score(dot(query, row)),
                index,
            };
            if heap.len() < keep {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }

        let results: Vec<SearchResult> = heap
            .into_sorted_vec()
            .into_iter()
            .map(|ranked| SearchResult {
                index: ranked.index,
                text: self.chunks[ranked.index].clone(),
                score: ranked.score,
            })
            .collect();

        debug!(
            "Search over {} chunks returned {} results",
            self.len(),
            results.len()
        );
        Ok(results)
    }

    /// Write `<location>.vectors` and `<location>.chunks`, replacing any
    /// previous save at the same location.
    #[inline]
    pub fn save(&self, location: &Path) -> Result<()> {
        storage::write(
            location,
            self.dimension.unwrap_or(0),
            &self.vectors,
            &self.chunks,
        )?;
        info!(
            "Saved index with {} chunks to {}",
            self.len(),
            location.display()
        );
        Ok(())
    }

    /// Read an index written by [`VectorIndex::save`].
    #[inline]
    pub fn load(location: &Path) -> Result<Self> {
        let stored = storage::read(location)?;
        let index = Self {
            dimension: (stored.dimension > 0).then_some(stored.dimension),
            vectors: stored.vectors,
            chunks: stored.chunks,
        };
        info!(
            "Loaded index with {} chunks from {}",
            index.len(),
            location.display()
        );
        Ok(index)
    }
}
