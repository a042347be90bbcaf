// Embeddings module
// Batched calls to the embedding capability, plus vector normalization

pub mod normalize;


use tracing::debug;

use crate::service::EmbeddingService;
use crate::{QaError, Result};

/// Turns texts into vectors through an [`EmbeddingService`].
///
/// Every response is checked before it is returned: one vector per input
/// text, all of the same non-zero length.
#[derive(Debug, Clone)]
pub struct Embedder<S> {
    service: S,
}

impl<S: EmbeddingService> Embedder<S> {
    #[inline]
    pub const fn new(service: S) -> Self {
        Self { service }
    }

    #[inline]
    pub const fn service(&self) -> &S {
        &self.service
    }

    /// Embed `texts` in a single remote call.
    ///
    /// An empty input returns an empty output without calling the service.
    #[inline]
    pub fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.service.embed(texts)?;

        if vectors.len() != texts.len() {
            return Err(QaError::Service(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                vectors.len()
            )));
        }

        let dimension = check_dimensions(&vectors)?;
        debug!(
            "Embedded {} texts with {} dimensions",
            vectors.len(),
            dimension
        );
        Ok(vectors)
    }

    /// Embed one text as a single-item batch.
    #[inline]
    pub fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_owned()])?;
        vectors
            .pop()
            .ok_or_else(|| QaError::Service("No embedding returned".to_string()))
    }

    /// Embed `texts` with one remote call per `batch_size` texts.
    ///
    /// All batches must agree on the vector dimension.
    #[inline]
    pub fn embed_batched(&self, texts: &[String], batch_size: usize) -> Result<Vec<Vec<f32>>> {
        if batch_size == 0 {
            return Err(QaError::InvalidArgument(
                "batch size must be at least 1".to_string(),
            ));
        }

        let mut results: Vec<Vec<f32>> = Vec::with_capacity(texts.len());

        for (batch_index, batch) in texts.chunks(batch_size).enumerate() {
            let vectors = self.embed(batch)?;

            if let (Some(expected), Some(actual)) = (results.first(), vectors.first()) {
                if expected.len() != actual.len() {
                    return Err(QaError::Dimension {
                        expected: expected.len(),
                        actual: actual.len(),
                    });
                }
            }

            debug!("Batch {} returned {} embeddings", batch_index, vectors.len());
            results.extend(vectors);
        }

        debug!("Generated {} embeddings total", results.len());
        Ok(results)
    }
}

/// Length shared by every vector in a response.
fn check_dimensions(vectors: &[Vec<f32>]) -> Result<usize> {
    let dimension = vectors.first().map_or(0, Vec::len);
    if dimension == 0 {
        return Err(QaError::Service(
            "Service returned an empty embedding".to_string(),
        ));
    }

    match vectors.iter().find(|v| v.len() != dimension) {
        Some(bad) => Err(QaError::Dimension {
            expected: dimension,
            actual: bad.len(),
        }),
        None => Ok(dimension),
    }
}
