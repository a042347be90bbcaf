
use serde::Serialize;
use tracing::{debug, info};

use crate::Result;
use crate::config::RetrievalConfig;
use crate::embeddings::Embedder;
use crate::index::{SearchResult, VectorIndex};
use crate::retrieval::retrieve;
use crate::service::{CompletionService, EmbeddingService};

/// Placed between context chunks in the prompt.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// A generated answer with the chunks it was conditioned on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SearchResult>,
}

/// Answers questions from retrieved context through a [`CompletionService`].
#[derive(Debug, Clone)]
pub struct AnswerGenerator<C> {
    service: C,
}

impl<C: CompletionService> AnswerGenerator<C> {
    #[inline]
    pub const fn new(service: C) -> Self {
        Self { service }
    }

    #[inline]
    pub const fn service(&self) -> &C {
        &self.service
    }

    /// Fill the prompt template with the joined context and the question.
    #[inline]
    #[must_use]
    pub fn build_prompt<T: AsRef<str>>(question: &str, context_chunks: &[T]) -> String {
        let context = context_chunks
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join(CONTEXT_SEPARATOR);

        format!(
            "Answer the question using only the context below. \
             If the context does not contain the answer, say that you do not know.\n\n\
             Context:\n{context}\n\n\
             Question: {question}\n\n\
             Answer:"
        )
    }

    /// Ask the completion service once and return its text unchanged.
    #[inline]
    pub fn generate<T: AsRef<str>>(&self, question: &str, context_chunks: &[T]) -> Result<String> {
        let prompt = Self::build_prompt(question, context_chunks);
        debug!(
            "Generating answer from {} context chunks ({} prompt chars)",
            context_chunks.len(),
            prompt.len()
        );
        self.service.complete(&prompt)
    }

    /// Retrieve the `k` best chunks for `question`, then answer from them.
    #[inline]
    pub fn ask<S: EmbeddingService>(
        &self,
        question: &str,
        index: &VectorIndex,
        embedder: &Embedder<S>,
        k: usize,
    ) -> Result<Answer> {
        let sources = retrieve(question, index, embedder, k)?;
        let chunks: Vec<&str> = sources.iter().map(|s| s.text.as_str()).collect();
        let text = self.generate(question, &chunks)?;

        info!("Answered question from {} sources", sources.len());
        Ok(Answer { text, sources })
    }

    /// [`AnswerGenerator::ask`] with `k` taken from the retrieval settings.
    #[inline]
    pub fn ask_with_config<S: EmbeddingService>(
        &self,
        question: &str,
        index: &VectorIndex,
        embedder: &Embedder<S>,
        config: &RetrievalConfig,
    ) -> Result<Answer> {
        config.validate()?;
        self.ask(question, index, embedder, config.top_k)
    }
}
