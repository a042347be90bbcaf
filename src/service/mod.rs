//! Remote model capabilities.
//!
//! The pipeline depends on two capabilities only: turning texts into vectors
//! ([`EmbeddingService`]) and turning a prompt into text ([`CompletionService`]).
//! Each component receives its handle at construction, so there is no
//! process-wide client.
//!
//! Two HTTP backends are provided, selected by [`Provider`]:
//! - [`OllamaClient`] for a local Ollama server (`/api/embed`, `/api/chat`)
//! - [`OpenAiClient`] for OpenAI-compatible APIs (`/v1/embeddings`, `/v1/chat/completions`)

mod http;
pub mod ollama;
pub mod openai;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::config::{Provider, ServiceConfig};

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

/// Produces one embedding vector per input text, in input order.
pub trait EmbeddingService {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Produces a completion for a single prompt.
pub trait CompletionService {
    fn complete(&self, prompt: &str) -> Result<String>;
}

impl<T: EmbeddingService + ?Sized> EmbeddingService for &T {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed(texts)
    }
}

impl<T: CompletionService + ?Sized> CompletionService for &T {
    #[inline]
    fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt)
    }
}

/// One chat message, tagged by role on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default)]
        content: Option<String>,
    },
}

impl ChatMessage {
    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Text of an assistant reply, or `None` for any other message.
    #[inline]
    pub fn into_reply_text(self) -> Option<String> {
        match self {
            Self::Assistant { content } => content,
            Self::System { .. } | Self::User { .. } => None,
        }
    }
}

/// The configured backend, usable wherever either capability is needed.
#[derive(Debug, Clone)]
pub enum ModelClient {
    Ollama(OllamaClient),
    OpenAi(OpenAiClient),
}

impl EmbeddingService for ModelClient {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self {
            Self::Ollama(client) => client.embed(texts),
            Self::OpenAi(client) => client.embed(texts),
        }
    }
}

impl CompletionService for ModelClient {
    #[inline]
    fn complete(&self, prompt: &str) -> Result<String> {
        match self {
            Self::Ollama(client) => client.complete(prompt),
            Self::OpenAi(client) => client.complete(prompt),
        }
    }
}

/// Build the backend named by `config.provider`.
#[inline]
pub fn create_client(config: &ServiceConfig) -> Result<ModelClient> {
    config.validate()?;
    match config.provider {
        Provider::Ollama => Ok(ModelClient::Ollama(OllamaClient::new(config)?)),
        Provider::OpenAi => Ok(ModelClient::OpenAi(OpenAiClient::new(config)?)),
    }
}
