
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::http::HttpTransport;
use super::{ChatMessage, CompletionService, EmbeddingService};
use crate::config::ServiceConfig;
use crate::{QaError, Result};

#[derive(Debug, Clone)]
pub struct OllamaClient {
    transport: HttpTransport,
    embedding_model: String,
    chat_model: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbedReply {
    Embeddings { embeddings: Vec<Vec<f32>> },
    Error { error: String },
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatReply {
    Message { message: ChatMessage },
    Error { error: String },
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagsReply {
    Models { models: Vec<ModelInfo> },
    Error { error: String },
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let base_url = config.base_url()?;

        Ok(Self {
            transport: HttpTransport::new(base_url, Duration::from_secs(config.timeout_secs)),
            embedding_model: config.embedding_model.clone(),
            chat_model: config.chat_model.clone(),
        })
    }

    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.with_timeout(timeout);
        self
    }

    /// Check that the server answers and has both configured models pulled
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.transport.base_url());

        let models = self.list_models()?;
        for wanted in [&self.embedding_model, &self.chat_model] {
            if !models.iter().any(|m| &m.name == wanted) {
                let available: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
                warn!(
                    "Model {} not found. Available models: {:?}",
                    wanted, available
                );
                return Err(QaError::Service(format!(
                    "Model '{}' is not available. Available models: {:?}",
                    wanted, available
                )));
            }
        }

        info!(
            "Health check passed for Ollama at {} with models {} and {}",
            self.transport.base_url(),
            self.embedding_model,
            self.chat_model
        );
        Ok(())
    }

    /// List all models the server has pulled
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let reply = self.transport.get("/api/tags")?;

        match reply.decode::<TagsReply>("model list")? {
            TagsReply::Models { models } if reply.is_success() => {
                debug!("Found {} models", models.len());
                Ok(models)
            }
            TagsReply::Error { error } => Err(ollama_error(reply.status, &error)),
            TagsReply::Models { .. } => Err(ollama_error(reply.status, "unexpected status")),
        }
    }
}

impl EmbeddingService for OllamaClient {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let request = EmbedRequest {
            model: &self.embedding_model,
            input: texts,
        };
        let reply = self.transport.post_json("/api/embed", &request)?;

        match reply.decode::<EmbedReply>("embedding")? {
            EmbedReply::Embeddings { embeddings } if reply.is_success() => {
                debug!(
                    "Received {} embeddings with {} dimensions",
                    embeddings.len(),
                    embeddings.first().map_or(0, Vec::len)
                );
                Ok(embeddings)
            }
            EmbedReply::Error { error } => Err(ollama_error(reply.status, &error)),
            EmbedReply::Embeddings { .. } => Err(ollama_error(reply.status, "unexpected status")),
        }
    }
}

impl CompletionService for OllamaClient {
    #[inline]
    fn complete(&self, prompt: &str) -> Result<String> {
        debug!("Requesting completion ({} prompt chars)", prompt.len());

        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![ChatMessage::user(prompt)],
            stream: false,
        };
        let reply = self.transport.post_json("/api/chat", &request)?;

        match reply.decode::<ChatReply>("chat")? {
            ChatReply::Message { message } if reply.is_success() => message
                .into_reply_text()
                .ok_or_else(|| QaError::Service("Ollama reply has no assistant text".to_string())),
            ChatReply::Error { error } => Err(ollama_error(reply.status, &error)),
            ChatReply::Message { .. } => Err(ollama_error(reply.status, "unexpected status")),
        }
    }
}

fn ollama_error(status: u16, message: &str) -> QaError {
    QaError::Service(format!("Ollama returned HTTP {}: {}", status, message))
}
