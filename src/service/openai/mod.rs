
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::http::HttpTransport;
use super::{ChatMessage, CompletionService, EmbeddingService};
use crate::config::{ConfigError, ServiceConfig};
use crate::{QaError, Result};

/// Client for OpenAI-compatible `/v1/embeddings` and `/v1/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    transport: HttpTransport,
    embedding_model: String,
    chat_model: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbeddingsReply {
    Data { data: Vec<EmbeddingDatum> },
    Error { error: ApiError },
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatCompletionReply {
    Choices { choices: Vec<Choice> },
    Error { error: ApiError },
}

impl OpenAiClient {
    /// Build a client, reading the API key from the variable named by
    /// `config.api_key_env`.
    #[inline]
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey(config.api_key_env.clone()))?;
        Self::with_api_key(config, api_key)
    }

    #[inline]
    pub fn with_api_key(config: &ServiceConfig, api_key: impl Into<String>) -> Result<Self> {
        let base_url = config.base_url()?;

        Ok(Self {
            transport: HttpTransport::new(base_url, Duration::from_secs(config.timeout_secs))
                .with_bearer_token(api_key.into()),
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
}

impl EmbeddingService for OpenAiClient {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let request = EmbeddingsRequest {
            model: &self.embedding_model,
            input: texts,
        };
        let reply = self.transport.post_json("/v1/embeddings", &request)?;

        match reply.decode::<EmbeddingsReply>("embedding")? {
            EmbeddingsReply::Data { data } if reply.is_success() => order_by_index(data),
            EmbeddingsReply::Error { error } => Err(api_error(reply.status, &error)),
            EmbeddingsReply::Data { .. } => Err(QaError::Service(format!(
                "OpenAI returned HTTP {} with an embedding body",
                reply.status
            ))),
        }
    }
}

impl CompletionService for OpenAiClient {
    #[inline]
    fn complete(&self, prompt: &str) -> Result<String> {
        debug!("Requesting completion ({} prompt chars)", prompt.len());

        let request = ChatCompletionRequest {
            model: &self.chat_model,
            messages: vec![ChatMessage::user(prompt)],
        };
        let reply = self
            .transport
            .post_json("/v1/chat/completions", &request)?;

        match reply.decode::<ChatCompletionReply>("chat completion")? {
            ChatCompletionReply::Choices { choices } if reply.is_success() => {
                let choice = choices.into_iter().next().ok_or_else(|| {
                    QaError::Service("OpenAI reply has no choices".to_string())
                })?;
                match choice.finish_reason.as_deref() {
                    Some("stop") | None => {}
                    Some(reason) => warn!("Completion finished with reason {}", reason),
                }
                choice.message.into_reply_text().ok_or_else(|| {
                    QaError::Service("OpenAI reply has no assistant text".to_string())
                })
            }
            ChatCompletionReply::Error { error } => Err(api_error(reply.status, &error)),
            ChatCompletionReply::Choices { .. } => Err(QaError::Service(format!(
                "OpenAI returned HTTP {} with a completion body",
                reply.status
            ))),
        }
    }
}

/// Place each embedding at the position given by its `index` field.
fn order_by_index(data: Vec<EmbeddingDatum>) -> Result<Vec<Vec<f32>>> {
    let count = data.len();
    let mut ordered: Vec<Option<Vec<f32>>> = vec![None; count];

    for datum in data {
        let slot = ordered.get_mut(datum.index).ok_or_else(|| {
            QaError::Service(format!(
                "Embedding index {} out of range for {} results",
                datum.index, count
            ))
        })?;
        if slot.replace(datum.embedding).is_some() {
            return Err(QaError::Service(format!(
                "Duplicate embedding index {}",
                datum.index
            )));
        }
    }

    debug!("Received {} embeddings", count);
    // every slot is filled: indices are in range and distinct
    Ok(ordered.into_iter().flatten().collect())
}

fn api_error(status: u16, error: &ApiError) -> QaError {
    match &error.kind {
        Some(kind) => QaError::Service(format!(
            "OpenAI returned HTTP {} ({}): {}",
            status, kind, error.message
        )),
        None => QaError::Service(format!("OpenAI returned HTTP {}: {}", status, error.message)),
    }
}
