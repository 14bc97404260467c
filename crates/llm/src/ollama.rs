//! Streaming HTTP backend targeting an Ollama-compatible chat completion
//! API. Adapted from the teacher's `OllamaBackend` (`crates/llm/src/backend.rs`):
//! same request shape and retry-free single-shot send, but the streaming
//! path yields directly into a `BoxStream<Result<String>>` instead of a
//! bespoke `mpsc::Sender<String>` parameter, to satisfy `core::LanguageModel`.

use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use parlance_core::{Error, GenerateRequest, LanguageModel, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "qwen2.5:7b-instruct".to_string(),
            temperature: 0.7,
            max_tokens: 512,
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct OllamaLanguageModel {
    client: Client,
    config: OllamaConfig,
}

impl OllamaLanguageModel {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::LanguageModel(format!("failed to build http client: {e}")))?;
        Ok(Self { client, config })
    }

    fn api_url(&self) -> String {
        format!("{}/api/chat", self.config.endpoint)
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct ChatStreamLine {
    #[serde(default)]
    message: Option<ChatStreamMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize)]
struct ChatStreamMessage {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl LanguageModel for OllamaLanguageModel {
    async fn generate_stream(
        &self,
        request: GenerateRequest,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let body = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt_for(&request),
            }],
            stream: true,
            options: ChatOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.api_url())
            .json(&body)
            .send()
            .await
            .map_err(LlmError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("{status}: {text}")).into());
        }

        let mut byte_stream = response.bytes_stream();
        let stream = try_stream! {
            let mut buf = Vec::new();
            while let Some(chunk) = byte_stream.next().await {
                let chunk = chunk.map_err(LlmError::from)?;
                buf.extend_from_slice(&chunk);
                while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    let line = &line[..line.len().saturating_sub(1)];
                    if line.is_empty() {
                        continue;
                    }
                    let parsed: ChatStreamLine = serde_json::from_slice(line)
                        .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
                    if let Some(msg) = parsed.message {
                        if !msg.content.is_empty() {
                            yield msg.content;
                        }
                    }
                    if parsed.done {
                        return;
                    }
                }
            }
        };

        Ok(stream.boxed())
    }
}

fn prompt_for(request: &GenerateRequest) -> String {
    format!(
        "You are {}. Respond in character to: {}",
        request.character.name, request.user_message
    )
}
