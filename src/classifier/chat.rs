use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CommitClassifier, SYSTEM_PROMPT};
use crate::config::ClassifierConfig;
use crate::error::ClassificationError;

/// Classifier backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionClassifier {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AnswerMessage,
}

#[derive(Debug, Deserialize)]
struct AnswerMessage {
    content: Option<String>,
}

impl ChatCompletionClassifier {
    pub fn new(config: &ClassifierConfig, api_key: String) -> Result<Self, ClassificationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn request<'a>(&'a self, message: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: message,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl CommitClassifier for ChatCompletionClassifier {
    async fn classify(&self, message: &str) -> Result<String, ClassificationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("User-Agent", concat!("migration-miner/", env!("CARGO_PKG_VERSION")))
            .bearer_auth(&self.api_key)
            .json(&self.request(message))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassificationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: ChatResponse = response.json().await?;
        answer_of(data)
    }
}

fn answer_of(data: ChatResponse) -> Result<String, ClassificationError> {
    data.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(ClassificationError::MissingAnswer)
}
