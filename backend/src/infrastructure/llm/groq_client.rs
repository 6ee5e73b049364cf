/// Groq chat-completions client (OpenAI-compatible API)
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::application::ports::{ChatMessage, ChatModel, ContentPart};

pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_GROQ_MODEL: &str = "meta-llama/llama-4-maverick-17b-128e-instruct";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct GroqChatRequest<'a> {
    model: &'a str,
    messages: Vec<GroqMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct GroqMessage {
    role: &'static str,
    content: GroqMessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum GroqMessageContent {
    Text(String),
    Multimodal(Vec<GroqContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum GroqContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: GroqImageUrl },
}

#[derive(Serialize)]
struct GroqImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct GroqChatResponse {
    choices: Vec<GroqChoice>,
}

#[derive(Deserialize)]
struct GroqChoice {
    message: GroqResponseMessage,
}

#[derive(Deserialize)]
struct GroqResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct GroqErrorResponse {
    error: GroqError,
}

#[derive(Deserialize)]
struct GroqError {
    message: String,
}

pub struct GroqChatClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl GroqChatClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        Self::with_settings(api_key, model, GROQ_API_BASE, DEFAULT_TIMEOUT)
    }

    pub fn with_settings(api_key: &str, model: &str, api_base: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn convert_message(message: &ChatMessage) -> GroqMessage {
        let content = match message.content.as_slice() {
            [ContentPart::Text(text)] => GroqMessageContent::Text(text.clone()),
            parts => GroqMessageContent::Multimodal(
                parts
                    .iter()
                    .map(|part| match part {
                        ContentPart::Text(text) => GroqContentPart::Text { text: text.clone() },
                        ContentPart::ImageUrl(url) => GroqContentPart::ImageUrl {
                            image_url: GroqImageUrl { url: url.clone() },
                        },
                    })
                    .collect(),
            ),
        };

        GroqMessage {
            role: message.role.as_str(),
            content,
        }
    }
}

#[async_trait]
impl ChatModel for GroqChatClient {
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);
        let request = GroqChatRequest {
            model: &self.model,
            messages: messages.iter().map(Self::convert_message).collect(),
            temperature,
        };

        debug!(
            "Sending {} messages to {} (temperature {})",
            request.messages.len(),
            self.model,
            temperature
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Groq request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if let Ok(error_response) = serde_json::from_str::<GroqErrorResponse>(&error_text) {
                anyhow::bail!("Groq API error ({}): {}", status, error_response.error.message);
            }
            anyhow::bail!("Groq API error ({}): {}", status, error_text);
        }

        let body: GroqChatResponse = response
            .json()
            .await
            .context("Failed to parse Groq response")?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .context("Groq returned no message content")
    }
}
