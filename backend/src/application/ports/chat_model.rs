use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One piece of a multimodal message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    /// A `data:` URL or remote image location
    ImageUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: Vec<ContentPart>,
}

impl ChatMessage {
    /// A plain-text user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: vec![ContentPart::Text(text.into())],
        }
    }

    pub fn user_parts(content: Vec<ContentPart>) -> Self {
        Self {
            role: ChatRole::User,
            content,
        }
    }

    /// Concatenated text parts, ignoring images
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::ImageUrl(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn image_count(&self) -> usize {
        self.content
            .iter()
            .filter(|part| matches!(part, ContentPart::ImageUrl(_)))
            .count()
    }
}

/// A hosted chat-completion model
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the assistant's reply text
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String>;
}
