pub mod groq_client;

pub use groq_client::{GroqChatClient, DEFAULT_GROQ_MODEL, GROQ_API_BASE};
