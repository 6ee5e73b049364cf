pub mod chat_model;
pub mod drug_label_source;
pub mod embedder;

pub use chat_model::{ChatMessage, ChatModel, ChatRole, ContentPart};
pub use drug_label_source::DrugLabelSource;
pub use embedder::Embedder;
