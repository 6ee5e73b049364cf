/// Embeddings infrastructure for guideline retrieval
mod fastembed_service;
mod text_preprocessor;

pub use fastembed_service::FastEmbedService;
pub use text_preprocessor::TextPreprocessor;
