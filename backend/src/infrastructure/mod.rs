pub mod documents;
pub mod embeddings;
pub mod llm;
pub mod openfda;
pub mod persistence;
