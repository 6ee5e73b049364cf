pub mod index_builder;
pub mod pipeline_service;
pub mod retrieval_service;

pub use index_builder::IndexBuilder;
pub use pipeline_service::{
    DiagnosticPipeline, PipelineCallback, PipelineError, PipelineEvent, PipelineResult,
};
pub use retrieval_service::{RetrievalConfig, RetrievalError, RetrievalResult, RetrievalService};
