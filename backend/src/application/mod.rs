pub mod dto;
pub mod ports;
pub mod repositories;
pub mod services;
pub mod use_cases;

pub use dto::{DiagnosticReport, DrugSafetyReport, GuidelineHit, PipelineStage, StageOutput};
pub use ports::{ChatModel, DrugLabelSource, Embedder};
pub use repositories::SnapshotRepository;
pub use services::{
    DiagnosticPipeline, IndexBuilder, PipelineCallback, PipelineEvent, RetrievalConfig,
    RetrievalError, RetrievalService,
};
