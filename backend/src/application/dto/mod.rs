pub mod drug_safety;
pub mod lookup;
pub mod report;

pub use drug_safety::DrugSafetyReport;
pub use lookup::GuidelineHit;
pub use report::{DiagnosticReport, PipelineStage, StageOutput, SECTION_SEPARATOR};
