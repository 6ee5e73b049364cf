use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Separator between report sections and between batch outputs
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// The six stages of a diagnostic run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    DocumentAnalysis,
    MedicalContext,
    ClinicalReasoning,
    GuidelineLookup,
    TreatmentPlan,
    PatientAdvisory,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 6] = [
        PipelineStage::DocumentAnalysis,
        PipelineStage::MedicalContext,
        PipelineStage::ClinicalReasoning,
        PipelineStage::GuidelineLookup,
        PipelineStage::TreatmentPlan,
        PipelineStage::PatientAdvisory,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::DocumentAnalysis => "Document Analysis",
            PipelineStage::MedicalContext => "ICD Mapping",
            PipelineStage::ClinicalReasoning => "Clinical Reasoning",
            PipelineStage::GuidelineLookup => "KB Lookup",
            PipelineStage::TreatmentPlan => "Treatment Planning",
            PipelineStage::PatientAdvisory => "Patient Advisory",
        }
    }

    /// Section heading in the rendered report
    pub fn heading(&self) -> &'static str {
        match self {
            PipelineStage::DocumentAnalysis => "📄 Document Analysis",
            PipelineStage::MedicalContext => "🏷️ Medical Context (ICD)",
            PipelineStage::ClinicalReasoning => "🧠 Clinical Reasoning",
            PipelineStage::GuidelineLookup => "🗂️ KB Guidelines",
            PipelineStage::TreatmentPlan => "🩺 Treatment Plan",
            PipelineStage::PatientAdvisory => "💡 Patient Advisory",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Text produced by one stage, or the failure line that replaced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageOutput {
    pub stage: PipelineStage,
    pub content: String,
    pub succeeded: bool,
}

impl StageOutput {
    pub fn succeeded(stage: PipelineStage, content: impl Into<String>) -> Self {
        Self {
            stage,
            content: content.into(),
            succeeded: true,
        }
    }

    pub fn failed(stage: PipelineStage, error: impl fmt::Display) -> Self {
        Self {
            stage,
            content: format!("❌ {} failed: {}", stage.name(), error),
            succeeded: false,
        }
    }
}

/// The combined result of one diagnostic run
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub files: Vec<String>,
    pub user_note: Option<String>,
    pub stages: Vec<StageOutput>,
}

impl DiagnosticReport {
    pub fn stage(&self, stage: PipelineStage) -> Option<&StageOutput> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    pub fn failed_stages(&self) -> Vec<PipelineStage> {
        self.stages
            .iter()
            .filter(|s| !s.succeeded)
            .map(|s| s.stage)
            .collect()
    }

    /// Markdown sections, one per stage
    pub fn render(&self) -> String {
        self.stages
            .iter()
            .map(|s| format!("### {}\n{}", s.stage.heading(), s.content))
            .collect::<Vec<_>>()
            .join(SECTION_SEPARATOR)
    }

    /// Plain-text export with header and disclaimer
    pub fn to_download_text(&self) -> String {
        format!(
            "Healthcare Diagnostic Analysis Report\nGenerated on: {}\n\n{}\n\n---\nDisclaimer: This report is for informational purposes only.\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S"),
            self.render()
        )
    }

    pub fn download_file_name(&self) -> String {
        format!(
            "healthcare_analysis_{}.txt",
            self.generated_at.format("%Y%m%d_%H%M%S")
        )
    }
}
