/// Six-stage diagnostic pipeline over uploaded medical documents
use chrono::Utc;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::retrieval_service::RetrievalService;
use crate::application::dto::{DiagnosticReport, PipelineStage, StageOutput, SECTION_SEPARATOR};
use crate::application::ports::{ChatMessage, ChatModel, ContentPart, DrugLabelSource};
use crate::application::use_cases::{
    guideline_context, render_safety_notes, CheckDrugSafety, NO_GUIDELINES_FOUND,
    SAFETY_NOTES_HEADER,
};
use crate::infrastructure::documents::{DocumentExtractor, ExtractedDocument, ExtractionError};

/// Multimodal requests carry at most this many images
pub const IMAGE_BATCH_SIZE: usize = 5;
pub const NO_CONTENT_MESSAGE: &str = "⚠️ No valid content found to analyze.";
const NO_KB_SNIPPETS: &str = "No KB snippets provided.";

const DOCUMENT_TEMPERATURE: f32 = 0.2;
const ICD_TEMPERATURE: f32 = 0.2;
const REASONING_TEMPERATURE: f32 = 0.2;
const GUIDELINE_TEMPERATURE: f32 = 0.3;
const TREATMENT_TEMPERATURE: f32 = 0.3;
const ADVISORY_TEMPERATURE: f32 = 0.4;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Model request failed: {0}")]
    Model(String),

    #[error("Document error: {0}")]
    Document(#[from] ExtractionError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    fn model(error: anyhow::Error) -> Self {
        PipelineError::Model(format!("{:#}", error))
    }
}

/// Callback type for pipeline progress events
pub type PipelineCallback = Arc<dyn Fn(PipelineEvent) + Send + Sync>;

#[derive(Debug, Clone)]
pub enum PipelineEvent {
    StageStarted { stage: PipelineStage },
    StageCompleted { stage: PipelineStage, duration_ms: u64 },
    StageFailed { stage: PipelineStage, error: String },
    Completed { run_id: Uuid, failed_stages: usize, duration_ms: u64 },
}

/// Runs document analysis, ICD mapping, reasoning, guideline lookup,
/// treatment planning and patient advisory in order.
///
/// Every stage gets exactly one attempt. A failed stage contributes a failure
/// line to the report and later stages still run on whatever text it left.
pub struct DiagnosticPipeline {
    chat: Arc<dyn ChatModel>,
    retrieval: Arc<RetrievalService>,
    drugs: Arc<dyn DrugLabelSource>,
    progress_callback: Option<PipelineCallback>,
}

impl DiagnosticPipeline {
    pub fn new(
        chat: Arc<dyn ChatModel>,
        retrieval: Arc<RetrievalService>,
        drugs: Arc<dyn DrugLabelSource>,
    ) -> Self {
        DiagnosticPipeline {
            chat,
            retrieval,
            drugs,
            progress_callback: None,
        }
    }

    pub fn with_progress(mut self, callback: PipelineCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(ref callback) = self.progress_callback {
            callback(event);
        }
    }

    /// Run all stages over the given files
    pub async fn run(&self, files: &[PathBuf], user_note: Option<&str>) -> DiagnosticReport {
        let run_id = Uuid::new_v4();
        let start_time = Instant::now();
        info!("Starting diagnostic run {} over {} files", run_id, files.len());

        let document = self
            .run_stage(
                PipelineStage::DocumentAnalysis,
                self.analyze_documents(files, user_note),
            )
            .await;

        let icd = self
            .run_stage(
                PipelineStage::MedicalContext,
                self.map_icd_codes(&document.content),
            )
            .await;

        let reasoning = self
            .run_stage(
                PipelineStage::ClinicalReasoning,
                self.reason(&document.content, &icd.content),
            )
            .await;

        let guidelines = self
            .run_stage(
                PipelineStage::GuidelineLookup,
                self.lookup_guidelines(&reasoning.content),
            )
            .await;

        let findings = format!(
            "{}\n\n{}\n\n{}",
            document.content, icd.content, reasoning.content
        );
        let kb_snippets = guidelines.succeeded.then_some(guidelines.content.as_str());
        let treatment = self
            .run_stage(
                PipelineStage::TreatmentPlan,
                self.plan_treatment(&findings, kb_snippets),
            )
            .await;

        let advisory = self
            .run_stage(
                PipelineStage::PatientAdvisory,
                self.advise_patient(&reasoning.content, &treatment.content),
            )
            .await;

        let report = DiagnosticReport {
            run_id,
            generated_at: Utc::now(),
            files: files.iter().map(|f| f.display().to_string()).collect(),
            user_note: user_note.map(str::to_string),
            stages: vec![document, icd, reasoning, guidelines, treatment, advisory],
        };

        let failed_stages = report.failed_stages().len();
        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Diagnostic run {} finished in {}ms with {} failed stages",
            run_id, duration_ms, failed_stages
        );
        self.emit(PipelineEvent::Completed {
            run_id,
            failed_stages,
            duration_ms,
        });

        report
    }

    async fn run_stage<F>(&self, stage: PipelineStage, work: F) -> StageOutput
    where
        F: Future<Output = PipelineResult<String>>,
    {
        self.emit(PipelineEvent::StageStarted { stage });
        let start_time = Instant::now();

        match work.await {
            Ok(content) => {
                let duration_ms = start_time.elapsed().as_millis() as u64;
                info!("{} succeeded in {}ms", stage, duration_ms);
                self.emit(PipelineEvent::StageCompleted { stage, duration_ms });
                StageOutput::succeeded(stage, content)
            }
            Err(e) => {
                warn!("{} failed: {}", stage, e);
                self.emit(PipelineEvent::StageFailed {
                    stage,
                    error: e.to_string(),
                });
                StageOutput::failed(stage, e)
            }
        }
    }

    async fn ask(&self, prompt: String, temperature: f32) -> PipelineResult<String> {
        self.chat
            .complete(&[ChatMessage::user(prompt)], temperature)
            .await
            .map_err(PipelineError::model)
    }

    async fn analyze_documents(
        &self,
        files: &[PathBuf],
        user_note: Option<&str>,
    ) -> PipelineResult<String> {
        let mut images = Vec::new();
        let mut texts = Vec::new();

        for path in files {
            match DocumentExtractor::extract(path).await {
                Ok(ExtractedDocument::Text(text)) => texts.push(ContentPart::Text(text)),
                Ok(ExtractedDocument::Image { data_url }) => {
                    images.push(ContentPart::ImageUrl(data_url))
                }
                Err(ExtractionError::Unsupported(path)) => {
                    warn!("Skipping unsupported file {}", path.display())
                }
                Err(e) => return Err(e.into()),
            }
        }

        let mut reports = Vec::new();
        for batch in images.chunks(IMAGE_BATCH_SIZE) {
            let mut content = batch.to_vec();
            content.extend(texts.iter().cloned());
            reports.push(self.analyze_batch(content, user_note).await);
        }

        if images.is_empty() && !texts.is_empty() {
            reports.push(self.analyze_batch(texts, user_note).await);
        }

        if reports.is_empty() {
            return Ok(NO_CONTENT_MESSAGE.to_string());
        }

        Ok(reports.join(SECTION_SEPARATOR))
    }

    /// One multimodal request; a failure only affects this batch
    async fn analyze_batch(&self, mut content: Vec<ContentPart>, user_note: Option<&str>) -> String {
        let mut prompt = "Extract all lab values, symptoms, and abnormalities from the following medical reports. Provide concise bullet points.".to_string();
        if let Some(note) = user_note.filter(|n| !n.trim().is_empty()) {
            prompt.push_str(&format!("\nUser Note: {}", note));
        }
        content.push(ContentPart::Text(prompt));

        match self
            .chat
            .complete(&[ChatMessage::user_parts(content)], DOCUMENT_TEMPERATURE)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Document batch failed: {:#}", e);
                format!("⚠️ Batch failed: {:#}", e)
            }
        }
    }

    async fn map_icd_codes(&self, findings: &str) -> PipelineResult<String> {
        let prompt = format!(
            "You are a clinical assistant. Based on the extracted findings below, list likely ICD-10 codes with short explanations.\nProvide concise bullet points for context.\n\nFindings:\n{}",
            findings
        );
        self.ask(prompt, ICD_TEMPERATURE).await
    }

    async fn reason(&self, findings: &str, icd_codes: &str) -> PipelineResult<String> {
        let prompt = format!(
            "Analyze the medical findings and ICD codes below.\nProvide a concise clinical reasoning summary in bullet points.\n\nFindings:\n{}\n\nICD codes:\n{}",
            findings, icd_codes
        );
        self.ask(prompt, REASONING_TEMPERATURE).await
    }

    async fn lookup_guidelines(&self, reasoning: &str) -> PipelineResult<String> {
        let top_k = self.retrieval.config().top_k;
        let hits = self.retrieval.lookup(reasoning, top_k).await;

        let Some(passages) = guideline_context(&hits) else {
            return Ok(NO_GUIDELINES_FOUND.to_string());
        };

        let prompt = format!(
            "Reformat the following medical guideline passages into clear, easy-to-read bullet points.\nEach bullet point should be concise and include a short explanation for better understanding.\n\nPassages:\n{}",
            passages
        );
        self.ask(prompt, GUIDELINE_TEMPERATURE).await
    }

    async fn plan_treatment(&self, findings: &str, kb_snippets: Option<&str>) -> PipelineResult<String> {
        let snippets = kb_snippets.unwrap_or(NO_KB_SNIPPETS);
        let prompt = format!(
            "Based on findings, ICD codes, clinical reasoning, and guideline snippets, create a concise treatment plan.\nUse bullet points and short explanations. Mention FDA drug warnings if relevant.\n\nINPUT:\n{}\n\nKB SNIPPETS:\n{}",
            findings, snippets
        );
        let plan = self.ask(prompt, TREATMENT_TEMPERATURE).await?;

        let mentioned = format!("{}\n{}\n{}", plan, findings, kb_snippets.unwrap_or_default());
        let reports = CheckDrugSafety::new(self.drugs.as_ref())
            .execute(&mentioned)
            .await;

        Ok(format!(
            "{}{}{}",
            plan,
            SAFETY_NOTES_HEADER,
            render_safety_notes(&reports)
        ))
    }

    async fn advise_patient(&self, reasoning: &str, treatment: &str) -> PipelineResult<String> {
        let prompt = format!(
            "Rewrite the clinical reasoning and treatment plan below into simple, patient-friendly advice:\n{}\n\n{}",
            reasoning, treatment
        );
        self.ask(prompt, ADVISORY_TEMPERATURE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::DrugSafetyReport;
    use crate::application::ports::Embedder;
    use crate::application::services::RetrievalConfig;
    use crate::domain::value_objects::EmbeddingVector;
    use crate::infrastructure::persistence::JsonSnapshotRepository;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Debug, Clone)]
    struct Request {
        text: String,
        images: usize,
        temperature: f32,
    }

    /// Replies by recognising which stage prompt it was sent
    #[derive(Default)]
    struct ScriptedChat {
        requests: Mutex<Vec<Request>>,
        fail_when: Option<&'static str>,
    }

    impl ScriptedChat {
        fn failing_on(marker: &'static str) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                fail_when: Some(marker),
            }
        }

        fn requests(&self) -> Vec<Request> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> anyhow::Result<String> {
            let text = messages.iter().map(|m| m.text()).collect::<Vec<_>>().join("\n");
            let images = messages.iter().map(|m| m.image_count()).sum();
            self.requests.lock().unwrap().push(Request {
                text: text.clone(),
                images,
                temperature,
            });

            if let Some(marker) = self.fail_when {
                if text.contains(marker) {
                    anyhow::bail!("service unavailable");
                }
            }

            let reply = if text.contains("Extract all lab values") {
                "- Temperature 39.2C\n- Positive malaria RDT"
            } else if text.contains("ICD-10") {
                "- B54 Unspecified malaria"
            } else if text.contains("clinical reasoning summary") {
                "- Uncomplicated falciparum malaria"
            } else if text.contains("Reformat the following") {
                "- Treat with an artemisinin combination"
            } else if text.contains("treatment plan.") {
                "- Artemether-lumefantrine for 3 days\n- Paracetamol for fever"
            } else if text.contains("patient-friendly") {
                "Take all your tablets for three days."
            } else {
                "unexpected prompt"
            };
            Ok(reply.to_string())
        }
    }

    struct StaticLabels;

    #[async_trait]
    impl DrugLabelSource for StaticLabels {
        async fn lookup_drug(&self, name: &str) -> DrugSafetyReport {
            if name == "paracetamol" {
                DrugSafetyReport {
                    drug_name: name.to_string(),
                    brand: "Tylenol".to_string(),
                    generic: "ACETAMINOPHEN".to_string(),
                    warnings: "Liver warning".to_string(),
                    found: true,
                }
            } else {
                DrugSafetyReport::not_found(name)
            }
        }
    }

    struct MalariaEmbedder;

    #[async_trait]
    impl Embedder for MalariaEmbedder {
        fn model_name(&self) -> &str {
            "malaria"
        }

        fn dimension_count(&self) -> usize {
            2
        }

        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<EmbeddingVector>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let lower = t.to_lowercase();
                    EmbeddingVector::new(vec![
                        lower.matches("malaria").count() as f32,
                        lower.matches("fever").count() as f32,
                    ])
                    .unwrap()
                })
                .collect())
        }
    }

    fn retrieval(dir: &TempDir, guidelines: Option<&str>) -> Arc<RetrievalService> {
        let source_path = dir.path().join("guidelines.txt");
        if let Some(text) = guidelines {
            std::fs::write(&source_path, text).unwrap();
        }
        let index_path = dir.path().join("kb_index.json");
        let config = RetrievalConfig {
            source_path,
            index_path: index_path.clone(),
            ..RetrievalConfig::default()
        };
        Arc::new(RetrievalService::new(
            config,
            Arc::new(MalariaEmbedder),
            Arc::new(JsonSnapshotRepository::new(index_path)),
        ))
    }

    fn write(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_full_run_produces_six_sections() {
        let dir = TempDir::new().unwrap();
        let chat = Arc::new(ScriptedChat::default());
        let pipeline = DiagnosticPipeline::new(
            chat.clone(),
            retrieval(&dir, Some("Malaria with fever is treated with artemisinin combination therapy.")),
            Arc::new(StaticLabels),
        );
        let labs = write(&dir, "labs.txt", b"Temp 39.2C, malaria RDT positive");

        let report = pipeline.run(&[labs], Some("Returned from travel")).await;

        assert_eq!(report.stages.len(), 6);
        assert!(report.failed_stages().is_empty());
        assert_eq!(
            report.stages.iter().map(|s| s.stage).collect::<Vec<_>>(),
            PipelineStage::ALL.to_vec()
        );

        let guidelines = report.stage(PipelineStage::GuidelineLookup).unwrap();
        assert_eq!(guidelines.content, "- Treat with an artemisinin combination");

        let treatment = report.stage(PipelineStage::TreatmentPlan).unwrap();
        assert!(treatment.content.starts_with("- Artemether-lumefantrine for 3 days"));
        assert!(treatment.content.contains(SAFETY_NOTES_HEADER));
        assert!(treatment
            .content
            .contains("🔹 Paracetamol\n- FDA Warnings (brand/generic): Tylenol/ACETAMINOPHEN"));

        let requests = chat.requests();
        let temperatures: Vec<f32> = requests.iter().map(|r| r.temperature).collect();
        assert_eq!(temperatures, vec![0.2, 0.2, 0.2, 0.3, 0.3, 0.4]);
        assert!(requests[0].text.contains("User Note: Returned from travel"));
        assert!(requests[0].text.contains("malaria RDT positive"));
        assert!(requests[3].text.contains("artemisinin combination therapy"));

        let rendered = report.render();
        assert!(rendered.starts_with("### 📄 Document Analysis\n- Temperature 39.2C"));
        assert!(rendered.contains("\n\n---\n\n### 💡 Patient Advisory\nTake all your tablets"));
    }

    #[tokio::test]
    async fn test_missing_knowledge_base_skips_reformatting() {
        let dir = TempDir::new().unwrap();
        let chat = Arc::new(ScriptedChat::default());
        let pipeline = DiagnosticPipeline::new(chat.clone(), retrieval(&dir, None), Arc::new(StaticLabels));
        let labs = write(&dir, "labs.txt", b"fever");

        let report = pipeline.run(&[labs], None).await;

        let guidelines = report.stage(PipelineStage::GuidelineLookup).unwrap();
        assert!(guidelines.succeeded);
        assert_eq!(guidelines.content, NO_GUIDELINES_FOUND);
        assert_eq!(chat.requests().len(), 5);
        assert!(!chat
            .requests()
            .iter()
            .any(|r| r.text.contains("Reformat the following")));
    }

    #[tokio::test]
    async fn test_images_are_batched_with_all_texts() {
        let dir = TempDir::new().unwrap();
        let chat = Arc::new(ScriptedChat::default());
        let pipeline = DiagnosticPipeline::new(chat.clone(), retrieval(&dir, None), Arc::new(StaticLabels));

        let mut files: Vec<PathBuf> = (0..7)
            .map(|i| write(&dir, &format!("scan{}.png", i), b"png"))
            .collect();
        files.push(write(&dir, "labs.txt", b"Hb 9.1"));
        files.push(write(&dir, "notes.xlsx", b"ignored"));

        let report = pipeline.run(&files, None).await;

        let requests = chat.requests();
        assert_eq!(requests[0].images, 5);
        assert_eq!(requests[1].images, 2);
        assert!(requests[0].text.contains("Hb 9.1"));
        assert!(requests[1].text.contains("Hb 9.1"));

        let document = report.stage(PipelineStage::DocumentAnalysis).unwrap();
        assert_eq!(document.content.matches(SECTION_SEPARATOR).count(), 1);
    }

    #[tokio::test]
    async fn test_no_content_message() {
        let dir = TempDir::new().unwrap();
        let chat = Arc::new(ScriptedChat::default());
        let pipeline = DiagnosticPipeline::new(chat.clone(), retrieval(&dir, None), Arc::new(StaticLabels));
        let unsupported = write(&dir, "data.csv", b"a,b");

        let report = pipeline.run(&[unsupported], None).await;

        let document = report.stage(PipelineStage::DocumentAnalysis).unwrap();
        assert!(document.succeeded);
        assert_eq!(document.content, NO_CONTENT_MESSAGE);
        assert!(chat.requests()[0].text.contains("ICD-10"));
    }

    #[tokio::test]
    async fn test_failed_batch_is_reported_inline() {
        let dir = TempDir::new().unwrap();
        let chat = Arc::new(ScriptedChat::failing_on("Extract all lab values"));
        let pipeline = DiagnosticPipeline::new(chat, retrieval(&dir, None), Arc::new(StaticLabels));
        let labs = write(&dir, "labs.txt", b"fever");

        let report = pipeline.run(&[labs], None).await;

        let document = report.stage(PipelineStage::DocumentAnalysis).unwrap();
        assert!(document.succeeded);
        assert_eq!(document.content, "⚠️ Batch failed: service unavailable");
    }

    #[tokio::test]
    async fn test_failed_stage_does_not_stop_the_run() {
        let dir = TempDir::new().unwrap();
        let chat = Arc::new(ScriptedChat::failing_on("ICD-10"));
        let events = Arc::new(Mutex::new(Vec::new()));
        let recorded = events.clone();
        let pipeline = DiagnosticPipeline::new(chat, retrieval(&dir, None), Arc::new(StaticLabels))
            .with_progress(Arc::new(move |event: PipelineEvent| recorded.lock().unwrap().push(event)));
        let labs = write(&dir, "labs.txt", b"fever");

        let report = pipeline.run(&[labs], None).await;

        assert_eq!(report.failed_stages(), vec![PipelineStage::MedicalContext]);
        assert_eq!(
            report.stage(PipelineStage::MedicalContext).unwrap().content,
            "❌ ICD Mapping failed: Model request failed: service unavailable"
        );
        assert!(report.stage(PipelineStage::PatientAdvisory).unwrap().succeeded);

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 6 * 2 + 1);
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::StageFailed {
                stage: PipelineStage::MedicalContext,
                ..
            }
        )));
        assert!(matches!(
            events.last(),
            Some(PipelineEvent::Completed { failed_stages: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_guideline_stage_is_not_used_as_snippets() {
        let dir = TempDir::new().unwrap();
        let chat = Arc::new(ScriptedChat::failing_on("Reformat the following"));
        let pipeline = DiagnosticPipeline::new(
            chat.clone(),
            retrieval(&dir, Some("Malaria with fever is treated with artemisinin combination therapy.")),
            Arc::new(StaticLabels),
        );
        let labs = write(&dir, "labs.txt", b"fever, malaria RDT positive");

        let report = pipeline.run(&[labs], None).await;

        assert_eq!(report.failed_stages(), vec![PipelineStage::GuidelineLookup]);
        assert!(report
            .stage(PipelineStage::GuidelineLookup)
            .unwrap()
            .content
            .starts_with("❌ KB Lookup failed:"));

        let requests = chat.requests();
        assert_eq!(requests.len(), 6);
        let treatment_prompt = &requests[4].text;
        assert!(treatment_prompt.contains("KB SNIPPETS:\nNo KB snippets provided."));
        assert!(!treatment_prompt.contains("KB Lookup failed"));
        assert!(treatment_prompt.contains("- Uncomplicated falciparum malaria"));

        let advisory_prompt = &requests[5].text;
        assert!(advisory_prompt.contains("- Uncomplicated falciparum malaria"));
        assert!(advisory_prompt.contains("- Artemether-lumefantrine for 3 days"));
    }

    #[tokio::test]
    async fn test_missing_upload_fails_document_stage() {
        let dir = TempDir::new().unwrap();
        let chat = Arc::new(ScriptedChat::default());
        let pipeline = DiagnosticPipeline::new(chat, retrieval(&dir, None), Arc::new(StaticLabels));

        let report = pipeline.run(&[dir.path().join("gone.pdf")], None).await;

        let document = report.stage(PipelineStage::DocumentAnalysis).unwrap();
        assert!(!document.succeeded);
        assert!(document.content.starts_with("❌ Document Analysis failed: Document error: File not found"));
    }
}
