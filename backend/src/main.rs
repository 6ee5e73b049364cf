use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medguide::application::dto::{DiagnosticReport, PipelineStage};
use medguide::application::ports::{DrugLabelSource, Embedder};
use medguide::application::services::{
    DiagnosticPipeline, IndexBuilder, PipelineEvent, RetrievalService,
};
use medguide::application::use_cases::{render_safety_notes, NO_GUIDELINES_FOUND};
use medguide::config::AppConfig;
use medguide::domain::value_objects::EmbeddingModel;
use medguide::infrastructure::embeddings::FastEmbedService;
use medguide::infrastructure::llm::GroqChatClient;
use medguide::infrastructure::openfda::OpenFdaClient;
use medguide::infrastructure::persistence::JsonSnapshotRepository;

#[derive(Parser)]
#[command(
    name = "medguide",
    version,
    about = "Guideline-grounded diagnostic reports from medical documents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the guideline index from the source document
    BuildIndex {
        /// Guideline document (PDF or text)
        #[arg(long)]
        source: Option<PathBuf>,
        /// Where to write the index
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Search the guideline index
    Lookup {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Run the diagnostic pipeline over lab reports, scans and notes
    Analyze {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Extra context from the user, passed to document analysis
        #[arg(long)]
        note: Option<String>,
        /// Write the report to this file (or directory) instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check FDA label warnings for a drug
    Drug { name: String },
}

async fn embedder() -> anyhow::Result<Arc<dyn Embedder>> {
    Ok(Arc::new(FastEmbedService::new(EmbeddingModel::default()).await?))
}

async fn retrieval_service(config: &AppConfig) -> anyhow::Result<Arc<RetrievalService>> {
    let repository = Arc::new(JsonSnapshotRepository::new(&config.retrieval.index_path));
    Ok(Arc::new(RetrievalService::new(
        config.retrieval.clone(),
        embedder().await?,
        repository,
    )))
}

async fn build_index(config: &AppConfig) -> anyhow::Result<()> {
    let repository = Arc::new(JsonSnapshotRepository::new(&config.retrieval.index_path));
    let builder = IndexBuilder::new(embedder().await?, repository, config.retrieval.chunking);

    let snapshot = builder
        .build_index(&config.retrieval.source_path)
        .await
        .with_context(|| {
            format!(
                "Failed to build index from {}",
                config.retrieval.source_path.display()
            )
        })?;

    println!(
        "Indexed {} passages ({} dimensions) into {}",
        snapshot.len(),
        snapshot.dimension(),
        config.retrieval.index_path.display()
    );
    Ok(())
}

async fn lookup(config: &AppConfig, query: &str, top_k: usize) -> anyhow::Result<()> {
    let service = retrieval_service(config).await?;
    let hits = service.try_lookup(query, top_k).await?;

    if hits.is_empty() {
        println!("{}", NO_GUIDELINES_FOUND);
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        println!("{}. [distance {:.4}]\n{}\n", rank + 1, hit.distance, hit.excerpt());
    }
    Ok(())
}

fn print_progress(event: PipelineEvent) {
    match event {
        PipelineEvent::StageStarted { stage } => eprintln!("… {}", stage),
        PipelineEvent::StageCompleted { stage, duration_ms } => {
            eprintln!("✅ {} ({}ms)", stage, duration_ms)
        }
        PipelineEvent::StageFailed { stage, error } => eprintln!("❌ {}: {}", stage, error),
        PipelineEvent::Completed { failed_stages, .. } => {
            let total = PipelineStage::ALL.len();
            eprintln!("Finished {}/{} stages", total - failed_stages, total)
        }
    }
}

fn write_report(report: &DiagnosticReport, out: &Path) -> anyhow::Result<PathBuf> {
    let path = if out.is_dir() {
        out.join(report.download_file_name())
    } else {
        out.to_path_buf()
    };
    std::fs::write(&path, report.to_download_text())
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(path)
}

async fn analyze(
    config: &AppConfig,
    files: Vec<PathBuf>,
    note: Option<String>,
    out: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let chat = GroqChatClient::with_settings(
        config.groq_api_key()?,
        &config.groq.model,
        &config.groq.api_base,
        config.groq.timeout,
    )?;
    let drugs = OpenFdaClient::with_base_url(&config.openfda_base_url)?;
    let retrieval = retrieval_service(config).await?;

    let pipeline = DiagnosticPipeline::new(Arc::new(chat), retrieval, Arc::new(drugs))
        .with_progress(Arc::new(print_progress));

    let report = pipeline.run(&files, note.as_deref()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let Some(out) = out {
        let path = write_report(&report, &out)?;
        println!("Report written to {}", path.display());
    } else {
        println!("{}", report.render());
    }
    Ok(())
}

async fn check_drug(config: &AppConfig, name: &str) -> anyhow::Result<()> {
    let client = OpenFdaClient::with_base_url(&config.openfda_base_url)?;
    let report = client.lookup_drug(name).await;
    println!("{}", render_safety_notes(&[report]));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medguide=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    info!("Using guideline index at {}", config.retrieval.index_path.display());

    match cli.command {
        Command::BuildIndex { source, out } => {
            if let Some(source) = source {
                config.retrieval.source_path = source;
            }
            if let Some(out) = out {
                config.retrieval.index_path = out;
            }
            build_index(&config).await
        }
        Command::Lookup { query, top_k } => {
            let top_k = top_k.unwrap_or(config.retrieval.top_k);
            lookup(&config, &query, top_k).await
        }
        Command::Analyze {
            files,
            note,
            out,
            json,
        } => analyze(&config, files, note, out, json).await,
        Command::Drug { name } => check_drug(&config, &name).await,
    }
}
