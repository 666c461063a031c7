//! Command-line claim verification.
//!
//! Loads a JSON corpus into an in-memory index, verifies one claim against
//! it (falling back to web search), and prints the result as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use claimcheck::ai::OpenAI;
use claimcheck::{
    LocalEvidenceProvider, MemoryIndex, Orchestrator, RequestOverrides, RoutingMode, Settings,
    TavilyWebSearcher, VerifyConfig, WebEvidenceProvider,
};
use claimcheck::traits::index::Embedder;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Passages embedded concurrently while loading the corpus
const EMBED_CONCURRENCY: usize = 4;

#[derive(Parser)]
#[command(name = "claimcheck")]
#[command(about = "Verify claims against a local corpus and the web")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a single claim
    Verify {
        claim: String,

        /// JSON array of {"id", "text"} passages
        #[arg(long)]
        corpus: PathBuf,

        #[arg(long)]
        top_k_local: Option<usize>,

        #[arg(long)]
        top_k_web: Option<usize>,

        /// Local score needed to skip web search
        #[arg(long)]
        threshold: Option<f32>,

        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Drop local passages scoring below this
        #[arg(long, default_value_t = 0.0)]
        min_score: f32,

        /// Search local and web concurrently
        #[arg(long)]
        parallel: bool,
    },
}

#[derive(Deserialize)]
struct CorpusPassage {
    id: String,
    text: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays parseable JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,claimcheck=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Verify {
            claim,
            corpus,
            top_k_local,
            top_k_web,
            threshold,
            timeout_ms,
            min_score,
            parallel,
        } => {
            let overrides = RequestOverrides {
                top_k_local,
                top_k_web,
                sufficiency_threshold: threshold,
                timeout_ms,
            };
            verify(&settings, &claim, &corpus, &overrides, min_score, parallel).await
        }
    }
}

async fn verify(
    settings: &Settings,
    claim: &str,
    corpus: &Path,
    overrides: &RequestOverrides,
    min_score: f32,
    parallel: bool,
) -> Result<()> {
    let mut ai = OpenAI::new(settings.openai_api_key.clone());
    if let Some(model) = &settings.openai_model {
        ai = ai.with_model(model);
    }
    if let Some(model) = &settings.openai_embedding_model {
        ai = ai.with_embedding_model(model);
    }

    let index = load_corpus(&ai, corpus).await?;
    tracing::info!(passages = index.len(), "Corpus loaded");

    let config: VerifyConfig = if parallel {
        settings.verify.clone().with_routing(RoutingMode::Parallel)
    } else {
        settings.verify.clone()
    };

    let searcher = TavilyWebSearcher::new(settings.require_tavily_key()?.clone());
    let web = WebEvidenceProvider::new(searcher)
        .with_timeout(config.web_timeout)
        .with_rate_per_minute(settings.web_rate_per_minute);
    let local = LocalEvidenceProvider::new(ai.clone(), index).with_min_score(min_score);

    let orchestrator = Orchestrator::new(local, web, ai, config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; cancelling verification");
            on_interrupt.cancel();
        }
    });

    let outcome = orchestrator
        .verify_with_cancel(claim, overrides, cancel)
        .await
        .context("Verification failed")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&outcome.result).context("Failed to encode result")?
    );
    Ok(())
}

/// Read the corpus file and embed every passage into a fresh index.
async fn load_corpus(embedder: &OpenAI, path: &Path) -> Result<MemoryIndex> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read corpus {}", path.display()))?;
    let passages: Vec<CorpusPassage> =
        serde_json::from_str(&raw).context("Corpus must be a JSON array of {id, text}")?;

    let embedded: Vec<(CorpusPassage, Vec<f32>)> = stream::iter(passages)
        .map(|passage| async move {
            let embedding = embedder
                .embed(&passage.text)
                .await
                .with_context(|| format!("Failed to embed passage {}", passage.id))?;
            Ok::<_, anyhow::Error>((passage, embedding))
        })
        .buffered(EMBED_CONCURRENCY)
        .try_collect()
        .await?;

    let index = MemoryIndex::new();
    for (passage, embedding) in embedded {
        index.insert(passage.id, passage.text, embedding);
    }
    Ok(index)
}
