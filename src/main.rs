mod cli;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use docqa_core::{Config, DocQa, QaPipeline, Retriever, SharedModels};
use docqa_gateway::GatewayServer;
use docqa_memory::DocumentId;
use docqa_memory::document::loader_for_path;
use tokio::sync::watch;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber();

    let config_path = resolve_config_path(cli.config.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    tracing::debug!(path = %config_path.display(), "config loaded");

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Ask { file, question, k } => ask_file(config, &file, &question, k).await,
        Command::Ingest { path } => ingest(config, &path).await,
        Command::Query { id, question, k } => query(config, id, &question, k).await,
        Command::List => list(config).await,
    }
}

fn resolve_config_path(flag: Option<&Path>) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("DOCQA_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let qa = DocQa::open(config).await.context("failed to open document store")?;
    qa.models()
        .warm_up()
        .await
        .context("failed to load models")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    GatewayServer::new(qa, shutdown_rx).serve().await?;
    Ok(())
}

async fn ask_file(config: Config, file: &Path, question: &str, k: Option<usize>) -> anyhow::Result<()> {
    let document = loader_for_path(file, config.storage.max_file_size)?
        .load(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let models = SharedModels::new(&config);
    let retriever = Retriever::new(models.embedder().await?, config.chunker()?)?;
    let pipeline = QaPipeline::new(retriever, models.extractor().await?, config.retrieval.top_k);

    let outcome = pipeline
        .ask_with(&document.content, question, k.unwrap_or(config.retrieval.top_k))
        .await?;
    tracing::debug!(score = outcome.score, retrieved = outcome.retrieved, "answered");
    println!("{}", outcome.answer);
    Ok(())
}

async fn ingest(config: Config, path: &Path) -> anyhow::Result<()> {
    let qa = DocQa::open(config).await?;
    let filename = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    let id = qa.ingest_file(path, &filename).await?;
    println!("{id}");
    Ok(())
}

async fn query(config: Config, id: i64, question: &str, k: Option<usize>) -> anyhow::Result<()> {
    let qa = DocQa::open(config).await?;
    let outcome = qa.ask_document(DocumentId(id), question, k).await?;
    println!("{}", outcome.answer);
    Ok(())
}

async fn list(config: Config) -> anyhow::Result<()> {
    let qa = DocQa::open(config).await?;
    for doc in qa.list_documents().await? {
        println!("{}\t{}\t{}\t{} chars", doc.id, doc.filename, doc.upload_date, doc.chars);
    }
    Ok(())
}
