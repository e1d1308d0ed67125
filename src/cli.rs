use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Ask questions about a document and get short extractive answers.
#[derive(Debug, Parser)]
#[command(name = "docqa", version, about)]
pub(crate) struct Cli {
    /// Config file (default: $DOCQA_CONFIG, then config/default.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Run the HTTP gateway
    Serve,
    /// Answer a question about a local file without storing it
    Ask {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, short)]
        question: String,
        /// Chunks to retrieve (default: retrieval.top_k)
        #[arg(long, short)]
        k: Option<usize>,
    },
    /// Store a document and print its id
    Ingest { path: PathBuf },
    /// Answer a question about a stored document
    Query {
        #[arg(long)]
        id: i64,
        #[arg(long, short)]
        question: String,
        #[arg(long, short)]
        k: Option<usize>,
    },
    /// List stored documents
    List,
}
