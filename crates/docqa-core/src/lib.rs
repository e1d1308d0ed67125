//! Retrieval-and-answer pipeline, process-wide model handles, and configuration.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod retriever;
pub mod service;

pub use config::Config;
pub use error::{QaError, Result};
pub use models::SharedModels;
pub use pipeline::{AskOutcome, QaPipeline};
pub use retriever::{RetrievedChunk, Retriever};
pub use service::DocQa;
