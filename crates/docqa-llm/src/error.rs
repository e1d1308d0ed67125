#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("cannot embed empty input")]
    EmptyInput,

    #[error("model loading failed: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("no answer found in context")]
    NoAnswer,

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "candle")]
    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
