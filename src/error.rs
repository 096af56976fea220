use thiserror::Error;

/// Errors raised by the assessment pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The feature schema is unusable. Fatal at startup.
    #[error("invalid feature schema: {0}")]
    SchemaMismatch(String),

    /// The model artifact could not be loaded or is internally
    /// inconsistent. Fatal at startup.
    #[error("model load failed: {0}")]
    ModelLoad(String),

    /// The feature vector does not fit the loaded model. Surfaced to the
    /// caller, never coerced.
    #[error("scoring failed: feature vector has {actual} values, model expects {expected}")]
    Scoring { expected: usize, actual: usize },

    /// The explainer could not produce an attribution. Recoverable: the
    /// score and tier are still returned without an explanation.
    #[error("attribution failed: {0}")]
    Attribution(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
