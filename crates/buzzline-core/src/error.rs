use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuzzlineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BuzzlineError {
    /// Short error code string, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            BuzzlineError::Config(_) => "CONFIG_ERROR",
            BuzzlineError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, BuzzlineError>;
