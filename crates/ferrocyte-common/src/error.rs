use thiserror::Error;

/// Errors raised by the classification core.
///
/// `Config` and `Data` signal caller misuse and are never retried.
/// Numerical degeneracies (fine-tune caps, zero MAD) are not errors; they are
/// reported as flags on the affected prediction records.
#[derive(Debug, Error)]
pub enum FerrocyteError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Classification cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl FerrocyteError {
    pub fn config(msg: impl Into<String>) -> Self {
        FerrocyteError::Config(msg.into())
    }

    pub fn data(msg: impl Into<String>) -> Self {
        FerrocyteError::Data(msg.into())
    }

    pub fn is_config(&self) -> bool {
        matches!(self, FerrocyteError::Config(_))
    }

    pub fn is_data(&self) -> bool {
        matches!(self, FerrocyteError::Data(_))
    }
}

pub type Result<T> = std::result::Result<T, FerrocyteError>;
