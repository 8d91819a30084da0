//! ferrocyte-common: Shared types, errors, and configuration used across all Ferrocyte crates.

pub mod error;
pub mod matrix;
pub mod labels;
pub mod config;
pub mod stats;

// Re-export commonly used types
pub use error::{FerrocyteError, Result};
pub use matrix::ExpressionMatrix;
pub use labels::LabelUniverse;
pub use config::{
    AccelerationConfig, ApproximateSearch, ClassifierConfig, DeMethod, ExecutionConfig,
    FineTuneConfig, MarkerConfig, PruneConfig,
};
