//! ferrocyte-engine: Reference-based sample classification.
//!
//! Pipeline: markers are resolved once, a [`TrainingArtifact`] is built from
//! the reference, then every query sample is scored ([`Scorer`]), narrowed
//! ([`FineTuner`]) and finally the whole batch is screened for low-confidence
//! assignments ([`prune`]).

pub mod normalise;
pub mod reference;
pub mod index;
pub mod training;
pub mod scorer;
pub mod fine_tune;
pub mod record;
pub mod prune;
pub mod classifier;

pub use classifier::{classify, train_and_classify, Classifier};
pub use fine_tune::{FineTuneOutcome, FineTuner};
pub use prune::prune;
pub use record::{PredictionRecord, TuningScores};
pub use reference::{InMemoryReferenceRepository, ReferenceDataset, ReferenceRepository};
pub use scorer::{ScoreVector, Scorer};
pub use training::{TrainingArtifact, TrainingBuilder};

pub use ferrocyte_common::{ClassifierConfig, FerrocyteError, Result};
pub use ferrocyte_markers::{MarkerSpec, PairwiseMarkers};
