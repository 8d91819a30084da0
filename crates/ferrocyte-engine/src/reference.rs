//! Repository of named reference datasets.
//!
//! Reference collections are owned by an explicitly constructed repository
//! and handed to the classifier; nothing is cached process-wide.

use std::collections::BTreeMap;
use std::sync::Arc;

use ferrocyte_common::ExpressionMatrix;
use ferrocyte_markers::MarkerSpec;

/// A labelled reference with optional curated markers.
#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    pub name: String,
    pub matrix: ExpressionMatrix,
    /// One label per reference sample.
    pub labels: Vec<String>,
    pub markers: Option<MarkerSpec>,
}

/// Trait for accessing reference datasets by name.
///
/// Implementations can use:
/// - datasets held in memory
/// - a local on-disk collection
/// - a remote catalogue fetched ahead of time
pub trait ReferenceRepository: Send + Sync {
    /// Look up a dataset; `None` if the repository does not hold it.
    fn reference(&self, name: &str) -> Option<Arc<ReferenceDataset>>;

    /// Names of every dataset held, sorted.
    fn names(&self) -> Vec<String>;
}

// ── In-memory implementation ─────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct InMemoryReferenceRepository {
    datasets: BTreeMap<String, Arc<ReferenceDataset>>,
}

impl InMemoryReferenceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dataset, replacing any previous one with the same name.
    pub fn with(mut self, dataset: ReferenceDataset) -> Self {
        self.insert(dataset);
        self
    }

    pub fn insert(&mut self, dataset: ReferenceDataset) {
        self.datasets.insert(dataset.name.clone(), Arc::new(dataset));
    }
}

impl ReferenceRepository for InMemoryReferenceRepository {
    fn reference(&self, name: &str) -> Option<Arc<ReferenceDataset>> {
        self.datasets.get(name).cloned()
    }

    fn names(&self) -> Vec<String> {
        self.datasets.keys().cloned().collect()
    }
}
