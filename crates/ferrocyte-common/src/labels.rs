//! Label universe of a reference dataset.

use std::collections::BTreeMap;

use crate::error::{FerrocyteError, Result};

/// Sorted set of labels plus the reference samples carrying each label.
///
/// Labels are indexed in lexicographic order, so "lowest index" and
/// "lexicographically smallest" are the same tie-break everywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelUniverse {
    labels: Vec<String>,
    members: Vec<Vec<usize>>,
}

impl LabelUniverse {
    /// Group `labels` (one per reference sample) into a universe.
    pub fn from_labels(labels: &[String], n_samples: usize) -> Result<Self> {
        if labels.len() != n_samples {
            return Err(FerrocyteError::data(format!(
                "label vector has {} entries but the reference has {} samples",
                labels.len(),
                n_samples
            )));
        }
        if labels.is_empty() {
            return Err(FerrocyteError::data("reference has no labelled samples"));
        }

        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (sample, label) in labels.iter().enumerate() {
            groups.entry(label.as_str()).or_default().push(sample);
        }

        let names: Vec<String> = groups.keys().map(|s| s.to_string()).collect();
        let members: Vec<Vec<usize>> = groups.into_values().collect();

        Ok(Self { labels: names, members })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn name(&self, label: usize) -> &str {
        &self.labels[label]
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.labels.binary_search_by(|l| l.as_str().cmp(name)).ok()
    }

    /// Reference sample indices carrying `label`.
    pub fn members(&self, label: usize) -> &[usize] {
        &self.members[label]
    }
}
