//! Per-label quantile correlation scores for one query profile.

use std::collections::BTreeMap;

use ndarray::ArrayView1;

use ferrocyte_common::config::validate_quantile;
use ferrocyte_common::stats::quantile;
use ferrocyte_common::{FerrocyteError, LabelUniverse, Result};

use crate::normalise::{correlation, scaled_ranks_of};
use crate::training::TrainingArtifact;

/// Score per candidate label, ordered by label index.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector {
    entries: Vec<(usize, f64)>,
}

impl ScoreVector {
    pub fn new(mut entries: Vec<(usize, f64)>) -> Self {
        entries.sort_by_key(|&(label, _)| label);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn labels(&self) -> Vec<usize> {
        self.entries.iter().map(|&(l, _)| l).collect()
    }

    pub fn get(&self, label: usize) -> Option<f64> {
        self.entries
            .binary_search_by_key(&label, |&(l, _)| l)
            .ok()
            .map(|i| self.entries[i].1)
    }

    /// Highest-scoring label. Exact ties go to the lowest label index, which
    /// is the lexicographically smallest label name.
    pub fn best(&self) -> Option<(usize, f64)> {
        self.entries
            .iter()
            .copied()
            .fold(None, |acc: Option<(usize, f64)>, (label, score)| match acc {
                Some((_, best)) if score <= best => acc,
                _ => Some((label, score)),
            })
    }

    /// Second-highest score, if there are at least two labels.
    pub fn runner_up(&self) -> Option<f64> {
        let (winner, _) = self.best()?;
        self.entries
            .iter()
            .filter(|&&(l, _)| l != winner)
            .map(|&(_, s)| s)
            .max_by(|a, b| a.total_cmp(b))
    }

    /// Labels scoring at least `max - tolerance`.
    pub fn within(&self, tolerance: f64) -> Vec<usize> {
        let Some((_, max)) = self.best() else { return vec![] };
        let threshold = max - tolerance;
        self.entries
            .iter()
            .filter(|&&(_, s)| s >= threshold)
            .map(|&(l, _)| l)
            .collect()
    }

    pub fn to_named(&self, universe: &LabelUniverse) -> BTreeMap<String, f64> {
        self.entries
            .iter()
            .map(|&(l, s)| (universe.name(l).to_string(), s))
            .collect()
    }
}

/// Scores query profiles against a [`TrainingArtifact`].
///
/// Query profiles are indexed like the artifact's restricted reference (see
/// [`TrainingArtifact::marker_features`]).
#[derive(Debug, Clone, Copy)]
pub struct Scorer<'a> {
    artifact: &'a TrainingArtifact,
    quantile: f64,
}

impl<'a> Scorer<'a> {
    /// Fails with `Config` if `quantile` is outside (0, 1].
    pub fn new(artifact: &'a TrainingArtifact, quantile: f64) -> Result<Self> {
        validate_quantile(quantile)?;
        Ok(Self { artifact, quantile })
    }

    pub fn artifact(&self) -> &'a TrainingArtifact {
        self.artifact
    }

    /// Score `query` against each candidate label using only `markers`.
    ///
    /// For every reference sample of a candidate, the Spearman correlation
    /// with the query over `markers` is computed; the label's score is the
    /// configured quantile of those correlations.
    pub fn score(&self, query: ArrayView1<'_, f64>, candidates: &[usize], markers: &[usize]) -> Result<ScoreVector> {
        let n_features = self.artifact.reference().n_features();
        if markers.is_empty() {
            return Err(FerrocyteError::config("marker subset is empty"));
        }
        if let Some(&bad) = markers.iter().find(|&&m| m >= n_features) {
            return Err(FerrocyteError::config(format!(
                "marker row {} is outside the training artifact ({} features)",
                bad, n_features
            )));
        }
        if query.len() != n_features {
            return Err(FerrocyteError::data(format!(
                "query profile has {} values, expected {}",
                query.len(),
                n_features
            )));
        }
        if candidates.is_empty() {
            return Err(FerrocyteError::config("candidate label set is empty"));
        }
        if let Some(&bad) = candidates.iter().find(|&&l| l >= self.artifact.n_labels()) {
            return Err(FerrocyteError::config(format!("unknown label index {}", bad)));
        }

        let query_ranks = scaled_ranks_of(query, markers);
        let indexed = self
            .artifact
            .index()
            .filter(|_| markers == self.artifact.all_markers());

        let entries = candidates
            .iter()
            .map(|&label| {
                let correlations: Vec<f64> = match indexed {
                    Some(index) => index
                        .label_vectors(label)
                        .rows()
                        .into_iter()
                        .map(|row| correlation_view(row, &query_ranks))
                        .collect(),
                    None => self.reference_correlations(label, markers, &query_ranks),
                };
                let score = quantile(&correlations, self.quantile).unwrap_or(0.0);
                (label, score)
            })
            .collect();

        Ok(ScoreVector::new(entries))
    }

    fn reference_correlations(&self, label: usize, markers: &[usize], query_ranks: &[f64]) -> Vec<f64> {
        let reference = self.artifact.reference();
        self.artifact
            .universe()
            .members(label)
            .iter()
            .map(|&sample| {
                let ranks = scaled_ranks_of(reference.column(sample), markers);
                correlation(&ranks, query_ranks)
            })
            .collect()
    }
}

fn correlation_view(row: ArrayView1<'_, f64>, query_ranks: &[f64]) -> f64 {
    match row.as_slice() {
        Some(slice) => correlation(slice, query_ranks),
        None => correlation(&row.to_vec(), query_ranks),
    }
}
