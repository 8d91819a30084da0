//! Precomputed rank vectors for the full marker union.
//!
//! First-pass scoring always uses every marker of the artifact, so each
//! reference sample's scaled ranks over that set can be computed once at
//! training time. Correlations are then plain dot products and match the
//! unindexed path exactly.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use ferrocyte_common::{AccelerationConfig, ExpressionMatrix, LabelUniverse};

use crate::normalise::scaled_ranks;

#[derive(Debug, Clone)]
pub struct RankIndex {
    /// Per label: indexed samples × features.
    vectors: Vec<Array2<f64>>,
    exact: bool,
}

impl RankIndex {
    /// Build the index over every row of `reference`.
    ///
    /// In approximate mode at most `max_samples_per_label` samples per label
    /// are indexed, chosen with a seeded RNG.
    pub fn build(reference: &ExpressionMatrix, universe: &LabelUniverse, config: &AccelerationConfig) -> Self {
        let n_features = reference.n_features();
        let mut rng = config
            .approximate
            .as_ref()
            .map(|a| StdRng::seed_from_u64(a.seed));

        let mut vectors = Vec::with_capacity(universe.len());
        for label in 0..universe.len() {
            let members = universe.members(label);
            let chosen: Vec<usize> = match (&config.approximate, rng.as_mut()) {
                (Some(approx), Some(rng)) if members.len() > approx.max_samples_per_label => {
                    let mut picks = rand::seq::index::sample(rng, members.len(), approx.max_samples_per_label).into_vec();
                    picks.sort_unstable();
                    picks.into_iter().map(|i| members[i]).collect()
                }
                _ => members.to_vec(),
            };

            let mut block = Array2::zeros((chosen.len(), n_features));
            for (row, &sample) in chosen.iter().enumerate() {
                let ranks = scaled_ranks(reference.column(sample).iter());
                for (f, r) in ranks.into_iter().enumerate() {
                    block[[row, f]] = r;
                }
            }
            debug!(
                "Indexed {}/{} samples for label '{}'",
                chosen.len(),
                members.len(),
                universe.name(label)
            );
            vectors.push(block);
        }

        Self { vectors, exact: config.is_exact() }
    }

    /// Indexed rank vectors of one label (samples × features).
    pub fn label_vectors(&self, label: usize) -> &Array2<f64> {
        &self.vectors[label]
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    pub fn indexed_samples(&self) -> usize {
        self.vectors.iter().map(|v| v.nrows()).sum()
    }
}
