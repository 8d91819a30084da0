//! Pairwise differential comparison between reference labels.
//!
//! For every ordered pair (up, down) each feature gets an effect size; the
//! `de_n` features with the largest positive effect become the markers of
//! that pair.

use ndarray::Array2;
use tracing::{debug, info};

use ferrocyte_common::stats::{average_ranks, median};
use ferrocyte_common::{DeMethod, ExpressionMatrix, LabelUniverse, MarkerConfig};

use crate::pairwise::PairwiseMarkers;

/// Derive markers for every ordered pair of labels in `universe`.
///
/// Pairs are independent and are compared in parallel when the `parallel`
/// feature is enabled; the result does not depend on scheduling.
pub fn derive_pairwise_markers(
    reference: &ExpressionMatrix,
    universe: &LabelUniverse,
    config: &MarkerConfig,
) -> PairwiseMarkers {
    let k = universe.len();
    let pairs: Vec<(usize, usize)> = (0..k)
        .flat_map(|a| (0..k).filter(move |&b| b != a).map(move |b| (a, b)))
        .collect();

    let medians = match config.de_method {
        DeMethod::Classic => Some(label_medians(reference, universe)),
        DeMethod::Wilcoxon => None,
    };

    let compare = |&(up, down): &(usize, usize)| -> Vec<usize> {
        let effects = match &medians {
            Some(m) => median_effects(m, up, down),
            None => auc_effects(reference, universe.members(up), universe.members(down)),
        };
        top_up(&effects, config.de_n)
    };

    #[cfg(feature = "parallel")]
    let selected: Vec<Vec<usize>> = {
        use rayon::prelude::*;
        pairs.par_iter().map(compare).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let selected: Vec<Vec<usize>> = pairs.iter().map(compare).collect();

    let mut slots = vec![Vec::new(); k * k];
    for (&(up, down), markers) in pairs.iter().zip(selected) {
        debug!(
            "{} vs {}: {} markers",
            universe.name(up),
            universe.name(down),
            markers.len()
        );
        slots[up * k + down] = markers;
    }

    let table = PairwiseMarkers::from_slots(universe.labels().to_vec(), slots);
    info!(
        "Derived pairwise markers ({:?}, de_n = {}): {} labels, {} pairs, {} distinct features",
        config.de_method,
        config.de_n,
        k,
        pairs.len(),
        table.union_all().len()
    );
    table
}

/// labels × features matrix of per-label medians.
fn label_medians(reference: &ExpressionMatrix, universe: &LabelUniverse) -> Array2<f64> {
    let mut out = Array2::zeros((universe.len(), reference.n_features()));
    for label in 0..universe.len() {
        let members = universe.members(label);
        for f in 0..reference.n_features() {
            let row = reference.row(f);
            let values: Vec<f64> = members.iter().map(|&s| row[s]).collect();
            out[[label, f]] = median(&values).unwrap_or(0.0);
        }
    }
    out
}

fn median_effects(medians: &Array2<f64>, up: usize, down: usize) -> Vec<f64> {
    medians
        .row(up)
        .iter()
        .zip(medians.row(down).iter())
        .map(|(u, d)| u - d)
        .collect()
}

/// AUC − 0.5 per feature, from the Mann–Whitney U statistic of `up` vs `down`.
fn auc_effects(reference: &ExpressionMatrix, up: &[usize], down: &[usize]) -> Vec<f64> {
    let n_up = up.len() as f64;
    let n_down = down.len() as f64;
    (0..reference.n_features())
        .map(|f| {
            let row = reference.row(f);
            let combined: Vec<f64> = up.iter().chain(down.iter()).map(|&s| row[s]).collect();
            let ranks = average_ranks(&combined);
            let rank_sum_up: f64 = ranks[..up.len()].iter().sum();
            let u = rank_sum_up - n_up * (n_up + 1.0) / 2.0;
            u / (n_up * n_down) - 0.5
        })
        .collect()
}

/// Indices of the `n` largest strictly positive effects.
/// Ties are broken by feature order so the selection is deterministic.
fn top_up(effects: &[f64], n: usize) -> Vec<usize> {
    let mut candidates: Vec<usize> = (0..effects.len()).filter(|&f| effects[f] > 0.0).collect();
    candidates.sort_by(|&a, &b| effects[b].total_cmp(&effects[a]).then(a.cmp(&b)));
    candidates.truncate(n);
    candidates
}
