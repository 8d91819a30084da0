//! One classification result per query sample.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use ferrocyte_common::stats::median;
use ferrocyte_common::LabelUniverse;

use crate::fine_tune::FineTuneOutcome;
use crate::scorer::ScoreVector;

/// Best and second-best scores of the final round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TuningScores {
    pub best: f64,
    /// `None` when the final round scored a single label.
    pub next: Option<f64>,
}

impl TuningScores {
    pub fn gap(&self) -> Option<f64> {
        self.next.map(|next| self.best - next)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub sample: String,

    /// Best label over the full marker set, before fine-tuning.
    pub first_label: String,
    pub first_scores: BTreeMap<String, f64>,

    /// Label after fine-tuning.
    pub label: String,
    /// Final-round scores over the last candidate set.
    pub scores: BTreeMap<String, f64>,

    pub rounds: usize,
    pub tuning_scores: TuningScores,
    pub fine_tune_capped: bool,

    // ── Filled in by the pruner ──────────────────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pruned: Option<bool>,
    #[serde(default)]
    pub degenerate_mad: bool,
}

impl PredictionRecord {
    pub fn new(sample: impl Into<String>, universe: &LabelUniverse, first: &ScoreVector, outcome: &FineTuneOutcome) -> Self {
        let first_label = first
            .best()
            .map(|(l, _)| universe.name(l).to_string())
            .unwrap_or_default();
        let best = outcome.scores.get(outcome.label).unwrap_or(f64::NAN);

        Self {
            sample: sample.into(),
            first_label,
            first_scores: first.to_named(universe),
            label: universe.name(outcome.label).to_string(),
            scores: outcome.scores.to_named(universe),
            rounds: outcome.rounds,
            tuning_scores: TuningScores {
                best,
                next: outcome.scores.runner_up(),
            },
            fine_tune_capped: outcome.capped,
            delta: None,
            pruned: None,
            degenerate_mad: false,
        }
    }

    /// Final score of the assigned label.
    pub fn assigned_score(&self) -> Option<f64> {
        self.scores.get(&self.label).copied()
    }

    /// First-pass score of the assigned label minus the median of the
    /// first-pass scores.
    ///
    /// The first pass scores every label over the full marker set, so deltas
    /// stay comparable between records whatever round they finished in.
    pub fn score_delta(&self) -> Option<f64> {
        let scores: Vec<f64> = self.first_scores.values().copied().collect();
        Some(self.first_scores.get(&self.label)? - median(&scores)?)
    }

    /// Pruned records are considered unassigned.
    pub fn pruned_label(&self) -> Option<&str> {
        match self.pruned {
            Some(true) => None,
            _ => Some(self.label.as_str()),
        }
    }
}
