//! Fine-Tuner: iterative narrowing of the candidate label set.
//!
//! Starting from the first-pass score vector, every round keeps the labels
//! scoring within `tolerance` of the best one and re-scores only those,
//! using the pairwise markers among them. The loop ends on a single
//! survivor, a fixed point, or the round cap.

use ndarray::ArrayView1;
use tracing::debug;

use ferrocyte_common::{FerrocyteError, FineTuneConfig, Result};

use crate::scorer::{ScoreVector, Scorer};

/// Result of fine-tuning one query sample.
#[derive(Debug, Clone, PartialEq)]
pub struct FineTuneOutcome {
    pub label: usize,
    /// Score vector of the last round; `label` is its best entry.
    pub scores: ScoreVector,
    /// Scoring rounds run, counting the first pass.
    pub rounds: usize,
    /// Stopped on a fixed point, the round cap, or an empty marker subset
    /// instead of a single survivor.
    pub capped: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct FineTuner<'a> {
    scorer: Scorer<'a>,
    enabled: bool,
    tolerance: f64,
    cap: usize,
}

impl<'a> FineTuner<'a> {
    pub fn new(scorer: Scorer<'a>, config: &FineTuneConfig) -> Self {
        let n_labels = scorer.artifact().n_labels();
        Self {
            scorer,
            enabled: config.enabled,
            tolerance: config.tolerance,
            cap: config.effective_cap(n_labels),
        }
    }

    /// Narrow `initial` (the first-pass vector over every label) down to a
    /// final label for `query`.
    pub fn run(&self, query: ArrayView1<'_, f64>, initial: ScoreVector) -> Result<FineTuneOutcome> {
        let mut current = initial;
        let mut rounds = 1;

        loop {
            let (best, _) = current
                .best()
                .ok_or_else(|| FerrocyteError::data("score vector is empty"))?;
            if !self.enabled {
                return Ok(finish(best, current, rounds, false));
            }

            let retained = current.within(self.tolerance);
            if retained.len() <= 1 {
                return Ok(finish(best, current, rounds, false));
            }
            if retained == current.labels() {
                debug!("Fine-tuning reached a fixed point with {} labels after {} round(s)", retained.len(), rounds);
                return Ok(finish(best, current, rounds, true));
            }
            if rounds >= self.cap {
                debug!("Fine-tuning stopped at the cap of {} round(s) with {} labels left", self.cap, retained.len());
                return Ok(finish(best, current, rounds, true));
            }

            let markers = self.scorer.artifact().markers().union_among(&retained);
            if markers.is_empty() {
                debug!("No pairwise markers among the {} remaining labels", retained.len());
                return Ok(finish(best, current, rounds, true));
            }

            current = self.scorer.score(query, &retained, &markers)?;
            rounds += 1;
        }
    }
}

fn finish(label: usize, scores: ScoreVector, rounds: usize, capped: bool) -> FineTuneOutcome {
    FineTuneOutcome { label, scores, rounds, capped }
}
