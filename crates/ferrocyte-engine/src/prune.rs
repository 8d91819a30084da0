//! Pruner: flags low-confidence assignments after a batch is classified.
//!
//! Each record's delta is the first-pass score of its assigned label minus
//! the median of its first-pass scores. Records whose delta is an outlier on the low side of
//! their group (median − nmads · MAD) are flagged.

use std::collections::BTreeMap;

use tracing::{info, warn};

use ferrocyte_common::stats::{mad, median};
use ferrocyte_common::{FerrocyteError, PruneConfig, Result};

use crate::record::PredictionRecord;

/// MADs below this are treated as zero.
const MAD_EPSILON: f64 = 1e-12;

/// Fill in `delta`, `pruned` and `degenerate_mad` on every record and return
/// the pruned flags in record order.
///
/// Groups whose deltas have zero spread flag nothing through the MAD rule;
/// they are marked `degenerate_mad` instead. The optional `min_diff_med` and
/// `min_diff_next` floors apply to every record regardless of group.
pub fn prune(records: &mut [PredictionRecord], config: &PruneConfig) -> Result<Vec<bool>> {
    config.validate()?;

    let deltas = records
        .iter()
        .map(|r| {
            r.score_delta().ok_or_else(|| {
                FerrocyteError::data(format!(
                    "record '{}' has no final score for its label '{}'",
                    r.sample, r.label
                ))
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, record) in records.iter().enumerate() {
        let key = if config.per_label { record.label.as_str() } else { "" };
        groups.entry(key).or_default().push(i);
    }

    let mut flags = vec![false; records.len()];
    let mut degenerate = vec![false; records.len()];
    for (group, members) in &groups {
        let values: Vec<f64> = members.iter().map(|&i| deltas[i]).collect();
        let Some(center) = median(&values) else { continue };
        let spread = mad(&values, center).unwrap_or(0.0);

        if spread < MAD_EPSILON {
            warn!(
                "Zero MAD of deltas in {} ({} records); no outlier threshold applied",
                describe(group),
                members.len()
            );
            for &i in members {
                degenerate[i] = true;
            }
            continue;
        }

        let threshold = center - config.nmads * spread;
        for &i in members {
            if deltas[i] < threshold {
                flags[i] = true;
            }
        }
    }

    for (i, record) in records.iter().enumerate() {
        if config.min_diff_med.is_some_and(|floor| deltas[i] < floor) {
            flags[i] = true;
        }
        if let (Some(floor), Some(gap)) = (config.min_diff_next, record.tuning_scores.gap()) {
            if gap < floor {
                flags[i] = true;
            }
        }
    }

    for (i, record) in records.iter_mut().enumerate() {
        record.delta = Some(deltas[i]);
        record.pruned = Some(flags[i]);
        record.degenerate_mad = degenerate[i];
    }

    info!(
        "Pruned {} of {} records (nmads = {}, {})",
        flags.iter().filter(|&&f| f).count(),
        records.len(),
        config.nmads,
        if config.per_label { "per label" } else { "global" }
    );
    Ok(flags)
}

fn describe(group: &str) -> String {
    if group.is_empty() {
        "the batch".to_string()
    } else {
        format!("label '{}'", group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TuningScores;
    use pretty_assertions::assert_eq;

    /// Record labelled `label` whose first-pass scores make its delta exactly `delta`.
    fn record(sample: &str, label: &str, delta: f64) -> PredictionRecord {
        let other = if label == "A" { "B" } else { "A" };
        let scores: BTreeMap<String, f64> = [
            (label.to_string(), delta),
            (other.to_string(), 0.0),
            ("Z".to_string(), 0.0),
        ]
        .into_iter()
        .collect();
        PredictionRecord {
            sample: sample.to_string(),
            first_label: label.to_string(),
            first_scores: scores.clone(),
            label: label.to_string(),
            scores,
            rounds: 1,
            tuning_scores: TuningScores { best: delta.max(0.0), next: Some(0.0) },
            fine_tune_capped: false,
            delta: None,
            pruned: None,
            degenerate_mad: false,
        }
    }

    fn batch() -> Vec<PredictionRecord> {
        [0.5, 0.52, 0.48, 0.51, 0.49, -0.5]
            .iter()
            .enumerate()
            .map(|(i, &d)| record(&format!("q{}", i), "A", d))
            .collect()
    }

    fn with_nmads(nmads: f64) -> PruneConfig {
        PruneConfig { nmads, ..PruneConfig::default() }
    }

    #[test]
    fn test_outlier_flagged_at_three_mads_not_at_hundred() {
        let mut records = batch();
        let flags = prune(&mut records, &with_nmads(3.0)).unwrap();
        assert_eq!(flags, vec![false, false, false, false, false, true]);
        assert_eq!(records[5].pruned, Some(true));
        assert_eq!(records[5].delta, Some(-0.5));
        assert_eq!(records[5].pruned_label(), None);

        let mut records = batch();
        let flags = prune(&mut records, &with_nmads(100.0)).unwrap();
        assert!(flags.iter().all(|f| !f));
    }

    #[test]
    fn test_larger_nmads_flags_a_subset() {
        let mut records: Vec<PredictionRecord> = [0.9, 0.1, 0.5, 0.55, 0.45, 0.6, -0.2, 0.3]
            .iter()
            .enumerate()
            .map(|(i, &d)| record(&format!("q{}", i), "A", d))
            .collect();
        let mut previous = prune(&mut records, &with_nmads(0.5)).unwrap();
        for nmads in [1.0, 2.0, 3.0, 10.0] {
            let flags = prune(&mut records, &with_nmads(nmads)).unwrap();
            for (now, before) in flags.iter().zip(&previous) {
                assert!(!now || *before);
            }
            previous = flags;
        }
    }

    #[test]
    fn test_single_record_group_is_degenerate() {
        let mut records = batch();
        records.push(record("lonely", "B", 0.01));
        prune(&mut records, &with_nmads(3.0)).unwrap();
        let lonely = records.last().unwrap();
        assert!(lonely.degenerate_mad);
        assert_eq!(lonely.pruned, Some(false));
        assert!(!records[0].degenerate_mad);
    }

    #[test]
    fn test_global_grouping() {
        let mut records = batch();
        records.push(record("b", "B", 0.5));
        let config = PruneConfig { per_label: false, ..PruneConfig::default() };
        let flags = prune(&mut records, &config).unwrap();
        assert_eq!(flags.iter().filter(|&&f| f).count(), 1);
        assert!(flags[5]);
    }

    #[test]
    fn test_floors_flag_independently() {
        let mut records = vec![record("q0", "A", 0.2), record("q1", "B", 0.05)];
        let config = PruneConfig { min_diff_med: Some(0.1), ..PruneConfig::default() };
        let flags = prune(&mut records, &config).unwrap();
        assert_eq!(flags, vec![false, true]);
        assert!(records.iter().all(|r| r.degenerate_mad));

        let mut records = vec![record("q0", "A", 0.2), record("q1", "B", 0.05)];
        let config = PruneConfig { min_diff_next: Some(0.1), ..PruneConfig::default() };
        assert_eq!(prune(&mut records, &config).unwrap(), vec![false, true]);
    }

    #[test]
    fn test_invalid_nmads() {
        let mut records = batch();
        assert!(prune(&mut records, &with_nmads(0.0)).unwrap_err().is_config());
        assert!(records.iter().all(|r| r.pruned.is_none()));
    }
}
