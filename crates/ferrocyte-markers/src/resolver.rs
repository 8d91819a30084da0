//! Marker Resolver: any marker input shape → canonical [`PairwiseMarkers`].

use tracing::info;

use ferrocyte_common::{ExpressionMatrix, FerrocyteError, LabelUniverse, MarkerConfig, Result};

use crate::de::derive_pairwise_markers;
use crate::pairwise::PairwiseMarkers;
use crate::spec::MarkerSpec;

/// Resolve markers against `reference`.
///
/// With no specification, markers are derived by pairwise differential
/// comparison. Global and per-label specifications are expanded so that every
/// pair involving a label reuses that label's full set.
///
/// Fails with `Config` when a marker feature is absent from the reference, a
/// specification names a label the reference does not have, or a label ends
/// up with no markers.
pub fn resolve_markers(
    reference: &ExpressionMatrix,
    universe: &LabelUniverse,
    spec: Option<&MarkerSpec>,
    config: &MarkerConfig,
) -> Result<PairwiseMarkers> {
    config.validate()?;

    let table = match spec {
        None => derive_pairwise_markers(reference, universe, config),
        Some(spec) => {
            check_labels(spec, universe)?;
            expand(spec, reference, universe)?
        }
    };

    for label in 0..universe.len() {
        if table.label_markers(label).is_empty() {
            return Err(FerrocyteError::config(format!(
                "label '{}' has no marker features after resolution",
                universe.name(label)
            )));
        }
    }

    if spec.is_some() {
        info!(
            "Resolved supplied markers: {} labels, {} distinct features",
            universe.len(),
            table.union_all().len()
        );
    }
    Ok(table)
}

fn check_labels(spec: &MarkerSpec, universe: &LabelUniverse) -> Result<()> {
    let unknown: Vec<&str> = spec
        .labels()
        .into_iter()
        .filter(|l| universe.position(l).is_none())
        .collect();
    if !unknown.is_empty() {
        return Err(FerrocyteError::config(format!(
            "marker specification names label(s) absent from the reference: {}",
            unknown.join(", ")
        )));
    }
    Ok(())
}

fn feature_rows(reference: &ExpressionMatrix, features: &[String]) -> Result<Vec<usize>> {
    features
        .iter()
        .map(|f| {
            reference.feature_position(f).ok_or_else(|| {
                FerrocyteError::config(format!("marker feature '{}' is absent from the reference", f))
            })
        })
        .collect()
}

fn expand(spec: &MarkerSpec, reference: &ExpressionMatrix, universe: &LabelUniverse) -> Result<PairwiseMarkers> {
    let k = universe.len();
    let mut slots: Vec<Vec<usize>> = vec![Vec::new(); k * k];

    match spec {
        MarkerSpec::Global(features) => {
            let rows = feature_rows(reference, features)?;
            slots.iter_mut().for_each(|slot| *slot = rows.clone());
        }
        MarkerSpec::PerLabel(map) => {
            for (label, features) in map {
                let up = label_position(universe, label)?;
                let rows = feature_rows(reference, features)?;
                for down in 0..k {
                    slots[up * k + down] = rows.clone();
                }
            }
        }
        MarkerSpec::Pairwise(map) => {
            for (up_label, inner) in map {
                let up = label_position(universe, up_label)?;
                for (down_label, features) in inner {
                    let down = label_position(universe, down_label)?;
                    slots[up * k + down] = feature_rows(reference, features)?;
                }
            }
        }
    }

    Ok(PairwiseMarkers::from_slots(universe.labels().to_vec(), slots))
}

fn label_position(universe: &LabelUniverse, label: &str) -> Result<usize> {
    universe
        .position(label)
        .ok_or_else(|| FerrocyteError::config(format!("unknown label '{}'", label)))
}
