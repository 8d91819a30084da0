//! Training Builder: reference + labels + markers → immutable artifact.

use tracing::info;

use ferrocyte_common::{AccelerationConfig, ExpressionMatrix, FerrocyteError, LabelUniverse, Result};
use ferrocyte_markers::PairwiseMarkers;

use crate::index::RankIndex;

/// Everything needed to classify query samples against one reference.
///
/// Built once and read-only afterwards; share it across threads or calls
/// behind an `Arc`.
#[derive(Debug, Clone)]
pub struct TrainingArtifact {
    /// Reference restricted to the union of all markers.
    reference: ExpressionMatrix,
    universe: LabelUniverse,
    /// Pairwise markers as row indices into `reference`.
    markers: PairwiseMarkers,
    all_markers: Vec<usize>,
    index: Option<RankIndex>,
}

impl TrainingArtifact {
    pub fn reference(&self) -> &ExpressionMatrix {
        &self.reference
    }

    pub fn universe(&self) -> &LabelUniverse {
        &self.universe
    }

    pub fn markers(&self) -> &PairwiseMarkers {
        &self.markers
    }

    /// Feature ids a query must provide.
    pub fn marker_features(&self) -> &[String] {
        self.reference.features()
    }

    /// Row indices of every marker (the whole restricted reference).
    pub fn all_markers(&self) -> &[usize] {
        &self.all_markers
    }

    pub fn index(&self) -> Option<&RankIndex> {
        self.index.as_ref()
    }

    pub fn n_labels(&self) -> usize {
        self.universe.len()
    }

    pub fn all_labels(&self) -> Vec<usize> {
        (0..self.universe.len()).collect()
    }
}

/// Builds a [`TrainingArtifact`].
pub struct TrainingBuilder<'a> {
    reference: &'a ExpressionMatrix,
    labels: &'a [String],
    acceleration: AccelerationConfig,
}

impl<'a> TrainingBuilder<'a> {
    pub fn new(reference: &'a ExpressionMatrix, labels: &'a [String]) -> Self {
        Self {
            reference,
            labels,
            acceleration: AccelerationConfig::default(),
        }
    }

    pub fn acceleration(mut self, config: AccelerationConfig) -> Self {
        self.acceleration = config;
        self
    }

    /// Build the artifact for `markers`, which must index rows of the
    /// builder's reference.
    ///
    /// Fails with `Data` on a label-vector length mismatch, a marker label
    /// without reference samples, or a marker feature that is constant
    /// across every sample of the labels using it. Fails with `Config` on
    /// invalid acceleration parameters or markers that do not fit the
    /// reference.
    pub fn build(self, markers: &PairwiseMarkers) -> Result<TrainingArtifact> {
        self.acceleration.validate()?;
        let universe = LabelUniverse::from_labels(self.labels, self.reference.n_samples())?;
        check_label_alignment(&universe, markers)?;

        let union = markers.union_all();
        if union.is_empty() {
            return Err(FerrocyteError::config("marker table is empty"));
        }
        if let Some(&bad) = union.iter().find(|&&f| f >= self.reference.n_features()) {
            return Err(FerrocyteError::config(format!(
                "marker row {} is outside the reference ({} features)",
                bad,
                self.reference.n_features()
            )));
        }

        let restricted = self.reference.select_features(&union);
        let remapped = markers.remap(|f| union.binary_search(&f).unwrap_or_default());
        check_degenerate_rows(&restricted, &universe, &remapped)?;

        let index = self
            .acceleration
            .enabled
            .then(|| RankIndex::build(&restricted, &universe, &self.acceleration));

        info!(
            "Training artifact ready: {} labels, {} reference samples, {} of {} features kept as markers{}",
            universe.len(),
            restricted.n_samples(),
            restricted.n_features(),
            self.reference.n_features(),
            match &index {
                Some(i) if i.is_exact() => ", exact rank index",
                Some(_) => ", approximate rank index",
                None => "",
            }
        );

        Ok(TrainingArtifact {
            all_markers: (0..restricted.n_features()).collect(),
            reference: restricted,
            universe,
            markers: remapped,
            index,
        })
    }
}

fn check_label_alignment(universe: &LabelUniverse, markers: &PairwiseMarkers) -> Result<()> {
    for label in markers.labels() {
        if universe.position(label).is_none() {
            return Err(FerrocyteError::data(format!(
                "label '{}' has zero reference samples",
                label
            )));
        }
    }
    for label in universe.labels() {
        if !markers.labels().contains(label) {
            return Err(FerrocyteError::config(format!("label '{}' has no marker table entry", label)));
        }
    }
    Ok(())
}

/// A marker row that takes a single value across every sample of every
/// label using it carries no rank information for any comparison.
fn check_degenerate_rows(reference: &ExpressionMatrix, universe: &LabelUniverse, markers: &PairwiseMarkers) -> Result<()> {
    let k = universe.len();
    let mut users: Vec<Vec<usize>> = vec![Vec::new(); reference.n_features()];
    for label in 0..k {
        for f in markers.label_markers(label) {
            users[f].push(label);
        }
    }

    for (f, labels) in users.iter().enumerate() {
        let row = reference.row(f);
        let mut values = labels
            .iter()
            .flat_map(|&l| universe.members(l).iter())
            .map(|&s| row[s]);
        let Some(first) = values.next() else { continue };
        if values.all(|v| v == first) {
            let names: Vec<&str> = labels.iter().map(|&l| universe.name(l)).collect();
            return Err(FerrocyteError::data(format!(
                "marker feature '{}' is constant ({}) across all samples of {}",
                reference.features()[f],
                first,
                names.join(", ")
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrocyte_common::{ApproximateSearch, MarkerConfig};
    use ferrocyte_markers::{resolve_markers, MarkerSpec};
    use ferrocyte_test_utils::{matrix, strings, SignatureDataset};
    use pretty_assertions::assert_eq;

    fn resolved(reference: &ExpressionMatrix, labels: &[String], spec: Option<&MarkerSpec>) -> PairwiseMarkers {
        let universe = LabelUniverse::from_labels(labels, reference.n_samples()).unwrap();
        resolve_markers(reference, &universe, spec, &MarkerConfig::default()).unwrap()
    }

    #[test]
    fn test_reference_restricted_to_marker_union() {
        let reference = matrix(
            &["g1", "g2", "g3", "unused"],
            "s",
            vec![
                vec![5.0, 6.0, 0.0, 1.0],
                vec![1.0, 0.5, 6.0, 5.0],
                vec![2.0, 3.0, 2.5, 2.2],
                vec![7.0, 7.0, 7.0, 7.0],
            ],
        );
        let labels = strings(&["A", "A", "B", "B"]);
        let spec = MarkerSpec::Global(strings(&["g3", "g1", "g2"]));
        let markers = resolved(&reference, &labels, Some(&spec));

        let artifact = TrainingBuilder::new(&reference, &labels).build(&markers).unwrap();
        assert_eq!(artifact.marker_features(), &strings(&["g1", "g2", "g3"])[..]);
        assert_eq!(artifact.all_markers(), &[0, 1, 2]);
        assert_eq!(artifact.markers().get(0, 1), &[0, 1, 2]);
        assert!(artifact.index().is_none());
    }

    #[test]
    fn test_label_length_mismatch() {
        let reference = matrix(&["g1"], "s", vec![vec![1.0, 2.0, 3.0]]);
        let good = strings(&["A", "B", "B"]);
        let markers = resolved(&reference, &good, Some(&MarkerSpec::Global(strings(&["g1"]))));
        let err = TrainingBuilder::new(&reference, &strings(&["A", "B"])).build(&markers).unwrap_err();
        assert!(err.is_data());
    }

    #[test]
    fn test_marker_label_without_samples() {
        let reference = matrix(&["g1", "g2"], "s", vec![vec![1.0, 2.0, 3.0], vec![3.0, 1.0, 2.0]]);
        let with_c = strings(&["A", "B", "C"]);
        let markers = resolved(&reference, &with_c, Some(&MarkerSpec::Global(strings(&["g1", "g2"]))));
        let err = TrainingBuilder::new(&reference, &strings(&["A", "B", "B"]))
            .build(&markers)
            .unwrap_err();
        assert!(err.is_data());
        assert!(err.to_string().contains("'C'"));
    }

    #[test]
    fn test_constant_marker_row_is_data_error() {
        let reference = matrix(
            &["g1", "flat"],
            "s",
            vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 5.0, 5.0, 5.0]],
        );
        let labels = strings(&["A", "A", "B", "B"]);
        let markers = resolved(&reference, &labels, Some(&MarkerSpec::Global(strings(&["g1", "flat"]))));
        let err = TrainingBuilder::new(&reference, &labels).build(&markers).unwrap_err();
        assert!(err.is_data());
        assert!(err.to_string().contains("flat"));
    }

    #[test]
    fn test_invalid_acceleration_rejected_at_build() {
        let (reference, labels) = SignatureDataset::new(&[("A", 4), ("B", 4)]).reference();
        let markers = resolved(&reference, &labels, None);
        let config = AccelerationConfig {
            enabled: true,
            approximate: Some(ApproximateSearch { max_samples_per_label: 0, seed: 1 }),
        };
        let err = TrainingBuilder::new(&reference, &labels)
            .acceleration(config)
            .build(&markers)
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_index_built_when_enabled() {
        let (reference, labels) = SignatureDataset::new(&[("A", 4), ("B", 4)]).reference();
        let markers = resolved(&reference, &labels, None);
        let artifact = TrainingBuilder::new(&reference, &labels)
            .acceleration(AccelerationConfig { enabled: true, approximate: None })
            .build(&markers)
            .unwrap();
        let index = artifact.index().unwrap();
        assert_eq!(index.indexed_samples(), 8);
        assert_eq!(index.label_vectors(0).ncols(), artifact.marker_features().len());
    }
}
