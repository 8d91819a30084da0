use std::collections::BTreeMap;

use crate::spec::MarkerSpec;

/// Canonical marker table: one feature set per ordered label pair.
///
/// `get(up, down)` returns row indices (into the feature space the table was
/// resolved against) of features higher in `up` than in `down`. Sets are
/// sorted and duplicate-free. The diagonal is only populated when markers
/// were supplied as global or per-label sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairwiseMarkers {
    labels: Vec<String>,
    slots: Vec<Vec<usize>>,
}

impl PairwiseMarkers {
    /// Build from a row-major `labels.len()²` slot table.
    pub(crate) fn from_slots(labels: Vec<String>, mut slots: Vec<Vec<usize>>) -> Self {
        debug_assert_eq!(slots.len(), labels.len() * labels.len());
        for slot in &mut slots {
            slot.sort_unstable();
            slot.dedup();
        }
        Self { labels, slots }
    }

    pub fn n_labels(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn get(&self, up: usize, down: usize) -> &[usize] {
        &self.slots[up * self.labels.len() + down]
    }

    /// Union of every slot where `label` is the "up" side.
    pub fn label_markers(&self, label: usize) -> Vec<usize> {
        let k = self.labels.len();
        merge(self.slots[label * k..(label + 1) * k].iter())
    }

    /// Union of all slots.
    pub fn union_all(&self) -> Vec<usize> {
        merge(self.slots.iter())
    }

    /// Union of the slots of every ordered pair drawn from `labels`.
    pub fn union_among(&self, labels: &[usize]) -> Vec<usize> {
        let k = self.labels.len();
        merge(
            labels
                .iter()
                .flat_map(|&a| labels.iter().map(move |&b| a * k + b))
                .map(|i| &self.slots[i]),
        )
    }

    /// Translate feature indices into another feature space.
    pub fn remap(&self, map: impl Fn(usize) -> usize) -> Self {
        let slots = self
            .slots
            .iter()
            .map(|slot| slot.iter().map(|&f| map(f)).collect())
            .collect();
        Self::from_slots(self.labels.clone(), slots)
    }

    /// Export as a pairwise [`MarkerSpec`] using `features` for names.
    ///
    /// Empty slots are omitted.
    pub fn to_spec(&self, features: &[String]) -> MarkerSpec {
        let k = self.labels.len();
        let mut out: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
        for up in 0..k {
            for down in 0..k {
                let slot = self.get(up, down);
                if slot.is_empty() {
                    continue;
                }
                out.entry(self.labels[up].clone())
                    .or_default()
                    .insert(self.labels[down].clone(), slot.iter().map(|&f| features[f].clone()).collect());
            }
        }
        MarkerSpec::Pairwise(out)
    }
}

fn merge<'a>(slots: impl Iterator<Item = &'a Vec<usize>>) -> Vec<usize> {
    let mut out: Vec<usize> = slots.flatten().copied().collect();
    out.sort_unstable();
    out.dedup();
    out
}
