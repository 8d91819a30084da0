use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Caller-supplied marker features.
///
/// Pairwise is the most informative shape: `Pairwise[up][down]` holds features
/// expressed higher in `up` than in `down`. The other two shapes are expanded
/// into pairwise form by reusing each label's full set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "markers", rename_all = "snake_case")]
pub enum MarkerSpec {
    Global(Vec<String>),
    PerLabel(BTreeMap<String, Vec<String>>),
    Pairwise(BTreeMap<String, BTreeMap<String, Vec<String>>>),
}

impl MarkerSpec {
    /// Every feature id mentioned anywhere in the specification.
    pub fn features(&self) -> Vec<&str> {
        let mut out: Vec<&str> = match self {
            MarkerSpec::Global(set) => set.iter().map(String::as_str).collect(),
            MarkerSpec::PerLabel(map) => map.values().flatten().map(String::as_str).collect(),
            MarkerSpec::Pairwise(map) => map
                .values()
                .flat_map(|inner| inner.values().flatten())
                .map(String::as_str)
                .collect(),
        };
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Every label named by the specification (empty for `Global`).
    pub fn labels(&self) -> Vec<&str> {
        let mut out: Vec<&str> = match self {
            MarkerSpec::Global(_) => vec![],
            MarkerSpec::PerLabel(map) => map.keys().map(String::as_str).collect(),
            MarkerSpec::Pairwise(map) => map
                .iter()
                .flat_map(|(up, inner)| std::iter::once(up.as_str()).chain(inner.keys().map(String::as_str)))
                .collect(),
        };
        out.sort_unstable();
        out.dedup();
        out
    }
}
