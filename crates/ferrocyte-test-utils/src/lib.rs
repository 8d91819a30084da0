//! Synthetic reference and query datasets for Ferrocyte tests.
//!
//! Every generator is seeded, so fixtures are identical across runs.

use std::collections::BTreeMap;

use ndarray::{array, Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ferrocyte_common::ExpressionMatrix;
use ferrocyte_markers::MarkerSpec;

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Matrix from literal rows with samples named `{prefix}0..`.
pub fn matrix(features: &[&str], prefix: &str, rows: Vec<Vec<f64>>) -> ExpressionMatrix {
    let n_samples = rows.first().map(|r| r.len()).unwrap_or(0);
    let samples = (0..n_samples).map(|i| format!("{}{}", prefix, i)).collect();
    ExpressionMatrix::from_rows(strings(features), samples, rows).expect("valid fixture matrix")
}

/// Matrix whose samples are `templates` repeated with small uniform jitter.
///
/// Each template is a full feature profile; `copies[i]` samples are drawn
/// from `templates[i]`. Jitter is below `±amplitude`, so as long as template
/// values are spaced further apart than `2 · amplitude` every copy has the
/// same feature ranks as its template.
pub fn jittered(
    features: &[&str],
    prefix: &str,
    templates: &[Vec<f64>],
    copies: &[usize],
    amplitude: f64,
    seed: u64,
) -> ExpressionMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut columns: Vec<Vec<f64>> = Vec::new();
    for (template, &n) in templates.iter().zip(copies) {
        for _ in 0..n {
            columns.push(
                template
                    .iter()
                    .map(|v| v + jitter(&mut rng, amplitude))
                    .collect(),
            );
        }
    }
    from_columns(features, prefix, columns)
}

fn jitter(rng: &mut StdRng, amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        rng.gen_range(-amplitude..amplitude)
    } else {
        0.0
    }
}

fn from_columns(features: &[&str], prefix: &str, columns: Vec<Vec<f64>>) -> ExpressionMatrix {
    let n_cols = columns.len();
    let values = Array2::from_shape_fn((features.len(), n_cols), |(f, s)| columns[s][f]);
    let samples = (0..n_cols).map(|i| format!("{}{}", prefix, i)).collect();
    ExpressionMatrix::new(strings(features), samples, values).expect("valid fixture matrix")
}

/// Reference with one block of signature features per label plus shared
/// background features.
///
/// Signature features of a label sit near `high` in that label's samples and
/// near `low` elsewhere; background features are uniform noise in between.
#[derive(Debug, Clone)]
pub struct SignatureDataset {
    pub labels: Vec<(String, usize)>,
    pub signature_size: usize,
    pub background: usize,
    pub high: f64,
    pub low: f64,
    pub noise: f64,
    pub seed: u64,
}

impl SignatureDataset {
    pub fn new(labels: &[(&str, usize)]) -> Self {
        Self {
            labels: labels.iter().map(|(l, n)| (l.to_string(), *n)).collect(),
            signature_size: 5,
            background: 10,
            high: 8.0,
            low: 1.0,
            noise: 1.0,
            seed: 7,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    pub fn features(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (label, _) in &self.labels {
            for j in 0..self.signature_size {
                out.push(format!("{}_sig{}", label, j));
            }
        }
        for j in 0..self.background {
            out.push(format!("bg{}", j));
        }
        out
    }

    /// Reference matrix and its label vector.
    pub fn reference(&self) -> (ExpressionMatrix, Vec<String>) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut columns = Vec::new();
        let mut labels = Vec::new();
        for (idx, (label, n)) in self.labels.iter().enumerate() {
            for _ in 0..*n {
                columns.push(self.profile(idx, &mut rng));
                labels.push(label.clone());
            }
        }
        (self.assemble("ref", columns), labels)
    }

    /// `n` query samples drawn from each named label, with the true labels.
    pub fn query(&self, per_label: &[(&str, usize)], seed: u64) -> (ExpressionMatrix, Vec<String>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut columns = Vec::new();
        let mut truth = Vec::new();
        for (label, n) in per_label {
            let idx = self
                .labels
                .iter()
                .position(|(l, _)| l == label)
                .expect("query label must exist in the dataset");
            for _ in 0..*n {
                columns.push(self.profile(idx, &mut rng));
                truth.push(label.to_string());
            }
        }
        (self.assemble("q", columns), truth)
    }

    fn profile(&self, label_idx: usize, rng: &mut StdRng) -> Vec<f64> {
        let mut values = Vec::new();
        for idx in 0..self.labels.len() {
            let base = if idx == label_idx { self.high } else { self.low };
            for _ in 0..self.signature_size {
                values.push(base + jitter(rng, self.noise));
            }
        }
        let mid = (self.high + self.low) / 2.0;
        for _ in 0..self.background {
            values.push(mid + jitter(rng, self.noise));
        }
        values
    }

    fn assemble(&self, prefix: &str, columns: Vec<Vec<f64>>) -> ExpressionMatrix {
        let features = self.features();
        let names: Vec<&str> = features.iter().map(String::as_str).collect();
        from_columns(&names, prefix, columns)
    }
}

/// Three labels where A and B share strong "stem" markers and differ only on
/// a small block each, so a query near both scores them within 0.1 of each
/// other over the full marker set and separates them once restricted to
/// the A/B markers.
///
/// Features: `a1 a2 b1 b2 s1 s2 c1 c2`. Two reference samples per label.
pub struct NearTie;

impl NearTie {
    pub const FEATURES: [&'static str; 8] = ["a1", "a2", "b1", "b2", "s1", "s2", "c1", "c2"];

    pub fn reference() -> (ExpressionMatrix, Vec<String>) {
        let templates = [
            vec![7.0, 6.0, 3.0, 2.0, 9.0, 8.0, 1.0, 0.0],
            vec![3.0, 2.0, 7.0, 6.0, 9.0, 8.0, 1.0, 0.0],
            vec![2.0, 1.0, 2.5, 1.5, 3.0, 3.5, 9.0, 8.0],
        ];
        let offsets = [0.1, 0.3, 0.2, 0.4, 0.15, 0.35, 0.25, 0.05];
        let mut columns = Vec::new();
        for template in &templates {
            columns.push(template.clone());
            columns.push(template.iter().zip(offsets).map(|(v, o)| v + o).collect());
        }
        let labels = strings(&["A", "A", "B", "B", "C", "C"]);
        (from_columns(&Self::FEATURES, "ref", columns), labels)
    }

    pub fn markers() -> MarkerSpec {
        let mut table = BTreeMap::new();
        table.insert("A".to_string(), pairs(&[("B", &["a1", "a2"][..]), ("C", &["s1", "s2", "a1"][..])]));
        table.insert("B".to_string(), pairs(&[("A", &["b1", "b2"][..]), ("C", &["s1", "s2", "b1"][..])]));
        table.insert("C".to_string(), pairs(&[("A", &["c1", "c2"][..]), ("B", &["c1", "c2"][..])]));
        MarkerSpec::Pairwise(table)
    }

    /// Query profile in [`NearTie::FEATURES`] order.
    pub fn query_profile() -> Array1<f64> {
        array![6.0, 5.8, 5.9, 5.7, 10.0, 9.0, 1.0, 0.5]
    }

    pub fn query() -> ExpressionMatrix {
        let profile = Self::query_profile();
        from_columns(&Self::FEATURES, "q", vec![profile.to_vec()])
    }
}

fn pairs(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    entries.iter().map(|(down, f)| (down.to_string(), strings(f))).collect()
}
