//! Dense expression matrix indexed by (feature, sample).
//!
//! Values are assumed to already be on a comparable (log) scale; no
//! normalisation happens here.

use std::collections::HashMap;

use ndarray::{Array2, ArrayView1, Axis};

use crate::error::{FerrocyteError, Result};

/// Numeric matrix with named rows (features) and columns (samples).
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionMatrix {
    features: Vec<String>,
    samples: Vec<String>,
    /// features × samples
    values: Array2<f64>,
    feature_index: HashMap<String, usize>,
}

impl ExpressionMatrix {
    /// Build a matrix from a features × samples array.
    ///
    /// Fails with `Data` if the shape disagrees with the id vectors, a feature
    /// id is duplicated, or any value is non-finite.
    pub fn new(features: Vec<String>, samples: Vec<String>, values: Array2<f64>) -> Result<Self> {
        let (n_rows, n_cols) = values.dim();
        if n_rows != features.len() || n_cols != samples.len() {
            return Err(FerrocyteError::data(format!(
                "matrix shape {}x{} does not match {} features and {} samples",
                n_rows,
                n_cols,
                features.len(),
                samples.len()
            )));
        }

        let mut feature_index = HashMap::with_capacity(features.len());
        for (i, f) in features.iter().enumerate() {
            if feature_index.insert(f.clone(), i).is_some() {
                return Err(FerrocyteError::data(format!("duplicate feature id '{}'", f)));
            }
        }

        if let Some(((r, c), v)) = values.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(FerrocyteError::data(format!(
                "non-finite value {} at feature '{}', sample '{}'",
                v, features[r], samples[c]
            )));
        }

        Ok(Self { features, samples, values, feature_index })
    }

    /// Build a matrix from row-major feature rows.
    pub fn from_rows(features: Vec<String>, samples: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_cols = samples.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_cols) {
            return Err(FerrocyteError::data(format!(
                "row {} has {} values, expected {}",
                i,
                row.len(),
                n_cols
            )));
        }
        let n_rows = rows.len();
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let values = Array2::from_shape_vec((n_rows, n_cols), flat)
            .map_err(|e| FerrocyteError::data(e.to_string()))?;
        Self::new(features, samples, values)
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Row position of a feature id.
    pub fn feature_position(&self, feature: &str) -> Option<usize> {
        self.feature_index.get(feature).copied()
    }

    /// Profile of one sample across all features.
    pub fn column(&self, sample: usize) -> ArrayView1<'_, f64> {
        self.values.column(sample)
    }

    /// Values of one feature across all samples.
    pub fn row(&self, feature: usize) -> ArrayView1<'_, f64> {
        self.values.row(feature)
    }

    /// New matrix holding only the given feature rows, in the given order.
    pub fn select_features(&self, rows: &[usize]) -> Self {
        let features: Vec<String> = rows.iter().map(|&r| self.features[r].clone()).collect();
        let feature_index = features
            .iter()
            .enumerate()
            .map(|(i, f)| (f.clone(), i))
            .collect();
        Self {
            features,
            samples: self.samples.clone(),
            values: self.values.select(Axis(0), rows),
            feature_index,
        }
    }

    /// Row positions of `wanted` in this matrix.
    ///
    /// Fails with `Data` listing (up to five of) the missing feature ids.
    pub fn align_features(&self, wanted: &[String]) -> Result<Vec<usize>> {
        let mut positions = Vec::with_capacity(wanted.len());
        let mut missing = Vec::new();
        for f in wanted {
            match self.feature_position(f) {
                Some(p) => positions.push(p),
                None => missing.push(f.as_str()),
            }
        }
        if !missing.is_empty() {
            let shown: Vec<&str> = missing.iter().take(5).copied().collect();
            return Err(FerrocyteError::data(format!(
                "{} required feature(s) absent from matrix: {}{}",
                missing.len(),
                shown.join(", "),
                if missing.len() > shown.len() { ", ..." } else { "" }
            )));
        }
        Ok(positions)
    }
}
