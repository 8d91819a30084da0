//! Classifier configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FerrocyteError, Result};

/// Complete configuration surface of the classification core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Quantile of each label's correlation distribution used as its score.
    #[serde(default = "default_quantile")]
    pub quantile: f64,

    #[serde(default)]
    pub fine_tune: FineTuneConfig,

    #[serde(default)]
    pub prune: PruneConfig,

    #[serde(default)]
    pub markers: MarkerConfig,

    #[serde(default)]
    pub acceleration: AccelerationConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,
}

fn default_quantile() -> f64 { 0.8 }

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            quantile: default_quantile(),
            fine_tune: FineTuneConfig::default(),
            prune: PruneConfig::default(),
            markers: MarkerConfig::default(),
            acceleration: AccelerationConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

impl ClassifierConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ClassifierConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Check every parameter; the first violation is returned as `Config`.
    pub fn validate(&self) -> Result<()> {
        validate_quantile(self.quantile)?;
        self.fine_tune.validate()?;
        self.prune.validate()?;
        self.markers.validate()?;
        self.acceleration.validate()?;
        Ok(())
    }
}

/// Quantile must lie in (0, 1].
pub fn validate_quantile(quantile: f64) -> Result<()> {
    if !(quantile > 0.0 && quantile <= 1.0) {
        return Err(FerrocyteError::config(format!(
            "quantile must be in (0, 1], got {}",
            quantile
        )));
    }
    Ok(())
}

// ── Fine-tuning ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FineTuneConfig {
    /// When false the first-pass label is final.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Labels scoring within this distance of the maximum stay in contention.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Maximum number of scoring rounds; `None` derives one from the label count.
    #[serde(default)]
    pub iteration_cap: Option<usize>,
}

fn default_true() -> bool { true }
fn default_tolerance() -> f64 { 0.05 }

impl Default for FineTuneConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tolerance: default_tolerance(),
            iteration_cap: None,
        }
    }
}

impl FineTuneConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(FerrocyteError::config(format!(
                "fine-tune tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if self.iteration_cap == Some(0) {
            return Err(FerrocyteError::config("fine-tune iteration cap must be at least 1"));
        }
        Ok(())
    }

    /// Round cap for a universe of `n_labels` labels.
    ///
    /// Every non-terminal round strictly shrinks the candidate set, so the
    /// label count is enough for a run that is never stuck.
    pub fn effective_cap(&self, n_labels: usize) -> usize {
        self.iteration_cap.unwrap_or_else(|| n_labels.max(1))
    }
}

// ── Pruning ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PruneConfig {
    /// Number of MADs below the group median at which a delta is an outlier.
    #[serde(default = "default_nmads")]
    pub nmads: f64,

    /// Compute thresholds per assigned label instead of over all records.
    #[serde(default = "default_true")]
    pub per_label: bool,

    /// Absolute floor on delta.
    #[serde(default)]
    pub min_diff_med: Option<f64>,

    /// Floor on the gap between the best and second-best final-round scores.
    #[serde(default)]
    pub min_diff_next: Option<f64>,
}

fn default_nmads() -> f64 { 3.0 }

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            nmads: default_nmads(),
            per_label: true,
            min_diff_med: None,
            min_diff_next: None,
        }
    }
}

impl PruneConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.nmads.is_finite() || self.nmads <= 0.0 {
            return Err(FerrocyteError::config(format!(
                "nmads must be positive, got {}",
                self.nmads
            )));
        }
        for (name, value) in [("min_diff_med", self.min_diff_med), ("min_diff_next", self.min_diff_next)] {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(FerrocyteError::config(format!("{} must be finite, got {}", name, v)));
                }
            }
        }
        Ok(())
    }
}

// ── Marker derivation ─────────────────────────────────────────────────────────

/// Statistic used to rank features in each pairwise label comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeMethod {
    /// Difference of per-label medians.
    #[default]
    Classic,
    /// Area under the curve of a Wilcoxon rank-sum comparison.
    Wilcoxon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerConfig {
    #[serde(default)]
    pub de_method: DeMethod,

    /// Number of "up" features kept per ordered label pair.
    #[serde(default = "default_de_n")]
    pub de_n: usize,
}

fn default_de_n() -> usize { 10 }

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            de_method: DeMethod::default(),
            de_n: default_de_n(),
        }
    }
}

impl MarkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.de_n == 0 {
            return Err(FerrocyteError::config("de_n must be at least 1"));
        }
        Ok(())
    }
}

// ── Acceleration ──────────────────────────────────────────────────────────────

/// Precomputed rank index over the full marker union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AccelerationConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Index only a seeded subset of each label's samples.
    #[serde(default)]
    pub approximate: Option<ApproximateSearch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproximateSearch {
    pub max_samples_per_label: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 { 42 }

impl AccelerationConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(approx) = &self.approximate {
            if !self.enabled {
                return Err(FerrocyteError::config(
                    "approximate search requires acceleration.enabled = true",
                ));
            }
            if approx.max_samples_per_label == 0 {
                return Err(FerrocyteError::config("max_samples_per_label must be at least 1"));
            }
        }
        Ok(())
    }

    pub fn is_exact(&self) -> bool {
        self.approximate.is_none()
    }
}

// ── Execution ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Batches smaller than this run sequentially.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,

    /// Worker threads; 0 uses the global rayon pool.
    #[serde(default)]
    pub num_threads: usize,
}

fn default_parallel_threshold() -> usize { 16 }

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: default_parallel_threshold(),
            num_threads: 0,
        }
    }
}
