//! Classifier: runs the Scorer and Fine-Tuner over every query sample.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use ndarray::{ArrayView1, Axis};
use tracing::{debug, info};

use ferrocyte_common::{ClassifierConfig, ExpressionMatrix, FerrocyteError, LabelUniverse, Result};
use ferrocyte_markers::{resolve_markers, MarkerSpec, PairwiseMarkers};

use crate::fine_tune::FineTuner;
use crate::prune::prune;
use crate::record::PredictionRecord;
use crate::reference::ReferenceRepository;
use crate::scorer::Scorer;
use crate::training::{TrainingArtifact, TrainingBuilder};

/// Reference-based classifier holding a validated configuration.
///
/// Training and classification are separate steps; one
/// [`TrainingArtifact`] can serve any number of `classify` calls, including
/// concurrent ones.
#[derive(Debug, Clone)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    /// Fails with `Config` on any invalid setting.
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Resolve markers for `reference` without building an artifact.
    pub fn resolve_markers(
        &self,
        reference: &ExpressionMatrix,
        labels: &[String],
        spec: Option<&MarkerSpec>,
    ) -> Result<PairwiseMarkers> {
        let universe = LabelUniverse::from_labels(labels, reference.n_samples())?;
        resolve_markers(reference, &universe, spec, &self.config.markers)
    }

    /// Marker Resolver followed by the Training Builder.
    pub fn train(
        &self,
        reference: &ExpressionMatrix,
        labels: &[String],
        spec: Option<&MarkerSpec>,
    ) -> Result<TrainingArtifact> {
        let markers = self.resolve_markers(reference, labels, spec)?;
        TrainingBuilder::new(reference, labels)
            .acceleration(self.config.acceleration.clone())
            .build(&markers)
    }

    /// Train from a named dataset, using its curated markers if it has any.
    pub fn train_from_repository(&self, repository: &dyn ReferenceRepository, name: &str) -> Result<TrainingArtifact> {
        let dataset = repository.reference(name).ok_or_else(|| {
            FerrocyteError::data(format!(
                "reference '{}' not found (available: {})",
                name,
                repository.names().join(", ")
            ))
        })?;
        self.train(&dataset.matrix, &dataset.labels, dataset.markers.as_ref())
    }

    /// Classify every sample of `query`.
    ///
    /// Fails with `Data` if `query` lacks any marker feature of the artifact.
    pub fn classify(&self, query: &ExpressionMatrix, artifact: &TrainingArtifact) -> Result<Vec<PredictionRecord>> {
        self.classify_cancellable(query, artifact, &AtomicBool::new(false))
    }

    /// As [`Classifier::classify`], returning `Cancelled` as soon as `cancel`
    /// is observed set. Samples already finished are discarded.
    pub fn classify_cancellable(
        &self,
        query: &ExpressionMatrix,
        artifact: &TrainingArtifact,
        cancel: &AtomicBool,
    ) -> Result<Vec<PredictionRecord>> {
        let started = Instant::now();
        let positions = query.align_features(artifact.marker_features())?;
        let profiles = query.values().select(Axis(0), &positions);

        let scorer = Scorer::new(artifact, self.config.quantile)?;
        let tuner = FineTuner::new(scorer, &self.config.fine_tune);
        let all_labels = artifact.all_labels();
        let n = query.n_samples();

        info!(
            "Classifying {} query samples against {} labels over {} marker features",
            n,
            artifact.n_labels(),
            artifact.marker_features().len()
        );

        let classify_one = |j: usize| -> Result<PredictionRecord> {
            if cancel.load(Ordering::Relaxed) {
                return Err(FerrocyteError::Cancelled);
            }
            let profile = profiles.column(j);
            classify_sample(&scorer, &tuner, &all_labels, &query.samples()[j], profile)
        };
        let records = self.run_batch(n, classify_one)?;

        let capped = records.iter().filter(|r| r.fine_tune_capped).count();
        let changed = records.iter().filter(|r| r.label != r.first_label).count();
        info!(
            "Classified {} samples in {:.2?} ({} changed by fine-tuning, {} capped)",
            records.len(),
            started.elapsed(),
            changed,
            capped
        );
        Ok(records)
    }

    /// Marker Resolver → Training Builder → `classify`.
    pub fn train_and_classify(
        &self,
        reference: &ExpressionMatrix,
        labels: &[String],
        spec: Option<&MarkerSpec>,
        query: &ExpressionMatrix,
    ) -> Result<Vec<PredictionRecord>> {
        let artifact = self.train(reference, labels, spec)?;
        self.classify(query, &artifact)
    }

    /// Prune `records` with this classifier's pruning settings.
    pub fn prune(&self, records: &mut [PredictionRecord]) -> Result<Vec<bool>> {
        prune(records, &self.config.prune)
    }

    #[cfg(feature = "parallel")]
    fn run_batch<F>(&self, n: usize, classify_one: F) -> Result<Vec<PredictionRecord>>
    where
        F: Fn(usize) -> Result<PredictionRecord> + Sync + Send,
    {
        use rayon::prelude::*;

        let execution = &self.config.execution;
        if n < execution.parallel_threshold.max(1) {
            return (0..n).map(classify_one).collect();
        }
        if execution.num_threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(execution.num_threads)
                .build()
                .map_err(|e| FerrocyteError::config(format!("failed to build worker pool: {}", e)))?;
            debug!("Classifying on a dedicated pool of {} threads", execution.num_threads);
            return pool.install(|| (0..n).into_par_iter().map(&classify_one).collect());
        }
        (0..n).into_par_iter().map(classify_one).collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn run_batch<F>(&self, n: usize, classify_one: F) -> Result<Vec<PredictionRecord>>
    where
        F: Fn(usize) -> Result<PredictionRecord>,
    {
        debug!("Classifying {} samples sequentially", n);
        (0..n).map(classify_one).collect()
    }
}

fn classify_sample(
    scorer: &Scorer<'_>,
    tuner: &FineTuner<'_>,
    all_labels: &[usize],
    sample: &str,
    profile: ArrayView1<'_, f64>,
) -> Result<PredictionRecord> {
    let artifact = scorer.artifact();
    let first = scorer.score(profile, all_labels, artifact.all_markers())?;
    let outcome = tuner.run(profile, first.clone())?;
    Ok(PredictionRecord::new(sample, artifact.universe(), &first, &outcome))
}

/// Classify with default settings.
pub fn classify(query: &ExpressionMatrix, artifact: &TrainingArtifact) -> Result<Vec<PredictionRecord>> {
    Classifier::new(ClassifierConfig::default())?.classify(query, artifact)
}

/// Train and classify with default settings.
pub fn train_and_classify(
    reference: &ExpressionMatrix,
    labels: &[String],
    spec: Option<&MarkerSpec>,
    query: &ExpressionMatrix,
) -> Result<Vec<PredictionRecord>> {
    Classifier::new(ClassifierConfig::default())?.train_and_classify(reference, labels, spec, query)
}
