//! End-to-end classification scenarios.

use std::collections::BTreeMap;

use approx::assert_abs_diff_eq;
use pretty_assertions::assert_eq;

use ferrocyte_common::{AccelerationConfig, ApproximateSearch, ExecutionConfig, FineTuneConfig};
use ferrocyte_engine::{classify, prune, train_and_classify, Classifier, ClassifierConfig, MarkerSpec};
use ferrocyte_test_utils::{jittered, matrix, strings, NearTie, SignatureDataset};

fn classifier(config: ClassifierConfig) -> Classifier {
    Classifier::new(config).unwrap()
}

// ── Disjoint markers ─────────────────────────────────────────────────────────

#[test]
fn test_disjoint_markers_assign_closest_label() {
    let features = ["g1", "g2", "g3", "g4"];
    let reference = jittered(
        &features,
        "ref",
        &[vec![8.0, 7.0, 1.0, 2.0], vec![1.0, 2.0, 8.0, 7.0]],
        &[10, 10],
        0.2,
        5,
    );
    let labels: Vec<String> = (0..20).map(|i| if i < 10 { "A" } else { "B" }.to_string()).collect();
    let spec = MarkerSpec::PerLabel(BTreeMap::from([
        ("A".to_string(), strings(&["g1", "g2"])),
        ("B".to_string(), strings(&["g3", "g4"])),
    ]));
    let query = matrix(&features, "q", vec![vec![9.0], vec![6.0], vec![0.5], vec![1.5]]);

    let mut records = train_and_classify(&reference, &labels, Some(&spec), &query).unwrap();
    let flags = prune(&mut records, &Default::default()).unwrap();

    let record = &records[0];
    assert_eq!(record.label, "A");
    assert_eq!(record.first_label, "A");
    assert_abs_diff_eq!(record.first_scores["A"], 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(record.first_scores["B"], -1.0, epsilon = 1e-9);
    assert!(record.delta.unwrap() > 0.0);
    assert_eq!(record.pruned, Some(false));
    assert_eq!(flags, vec![false]);
}

// ── Fine-tuning ──────────────────────────────────────────────────────────────

#[test]
fn test_near_tie_is_fine_tuned_over_several_rounds() {
    let (reference, labels) = NearTie::reference();
    let config = ClassifierConfig {
        fine_tune: FineTuneConfig { tolerance: 0.1, ..FineTuneConfig::default() },
        ..ClassifierConfig::default()
    };
    let records = classifier(config)
        .train_and_classify(&reference, &labels, Some(&NearTie::markers()), &NearTie::query())
        .unwrap();

    let record = &records[0];
    assert_eq!(record.label, "A");
    assert!(record.rounds >= 2);
    assert!(!record.fine_tune_capped);
    assert_eq!(record.scores.keys().cloned().collect::<Vec<_>>(), strings(&["A", "B"]));
    assert_eq!(record.first_scores.len(), 3);
    assert_eq!(record.tuning_scores.best, record.scores["A"]);
}

#[test]
fn test_identical_labels_break_ties_lexicographically() {
    let features = ["g1", "g2", "g3"];
    let reference = matrix(
        &features,
        "ref",
        vec![
            vec![1.0, 2.0, 1.0, 2.0],
            vec![3.0, 1.0, 3.0, 1.0],
            vec![2.0, 3.0, 2.0, 3.0],
        ],
    );
    let labels = strings(&["Y", "Y", "X", "X"]);
    let spec = MarkerSpec::Global(strings(&features));
    let query = matrix(&features, "q", vec![vec![1.0], vec![3.0], vec![2.0]]);

    let records = train_and_classify(&reference, &labels, Some(&spec), &query).unwrap();
    assert_eq!(records[0].first_label, "X");
    assert_eq!(records[0].label, "X");
    assert!(records[0].fine_tune_capped);
}

#[test]
fn test_single_label_universe_finishes_in_one_round() {
    let (reference, _) = SignatureDataset::new(&[("A", 6)]).reference();
    let labels = vec!["A".to_string(); 6];
    let spec = MarkerSpec::Global(strings(&["A_sig0", "A_sig1", "bg0", "bg1"]));
    let (query, _) = SignatureDataset::new(&[("A", 6)]).query(&[("A", 2)], 8);

    let records = train_and_classify(&reference, &labels, Some(&spec), &query).unwrap();
    for record in &records {
        assert_eq!(record.label, "A");
        assert_eq!(record.rounds, 1);
        assert!(!record.fine_tune_capped);
        assert_eq!(record.tuning_scores.next, None);
    }
}

// ── Reuse and determinism ────────────────────────────────────────────────────

fn signature_batch() -> (SignatureDataset, ferrocyte_common::ExpressionMatrix, Vec<String>) {
    let dataset = SignatureDataset::new(&[("alpha", 8), ("beta", 8), ("gamma", 8), ("delta", 8)]).with_seed(21);
    let (reference, labels) = dataset.reference();
    (dataset, reference, labels)
}

#[test]
fn test_artifact_reuse_matches_train_and_classify() {
    let (dataset, reference, labels) = signature_batch();
    let (first_query, truth) = dataset.query(&[("alpha", 3), ("delta", 3), ("beta", 3)], 100);
    let (second_query, _) = dataset.query(&[("gamma", 4)], 101);

    let classifier = classifier(ClassifierConfig::default());
    let artifact = classifier.train(&reference, &labels, None).unwrap();

    let reused = classify(&first_query, &artifact).unwrap();
    let direct = train_and_classify(&reference, &labels, None, &first_query).unwrap();
    assert_eq!(reused, direct);
    assert_eq!(reused.iter().map(|r| r.label.clone()).collect::<Vec<_>>(), truth);

    let again = classifier.classify(&second_query, &artifact).unwrap();
    assert!(again.iter().all(|r| r.label == "gamma"));
}

#[test]
fn test_exact_index_gives_identical_records() {
    let (dataset, reference, labels) = signature_batch();
    let (query, _) = dataset.query(&[("beta", 4), ("gamma", 4)], 7);

    let plain = classifier(ClassifierConfig::default())
        .train_and_classify(&reference, &labels, None, &query)
        .unwrap();
    let indexed_config = ClassifierConfig {
        acceleration: AccelerationConfig { enabled: true, approximate: None },
        ..ClassifierConfig::default()
    };
    let indexed = classifier(indexed_config)
        .train_and_classify(&reference, &labels, None, &query)
        .unwrap();
    assert_eq!(plain, indexed);
}

#[test]
fn test_approximate_index_is_deterministic() {
    let (dataset, reference, labels) = signature_batch();
    let (query, truth) = dataset.query(&[("alpha", 3), ("gamma", 3)], 9);
    let config = ClassifierConfig {
        acceleration: AccelerationConfig {
            enabled: true,
            approximate: Some(ApproximateSearch { max_samples_per_label: 3, seed: 5 }),
        },
        ..ClassifierConfig::default()
    };

    let a = classifier(config.clone()).train_and_classify(&reference, &labels, None, &query).unwrap();
    let b = classifier(config).train_and_classify(&reference, &labels, None, &query).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.iter().map(|r| r.label.clone()).collect::<Vec<_>>(), truth);
}

#[test]
fn test_parallel_and_sequential_agree() {
    let (dataset, reference, labels) = signature_batch();
    let (query, _) = dataset.query(&[("alpha", 10), ("beta", 10), ("gamma", 10), ("delta", 10)], 55);

    let sequential = ClassifierConfig {
        execution: ExecutionConfig { parallel_threshold: usize::MAX, num_threads: 0 },
        ..ClassifierConfig::default()
    };
    let pooled = ClassifierConfig {
        execution: ExecutionConfig { parallel_threshold: 1, num_threads: 3 },
        ..ClassifierConfig::default()
    };
    let a = classifier(sequential).train_and_classify(&reference, &labels, None, &query).unwrap();
    let b = classifier(pooled).train_and_classify(&reference, &labels, None, &query).unwrap();
    assert_eq!(a, b);
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[test]
fn test_query_missing_marker_feature_is_data_error() {
    let (dataset, reference, labels) = signature_batch();
    let artifact = classifier(ClassifierConfig::default()).train(&reference, &labels, None).unwrap();

    let (query, _) = dataset.query(&[("alpha", 2)], 3);
    let kept: Vec<usize> = (0..query.n_features())
        .filter(|&f| !artifact.marker_features().contains(&query.features()[f]) || f % 2 == 0)
        .collect();
    let partial = query.select_features(&kept);

    let err = classify(&partial, &artifact).unwrap_err();
    assert!(err.is_data());
}

#[test]
fn test_unknown_marker_feature_is_config_error() {
    let (_, reference, labels) = signature_batch();
    let spec = MarkerSpec::Global(strings(&["alpha_sig0", "no_such_gene"]));
    let err = classifier(ClassifierConfig::default())
        .train(&reference, &labels, Some(&spec))
        .unwrap_err();
    assert!(err.is_config());
}

// ── Pruning ──────────────────────────────────────────────────────────────────

#[test]
fn test_pruning_is_monotone_in_nmads() {
    let (dataset, reference, labels) = signature_batch();
    let (query, _) = dataset.with_noise(3.0).query(&[("alpha", 12), ("beta", 12)], 77);
    let classifier = classifier(ClassifierConfig::default());
    let records = classifier.train_and_classify(&reference, &labels, None, &query).unwrap();

    let mut previous: Option<Vec<bool>> = None;
    for nmads in [0.5, 1.0, 2.0, 3.0, 5.0] {
        let mut batch = records.clone();
        let config = ferrocyte_common::PruneConfig { nmads, ..Default::default() };
        let flags = prune(&mut batch, &config).unwrap();
        if let Some(before) = &previous {
            for (now, then) in flags.iter().zip(before) {
                assert!(!now || *then);
            }
        }
        previous = Some(flags);
    }
}

#[test]
fn test_fine_tuned_near_tie_has_smaller_delta_than_clear_matches() {
    let (reference, labels) = NearTie::reference();
    let config = ClassifierConfig {
        fine_tune: FineTuneConfig { tolerance: 0.1, ..FineTuneConfig::default() },
        ..ClassifierConfig::default()
    };
    let columns = vec![
        vec![7.0, 6.0, 3.0, 2.0, 9.0, 8.0, 1.0, 0.0],
        vec![7.5, 6.5, 3.0, 2.0, 9.0, 8.0, 1.0, 0.5],
        vec![8.0, 6.0, 3.5, 2.0, 9.5, 8.0, 1.0, 0.0],
        NearTie::query_profile().to_vec(),
    ];
    let rows = (0..NearTie::FEATURES.len())
        .map(|f| columns.iter().map(|column| column[f]).collect())
        .collect();
    let query = matrix(&NearTie::FEATURES, "q", rows);

    let classifier = classifier(config);
    let mut records = classifier
        .train_and_classify(&reference, &labels, Some(&NearTie::markers()), &query)
        .unwrap();
    let flags = classifier.prune(&mut records).unwrap();

    assert!(records.iter().all(|r| r.label == "A"));
    let (clear, near_tie) = records.split_at(3);
    let near_tie = &near_tie[0];
    assert!(clear.iter().all(|r| r.rounds == 1 && r.scores.len() == 3));
    assert_eq!(near_tie.rounds, 2);
    assert_eq!(near_tie.scores.len(), 2);

    // first-pass A minus first-pass B, which is the first-pass median
    let near_tie_delta = near_tie.delta.unwrap();
    assert_abs_diff_eq!(near_tie_delta, near_tie.first_scores["A"] - near_tie.first_scores["B"], epsilon = 1e-12);
    assert!(near_tie_delta < 0.1);
    for record in clear {
        assert!(near_tie_delta < record.delta.unwrap());
    }
    assert_eq!(flags, vec![false, false, false, true]);
}
