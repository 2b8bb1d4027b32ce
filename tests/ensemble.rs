mod support;

use ndarray::array;
use phonation::ml::{
    Classifier, ClassifierError, HyperParams, ModelKind, ModelStore, ParamValue, hyperparams,
};
use support::voice_data::{centre_row, separable_dataset};
use tempfile::tempdir;

fn small_forest() -> Classifier {
    Classifier::random_forest(&hyperparams([
        ("n_estimators", ParamValue::Int(15)),
        ("random_state", ParamValue::Int(3)),
    ]))
}

fn small_boost() -> Classifier {
    Classifier::ada_boost(&hyperparams([("n_estimators", ParamValue::Int(15))]))
}

fn ensemble() -> Classifier {
    Classifier::soft_voting(vec![
        Classifier::svm(&HyperParams::new()),
        small_forest(),
        small_boost(),
    ])
    .unwrap()
}

#[test]
fn every_kind_cross_validates_well_on_separable_data() {
    let (x, y) = separable_dataset(30, 11);
    for classifier in [
        Classifier::svm(&HyperParams::new()),
        small_forest(),
        small_boost(),
        ensemble(),
    ] {
        let score = classifier.cross_validate(x.view(), y.view(), 5).unwrap();
        assert!(score > 0.7, "{} cross-validation accuracy {score}", classifier.kind());
        assert!(!classifier.is_fitted());
    }
}

#[test]
fn predict_requires_training_and_yields_binary_labels() {
    let (x, y) = separable_dataset(20, 5);
    let mut classifier = small_forest();
    assert!(matches!(
        classifier.predict(x.view()),
        Err(ClassifierError::NotFitted {
            kind: ModelKind::RandomForest
        })
    ));

    classifier.train(x.view(), y.view()).unwrap();
    let labels = classifier.predict(x.view()).unwrap();
    assert_eq!(labels.len(), x.nrows());
    assert!(labels.iter().all(|&label| label == 0 || label == 1));

    let probabilities = classifier.predict_probability(x.view()).unwrap();
    assert_eq!(probabilities.shape(), &[x.nrows(), 2]);
    for row in probabilities.rows() {
        assert!((row[0] + row[1] - 1.0).abs() < 1e-9);
    }

    let wrong_width = array![[1.0, 2.0, 3.0]];
    assert!(matches!(
        classifier.predict(wrong_width.view()),
        Err(ClassifierError::FeatureCountMismatch {
            expected: 16,
            found: 3
        })
    ));
}

#[test]
fn soft_voting_averages_member_probabilities() {
    let (x, y) = separable_dataset(25, 21);
    let mut voting = ensemble();
    assert_eq!(voting.estimators().map(<[Classifier]>::len), Some(3));
    voting.train(x.view(), y.view()).unwrap();
    assert!(voting.is_fitted());

    let probe = ndarray::Array2::from_shape_vec((2, 16), [centre_row(0), centre_row(1)].concat())
        .unwrap();
    let combined = voting.predict_probability(probe.view()).unwrap();
    let members = voting.estimators().unwrap();
    let mut mean = ndarray::Array2::<f64>::zeros((2, 2));
    for member in members {
        assert!(member.is_fitted());
        mean += &member.predict_probability(probe.view()).unwrap();
    }
    mean /= members.len() as f64;
    for (a, b) in combined.iter().zip(mean.iter()) {
        assert!((a - b).abs() < 1e-9, "{combined} vs {mean}");
    }

    let labels = voting.predict(probe.view()).unwrap();
    for (row, &label) in combined.rows().into_iter().zip(labels.iter()) {
        let argmax = usize::from(row[1] > row[0]);
        assert_eq!(label, argmax);
    }
    assert_eq!(labels.to_vec(), vec![0, 1]);
}

#[test]
fn evaluation_reports_cover_both_classes() {
    let (x, y) = separable_dataset(20, 8);
    let mut classifier = small_boost();
    classifier.train(x.view(), y.view()).unwrap();
    let cm = classifier.confusion_matrix(x.view(), y.view()).unwrap();
    assert_eq!(cm.total(), 40);
    assert_eq!(cm.get(0, 0) + cm.get(0, 1), 20);
    let report = classifier.classification_report(x.view(), y.view()).unwrap();
    assert!(report.contains("healthy"));
    assert!(report.contains("parkinsons"));
}

#[test]
fn saved_models_reload_into_matching_kinds_only() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path().join("models"));
    let (x, y) = separable_dataset(20, 2);

    let mut forest = small_forest();
    forest.train(x.view(), y.view()).unwrap();
    let path = forest.save(&store).unwrap();
    assert_eq!(path, store.path_for(ModelKind::RandomForest));
    forest.save(&store).unwrap();
    assert_eq!(store.saved_kinds(), vec![ModelKind::RandomForest]);

    let mut reloaded = small_forest();
    reloaded.load(&path).unwrap();
    assert!(reloaded.is_fitted());
    assert_eq!(
        reloaded.predict_probability(x.view()).unwrap(),
        forest.predict_probability(x.view()).unwrap()
    );

    let mut svm = Classifier::svm(&HyperParams::new());
    assert!(matches!(
        svm.load(&path),
        Err(ClassifierError::KindMismatch {
            expected: ModelKind::Svm,
            found: ModelKind::RandomForest
        })
    ));
    assert!(!svm.is_fitted());
    assert!(matches!(
        svm.load(&store.path_for(ModelKind::Svm)),
        Err(ClassifierError::ModelMissing { .. })
    ));
}

#[test]
fn svm_and_ensemble_survive_a_save_load_cycle() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    let (x, y) = separable_dataset(15, 4);

    let mut voting = ensemble();
    voting.train(x.view(), y.view()).unwrap();
    let path = voting.save(&store).unwrap();
    assert!(path.ends_with("Voting.json"));

    let mut reloaded = ensemble();
    reloaded.load(&path).unwrap();
    let before = voting.predict_probability(x.view()).unwrap();
    let after = reloaded.predict_probability(x.view()).unwrap();
    for (a, b) in before.iter().zip(after.iter()) {
        assert!((a - b).abs() < 1e-9);
    }
}
