use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, stack};
use serde::{Deserialize, Serialize};

use crate::features::{FEATURE_COUNT, FeatureKey};

use super::metrics::{self, CLASS_NAMES, ConfusionMatrix};
use super::params::HyperParams;
use super::persist::{ModelStore, SavedModel};
use super::{
    BoostClassifier, ClassifierError, ForestClassifier, ModelKind, SvmClassifier,
    VotingClassifier,
};

/// Fit/predict surface shared by every classifier variant.
///
/// Inputs are already validated: non-empty, rectangular, finite, with labels
/// in `{0, 1}`.
pub(crate) trait Estimator {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<(), ClassifierError>;

    /// Probability of the positive class for each row.
    fn positive_probability(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ClassifierError>;

    /// Column count seen during training; `None` while unfitted.
    fn n_features(&self) -> Option<usize>;

    /// Discard the fitted state, keeping the configuration.
    fn reset(&mut self);
}

pub(crate) fn check_feature_count(expected: usize, x: ArrayView2<f64>) -> Result<(), ClassifierError> {
    if x.ncols() == expected {
        Ok(())
    } else {
        Err(ClassifierError::FeatureCountMismatch {
            expected,
            found: x.ncols(),
        })
    }
}

/// A binary classifier of one of the supported kinds.
///
/// Labels are `0` (negative) and `1` (positive). Prediction and scoring
/// require a fitted model, obtained by [`Classifier::train`] or
/// [`Classifier::load`]. A fitted classifier also remembers which
/// vocabulary feature each input column holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classifier {
    #[serde(flatten)]
    model: Model,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    columns: Vec<FeatureKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "model")]
enum Model {
    #[serde(rename = "SVM")]
    Svm(SvmClassifier),
    RandomForest(ForestClassifier),
    AdaBoost(BoostClassifier),
    #[serde(rename = "Voting")]
    SoftVoting(VotingClassifier),
}

impl From<Model> for Classifier {
    fn from(model: Model) -> Self {
        Self {
            model,
            columns: Vec::new(),
        }
    }
}

impl Classifier {
    pub fn svm(params: &HyperParams) -> Self {
        Model::Svm(SvmClassifier::from_hyperparams(params)).into()
    }

    pub fn random_forest(params: &HyperParams) -> Self {
        Model::RandomForest(ForestClassifier::from_hyperparams(params)).into()
    }

    pub fn ada_boost(params: &HyperParams) -> Self {
        Model::AdaBoost(BoostClassifier::from_hyperparams(params)).into()
    }

    /// Soft-voting ensemble over already-constructed members.
    pub fn soft_voting(members: Vec<Classifier>) -> Result<Self, ClassifierError> {
        VotingClassifier::new(members).map(|voting| Model::SoftVoting(voting).into())
    }

    /// Unfitted classifier of a single-estimator kind.
    ///
    /// `SoftVoting` is built from its members instead; see
    /// [`Classifier::soft_voting`].
    pub fn with_kind(kind: ModelKind, params: &HyperParams) -> Result<Self, ClassifierError> {
        match kind {
            ModelKind::Svm => Ok(Self::svm(params)),
            ModelKind::RandomForest => Ok(Self::random_forest(params)),
            ModelKind::AdaBoost => Ok(Self::ada_boost(params)),
            ModelKind::SoftVoting => Err(ClassifierError::InvalidEnsemble(
                "a soft-voting ensemble must be built from its members".to_string(),
            )),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match &self.model {
            Model::Svm(_) => ModelKind::Svm,
            Model::RandomForest(_) => ModelKind::RandomForest,
            Model::AdaBoost(_) => ModelKind::AdaBoost,
            Model::SoftVoting(_) => ModelKind::SoftVoting,
        }
    }

    pub fn is_fitted(&self) -> bool {
        match &self.model {
            Model::SoftVoting(voting) => voting.is_fitted(),
            _ => self.estimator().n_features().is_some(),
        }
    }

    /// Column count the fitted model expects.
    pub fn n_features(&self) -> Option<usize> {
        if self.is_fitted() {
            self.estimator().n_features()
        } else {
            None
        }
    }

    /// Vocabulary feature held by each input column of the fitted model.
    pub fn feature_columns(&self) -> Option<&[FeatureKey]> {
        self.is_fitted().then_some(self.columns.as_slice())
    }

    /// Ensemble members, or `None` for single-estimator kinds.
    pub fn estimators(&self) -> Option<&[Classifier]> {
        match &self.model {
            Model::SoftVoting(voting) => Some(voting.members()),
            _ => None,
        }
    }

    pub(crate) fn estimator(&self) -> &dyn Estimator {
        match &self.model {
            Model::Svm(inner) => inner,
            Model::RandomForest(inner) => inner,
            Model::AdaBoost(inner) => inner,
            Model::SoftVoting(inner) => inner,
        }
    }

    pub(crate) fn estimator_mut(&mut self) -> &mut dyn Estimator {
        match &mut self.model {
            Model::Svm(inner) => inner,
            Model::RandomForest(inner) => inner,
            Model::AdaBoost(inner) => inner,
            Model::SoftVoting(inner) => inner,
        }
    }

    /// Copy of this classifier with the same configuration and no fitted state.
    pub fn unfitted(&self) -> Self {
        let mut copy = self.clone();
        copy.clear_fit();
        copy
    }

    fn clear_fit(&mut self) {
        self.estimator_mut().reset();
        self.columns.clear();
    }

    /// Fit on `x` (one row per sample) and binary labels `y`.
    ///
    /// Columns are taken to be the leading vocabulary features in column
    /// order, so a 16-column matrix holds the core measures. Use
    /// [`Classifier::train_with_columns`] for any other layout.
    ///
    /// On failure the previous fitted state is discarded.
    pub fn train(
        &mut self,
        x: ArrayView2<f64>,
        y: ArrayView1<usize>,
    ) -> Result<&mut Self, ClassifierError> {
        self.clear_fit();
        if x.ncols() > FEATURE_COUNT {
            return Err(ClassifierError::InvalidInput(format!(
                "{} columns but the vocabulary has {FEATURE_COUNT} features",
                x.ncols()
            )));
        }
        let columns = FeatureKey::ALL[..x.ncols()].to_vec();
        self.fit_columns(x, y, columns)
    }

    /// Fit on `x` whose columns hold `columns`, in that order.
    ///
    /// On failure the previous fitted state is discarded.
    pub fn train_with_columns(
        &mut self,
        x: ArrayView2<f64>,
        y: ArrayView1<usize>,
        columns: &[FeatureKey],
    ) -> Result<&mut Self, ClassifierError> {
        self.clear_fit();
        if columns.len() != x.ncols() {
            return Err(ClassifierError::InvalidInput(format!(
                "{} column names for {} columns",
                columns.len(),
                x.ncols()
            )));
        }
        if let Some(key) = columns
            .iter()
            .enumerate()
            .find_map(|(idx, key)| columns[..idx].contains(key).then_some(key))
        {
            return Err(ClassifierError::InvalidInput(format!(
                "column {key} appears more than once"
            )));
        }
        self.fit_columns(x, y, columns.to_vec())
    }

    fn fit_columns(
        &mut self,
        x: ArrayView2<f64>,
        y: ArrayView1<usize>,
        columns: Vec<FeatureKey>,
    ) -> Result<&mut Self, ClassifierError> {
        validate_training_input(x, y)?;
        let kind = self.kind();
        tracing::info!(
            "Training {kind} on {} rows x {} features",
            x.nrows(),
            x.ncols()
        );
        if let Err(err) = self.estimator_mut().fit(x, y) {
            self.clear_fit();
            return Err(err);
        }
        self.columns = columns;
        Ok(self)
    }

    /// Per-row `[p(negative), p(positive)]`.
    pub fn predict_probability(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, ClassifierError> {
        if !self.is_fitted() {
            return Err(ClassifierError::NotFitted { kind: self.kind() });
        }
        validate_features(x)?;
        let positive = self.estimator().positive_probability(x)?;
        let negative = positive.mapv(|p| 1.0 - p);
        stack(Axis(1), &[negative.view(), positive.view()])
            .map_err(|err| ClassifierError::InvalidInput(err.to_string()))
    }

    /// Per-row label: `1` when the positive-class probability exceeds 0.5.
    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>, ClassifierError> {
        let probabilities = self.predict_probability(x)?;
        Ok(probabilities
            .rows()
            .into_iter()
            .map(|row| usize::from(row[1] > row[0]))
            .collect())
    }

    /// Mean held-out accuracy over stratified `folds`-fold cross-validation.
    ///
    /// Each fold trains an unfitted copy, so `self` is left unchanged.
    pub fn cross_validate(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView1<usize>,
        folds: usize,
    ) -> Result<f64, ClassifierError> {
        validate_training_input(x, y)?;
        if folds < 2 || folds > x.nrows() {
            return Err(ClassifierError::InvalidInput(format!(
                "cross-validation needs 2..={} folds, got {folds}",
                x.nrows()
            )));
        }
        let assignment = stratified_folds(y, folds);
        let mut total = 0.0;
        for fold in 0..folds {
            let (train_rows, test_rows): (Vec<usize>, Vec<usize>) =
                (0..x.nrows()).partition(|&row| assignment[row] != fold);
            let mut model = self.unfitted();
            model.train(
                x.select(Axis(0), &train_rows).view(),
                y.select(Axis(0), &train_rows).view(),
            )?;
            let test_x = x.select(Axis(0), &test_rows);
            let test_y = y.select(Axis(0), &test_rows);
            let predicted = model.predict(test_x.view())?;
            let correct = predicted
                .iter()
                .zip(test_y.iter())
                .filter(|(p, t)| p == t)
                .count();
            let score = correct as f64 / test_rows.len() as f64;
            tracing::debug!("{} fold {fold}: accuracy {score:.3}", self.kind());
            total += score;
        }
        Ok(total / folds as f64)
    }

    pub fn confusion_matrix(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView1<usize>,
    ) -> Result<ConfusionMatrix, ClassifierError> {
        check_lengths(x, y)?;
        let predicted = self.predict(x)?;
        Ok(ConfusionMatrix::from_labels(
            CLASS_NAMES.len(),
            &y.to_vec(),
            &predicted.to_vec(),
        ))
    }

    /// Text table of per-class precision, recall, F1 and support.
    pub fn classification_report(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView1<usize>,
    ) -> Result<String, ClassifierError> {
        let cm = self.confusion_matrix(x, y)?;
        Ok(metrics::classification_report(&cm, &CLASS_NAMES))
    }

    /// Persist the fitted model into its kind's slot, replacing any previous one.
    pub fn save(&self, store: &ModelStore) -> Result<PathBuf, ClassifierError> {
        if !self.is_fitted() {
            return Err(ClassifierError::NotFitted { kind: self.kind() });
        }
        store.save(self)
    }

    /// Replace this classifier with the fitted model saved at `path`.
    ///
    /// The artifact must hold a fitted model of the same kind. On any error
    /// `self` is left untouched.
    pub fn load(&mut self, path: &Path) -> Result<(), ClassifierError> {
        let SavedModel { classifier, .. } = ModelStore::read(path)?;
        if classifier.kind() != self.kind() {
            return Err(ClassifierError::KindMismatch {
                expected: self.kind(),
                found: classifier.kind(),
            });
        }
        if !classifier.is_fitted() {
            return Err(ClassifierError::UnfittedArtifact {
                path: path.to_path_buf(),
                kind: classifier.kind(),
            });
        }
        let width = classifier.estimator().n_features().unwrap_or_default();
        if classifier.columns.len() != width {
            return Err(ClassifierError::ColumnMismatch {
                path: path.to_path_buf(),
                columns: classifier.columns.len(),
                width,
            });
        }
        tracing::info!("Loaded {} model from {}", classifier.kind(), path.display());
        *self = classifier;
        Ok(())
    }
}

fn check_lengths(x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<(), ClassifierError> {
    if x.nrows() != y.len() {
        return Err(ClassifierError::InvalidInput(format!(
            "{} feature rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }
    Ok(())
}

fn validate_features(x: ArrayView2<f64>) -> Result<(), ClassifierError> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ClassifierError::InvalidInput(format!(
            "empty feature matrix ({} x {})",
            x.nrows(),
            x.ncols()
        )));
    }
    if let Some(((row, col), value)) = x.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(ClassifierError::InvalidInput(format!(
            "non-finite value {value} at row {row}, column {col}"
        )));
    }
    Ok(())
}

fn validate_training_input(x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<(), ClassifierError> {
    validate_features(x)?;
    check_lengths(x, y)?;
    if let Some(label) = y.iter().find(|&&label| label > 1) {
        return Err(ClassifierError::InvalidInput(format!(
            "labels must be 0 or 1, found {label}"
        )));
    }
    if !y.iter().any(|&label| label == 0) || !y.iter().any(|&label| label == 1) {
        return Err(ClassifierError::InvalidInput(
            "training labels must contain both classes".to_string(),
        ));
    }
    Ok(())
}

/// Assign each row to a fold, dealing the rows out round-robin grouped by
/// class so each fold keeps roughly the overall class balance.
///
/// One counter runs across both classes, so every fold gets a row as long
/// as `folds <= y.len()`.
fn stratified_folds(y: ArrayView1<usize>, folds: usize) -> Vec<usize> {
    let mut assignment = vec![0; y.len()];
    let by_class = (0..=1).flat_map(|class| {
        y.iter()
            .enumerate()
            .filter(move |&(_, &label)| label.min(1) == class)
            .map(|(row, _)| row)
    });
    for (dealt, row) in by_class.enumerate() {
        assignment[row] = dealt % folds;
    }
    assignment
}
