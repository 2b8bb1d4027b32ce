use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::app_dirs;
use crate::ml::{Classifier, ClassifierError, DEFAULT_FOLDS, HyperParams, ModelKind, ModelStore};

use super::ConfigError;

/// File name of the default results table inside the results directory.
pub const RESULTS_FILE_NAME: &str = "results.csv";

const DEFAULT_TEST_RATIO: f64 = 0.3;

/// Application settings stored in `config.toml`.
///
/// Config keys (TOML): `results_path`, `models_dir`, `dataset_path`,
/// `training`, `ensemble`, `hyperparameters`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Results table; defaults to `<app dir>/results/results.csv`.
    #[serde(default)]
    pub results_path: Option<PathBuf>,
    /// Saved model slots; defaults to `<app dir>/models`.
    #[serde(default)]
    pub models_dir: Option<PathBuf>,
    /// Labelled training table (`parkinsons.data`).
    #[serde(default)]
    pub dataset_path: Option<PathBuf>,
    #[serde(default)]
    pub training: TrainingSettings,
    #[serde(default)]
    pub ensemble: EnsembleSettings,
    #[serde(default)]
    pub hyperparameters: HyperparameterSettings,
}

impl AppConfig {
    pub(crate) fn normalized(self) -> Self {
        Self {
            training: self.training.normalized(),
            ensemble: self.ensemble.normalized(),
            ..self
        }
    }

    /// Configured results path, or the default inside the app directory.
    pub fn resolved_results_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.results_path {
            Some(path) => Ok(path.clone()),
            None => Ok(app_dirs::results_dir()?.join(RESULTS_FILE_NAME)),
        }
    }

    /// Model slots in the configured directory, or in the app directory.
    pub fn model_store(&self) -> Result<ModelStore, ConfigError> {
        match &self.models_dir {
            Some(dir) => Ok(ModelStore::new(dir)),
            None => Ok(ModelStore::new(app_dirs::models_dir()?)),
        }
    }

    /// Hyperparameters configured for a single-estimator kind.
    pub fn hyperparams_for(&self, kind: ModelKind) -> HyperParams {
        match kind {
            ModelKind::Svm => self.hyperparameters.svm.clone(),
            ModelKind::RandomForest => self.hyperparameters.random_forest.clone(),
            ModelKind::AdaBoost => self.hyperparameters.ada_boost.clone(),
            ModelKind::SoftVoting => HyperParams::new(),
        }
    }

    /// Unfitted classifier of `kind` built from the configured hyperparameters.
    ///
    /// The soft-voting ensemble is assembled from `ensemble.members`.
    pub fn build_classifier(&self, kind: ModelKind) -> Result<Classifier, ClassifierError> {
        if kind != ModelKind::SoftVoting {
            return Classifier::with_kind(kind, &self.hyperparams_for(kind));
        }
        let members = self
            .ensemble
            .members
            .iter()
            .map(|&member| Classifier::with_kind(member, &self.hyperparams_for(member)))
            .collect::<Result<Vec<_>, _>>()?;
        Classifier::soft_voting(members)
    }
}

/// Settings used by the training and evaluation tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSettings {
    /// Share of the labelled rows held out for testing.
    #[serde(default = "default_test_ratio")]
    pub test_ratio: f64,
    /// Seed of the train/test shuffle.
    #[serde(default)]
    pub split_seed: u64,
    /// Cross-validation folds.
    #[serde(default = "default_folds")]
    pub folds: usize,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            test_ratio: DEFAULT_TEST_RATIO,
            split_seed: 0,
            folds: DEFAULT_FOLDS,
        }
    }
}

impl TrainingSettings {
    fn normalized(self) -> Self {
        let test_ratio = if self.test_ratio > 0.0 && self.test_ratio < 1.0 {
            self.test_ratio
        } else {
            tracing::warn!(
                "Ignoring training.test_ratio {} (must be between 0 and 1)",
                self.test_ratio
            );
            DEFAULT_TEST_RATIO
        };
        let folds = if self.folds >= 2 {
            self.folds
        } else {
            tracing::warn!("Ignoring training.folds {} (must be at least 2)", self.folds);
            DEFAULT_FOLDS
        };
        Self {
            test_ratio,
            folds,
            ..self
        }
    }
}

fn default_test_ratio() -> f64 {
    DEFAULT_TEST_RATIO
}

fn default_folds() -> usize {
    DEFAULT_FOLDS
}

/// Members of the soft-voting ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleSettings {
    #[serde(default = "default_members")]
    pub members: Vec<ModelKind>,
}

impl Default for EnsembleSettings {
    fn default() -> Self {
        Self {
            members: default_members(),
        }
    }
}

impl EnsembleSettings {
    fn normalized(self) -> Self {
        let members: Vec<ModelKind> = self
            .members
            .into_iter()
            .filter(|kind| *kind != ModelKind::SoftVoting)
            .collect();
        if members.is_empty() {
            tracing::warn!("Ensemble has no usable members; using the default members");
            return Self::default();
        }
        Self { members }
    }
}

fn default_members() -> Vec<ModelKind> {
    vec![ModelKind::Svm, ModelKind::RandomForest, ModelKind::AdaBoost]
}

/// Raw hyperparameter tables per classifier kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterSettings {
    #[serde(default)]
    pub svm: HyperParams,
    #[serde(default)]
    pub random_forest: HyperParams,
    #[serde(default)]
    pub ada_boost: HyperParams,
}
