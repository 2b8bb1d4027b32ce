//! Voice-biomarker classifiers.
//!
//! Every model is a [`Classifier`]: a tagged variant over the supported kinds
//! that owns its configured estimator. Training runs on `linfa` estimators;
//! this module adds the binary-label contracts, soft voting, scoring and the
//! per-kind model slots.

mod boost;
mod classifier;
mod error;
mod forest;
pub mod metrics;
pub mod params;
mod persist;
mod svm;
mod voting;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use boost::BoostClassifier;
pub use classifier::Classifier;
pub use error::ClassifierError;
pub use forest::ForestClassifier;
pub use metrics::ConfusionMatrix;
pub use params::{BoostParams, ForestParams, HyperParams, ParamValue, SvmParams, hyperparams};
pub use persist::{MODEL_FORMAT_VERSION, ModelStore};
pub use svm::SvmClassifier;
pub use voting::VotingClassifier;

/// Default number of cross-validation folds.
pub const DEFAULT_FOLDS: usize = 10;

/// Supported classifier kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "SVM")]
    Svm,
    RandomForest,
    AdaBoost,
    #[serde(rename = "Voting")]
    SoftVoting,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Svm,
        ModelKind::RandomForest,
        ModelKind::AdaBoost,
        ModelKind::SoftVoting,
    ];

    /// Name of the persisted model slot for this kind.
    pub const fn slot_name(self) -> &'static str {
        match self {
            ModelKind::Svm => "SVM",
            ModelKind::RandomForest => "RandomForest",
            ModelKind::AdaBoost => "AdaBoost",
            ModelKind::SoftVoting => "Voting",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slot_name())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svm" => Ok(ModelKind::Svm),
            "rf" | "randomforest" | "random_forest" | "forest" => Ok(ModelKind::RandomForest),
            "ada" | "adaboost" | "ada_boost" => Ok(ModelKind::AdaBoost),
            "voting" | "soft_voting" | "ensemble" => Ok(ModelKind::SoftVoting),
            other => Err(format!(
                "Unknown model kind {other:?} (expected svm, random_forest, ada_boost or voting)"
            )),
        }
    }
}
