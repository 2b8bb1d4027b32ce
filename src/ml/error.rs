use std::path::PathBuf;

use thiserror::Error;

use super::ModelKind;

/// Errors raised by classifier training, inference and persistence.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Prediction or scoring was requested before training.
    #[error("{kind} model is not fitted; train or load it first")]
    NotFitted { kind: ModelKind },
    /// Training or scoring input is empty, ragged, non-finite or non-binary.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Input column count differs from the one the model was trained on.
    #[error("Model expects {expected} features per row, got {found}")]
    FeatureCountMismatch { expected: usize, found: usize },
    /// The underlying estimator rejected the data.
    #[error("Training {kind} failed: {message}")]
    Training { kind: ModelKind, message: String },
    /// Soft-voting ensemble built from unusable members.
    #[error("Invalid ensemble: {0}")]
    InvalidEnsemble(String),
    /// A saved model of another kind was offered to this classifier.
    #[error("Attempted to load a {found} model into a {expected} classifier")]
    KindMismatch { expected: ModelKind, found: ModelKind },
    #[error("No saved model at {path}")]
    ModelMissing { path: PathBuf },
    #[error("Failed to read saved model {path}: {source}")]
    ModelRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Saved model {path} is corrupt: {source}")]
    ModelCorrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Saved model {path} uses unsupported format version {version}")]
    UnsupportedFormat { path: PathBuf, version: u32 },
    #[error("Saved model {path} holds an unfitted {kind} classifier")]
    UnfittedArtifact { path: PathBuf, kind: ModelKind },
    #[error("Saved model {path} names {columns} feature columns but takes {width}")]
    ColumnMismatch {
        path: PathBuf,
        columns: usize,
        width: usize,
    },
    #[error("Failed to serialize {kind} model: {source}")]
    Serialize {
        kind: ModelKind,
        source: serde_json::Error,
    },
    #[error("Failed to write model to {path}: {source}")]
    ModelWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ClassifierError {
    pub(crate) fn training(kind: ModelKind, err: impl std::fmt::Display) -> Self {
        ClassifierError::Training {
            kind,
            message: err.to_string(),
        }
    }
}
