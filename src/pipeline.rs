//! Batch prediction over the unpredicted records of a results store.

use ndarray::Array2;
use thiserror::Error;

use crate::features::{FeatureKey, Status};
use crate::ml::{Classifier, ClassifierError};
use crate::results::{ResultsError, ResultsStore, Uid};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error(transparent)]
    Results(#[from] ResultsError),
}

/// Why a record was left unpredicted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The record has no populated feature.
    NoFeatures,
    /// Features the model was trained on are null in the record.
    MissingFeatures(Vec<FeatureKey>),
    /// The classifier rejected the row.
    Rejected(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoFeatures => f.write_str("no populated features"),
            SkipReason::MissingFeatures(keys) => {
                let names: Vec<&str> = keys.iter().map(|key| key.column_name()).collect();
                write!(f, "missing features the model needs: {}", names.join(", "))
            }
            SkipReason::Rejected(message) => write!(f, "rejected by classifier: {message}"),
        }
    }
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub predicted: Vec<(Uid, Status)>,
    pub skipped: Vec<(Uid, SkipReason)>,
}

/// Predicts every unpredicted record with one fitted classifier.
pub struct PredictionPipeline<'a> {
    classifier: &'a Classifier,
}

impl<'a> PredictionPipeline<'a> {
    pub fn new(classifier: &'a Classifier) -> Self {
        Self { classifier }
    }

    /// Predict and store a status for every unpredicted record, then save once.
    ///
    /// Each row is assembled from exactly the features the model was fitted
    /// on, in its column order. Records that cannot be scored are skipped and
    /// logged; the batch goes on.
    pub fn run_batch(&self, store: &mut ResultsStore) -> Result<BatchReport, PipelineError> {
        let columns = self
            .classifier
            .feature_columns()
            .ok_or(ClassifierError::NotFitted {
                kind: self.classifier.kind(),
            })?;
        let mut report = BatchReport::default();
        for uid in store.list_unpredicted() {
            match self.predict_one(store, uid, columns) {
                Ok(status) => {
                    store.set_status(uid, status);
                    tracing::info!("Predicted status {} for uid {uid}", status.code());
                    report.predicted.push((uid, status));
                }
                Err(reason) => {
                    tracing::warn!("Skipping uid {uid}: {reason}");
                    report.skipped.push((uid, reason));
                }
            }
        }
        store.save(None)?;
        tracing::info!(
            "Batch prediction finished: {} predicted, {} skipped",
            report.predicted.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    fn predict_one(
        &self,
        store: &ResultsStore,
        uid: Uid,
        columns: &[FeatureKey],
    ) -> Result<Status, SkipReason> {
        let Some(record) = store.get_features(uid) else {
            return Err(SkipReason::NoFeatures);
        };
        let table = store.to_table(Some(record)).without_nulls();
        let Some(row) = table.rows.first() else {
            return Err(SkipReason::NoFeatures);
        };
        if row.values.is_empty() {
            return Err(SkipReason::NoFeatures);
        }
        let mut values = Vec::with_capacity(columns.len());
        let mut missing = Vec::new();
        for &key in columns {
            match table
                .column_index(key.column_name())
                .and_then(|idx| row.values[idx])
            {
                Some(value) => values.push(value),
                None => missing.push(key),
            }
        }
        if !missing.is_empty() {
            return Err(SkipReason::MissingFeatures(missing));
        }
        let x = Array2::from_shape_vec((1, values.len()), values)
            .map_err(|err| SkipReason::Rejected(err.to_string()))?;
        let labels = self
            .classifier
            .predict(x.view())
            .map_err(|err| SkipReason::Rejected(err.to_string()))?;
        labels
            .first()
            .and_then(|&label| Status::from_label(label))
            .ok_or_else(|| SkipReason::Rejected("classifier returned no label".to_string()))
    }
}
