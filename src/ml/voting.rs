use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::classifier::{Classifier, Estimator};
use super::{ClassifierError, ModelKind};

/// Soft-voting ensemble: the positive-class probability is the mean of the
/// members' probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingClassifier {
    members: Vec<Classifier>,
}

impl VotingClassifier {
    /// Build an ensemble; members may be fitted or not and are refitted by training.
    pub fn new(members: Vec<Classifier>) -> Result<Self, ClassifierError> {
        if members.is_empty() {
            return Err(ClassifierError::InvalidEnsemble(
                "an ensemble needs at least one member".to_string(),
            ));
        }
        if members
            .iter()
            .any(|member| member.kind() == ModelKind::SoftVoting)
        {
            return Err(ClassifierError::InvalidEnsemble(
                "soft-voting ensembles cannot be nested".to_string(),
            ));
        }
        Ok(Self { members })
    }

    pub fn members(&self) -> &[Classifier] {
        &self.members
    }

    pub(crate) fn is_fitted(&self) -> bool {
        self.members.iter().all(Classifier::is_fitted)
    }
}

impl Estimator for VotingClassifier {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<(), ClassifierError> {
        for member in &mut self.members {
            tracing::debug!("Training ensemble member {}", member.kind());
            member.estimator_mut().fit(x, y)?;
        }
        Ok(())
    }

    fn positive_probability(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ClassifierError> {
        if !self.is_fitted() {
            return Err(ClassifierError::NotFitted {
                kind: ModelKind::SoftVoting,
            });
        }
        let mut sum = Array1::<f64>::zeros(x.nrows());
        for member in &self.members {
            sum += &member.estimator().positive_probability(x)?;
        }
        Ok(sum / self.members.len() as f64)
    }

    fn n_features(&self) -> Option<usize> {
        self.members.first().and_then(|member| member.estimator().n_features())
    }

    fn reset(&mut self) {
        for member in &mut self.members {
            member.estimator_mut().reset();
        }
    }
}
