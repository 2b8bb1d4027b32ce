use linfa::Dataset;
use linfa::dataset::Pr;
use linfa::traits::{Fit, Predict};
use linfa_svm::Svm;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::classifier::{Estimator, check_feature_count};
use super::params::{Gamma, HyperParams, SvmKernel, SvmParams};
use super::{ClassifierError, ModelKind};

/// Support vector machine with Platt-calibrated probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmClassifier {
    params: SvmParams,
    #[serde(default)]
    fitted: Option<FittedSvm>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedSvm {
    n_features: usize,
    model: Svm<f64, Pr>,
}

impl SvmClassifier {
    pub fn new(params: SvmParams) -> Self {
        Self {
            params,
            fitted: None,
        }
    }

    pub fn from_hyperparams(params: &HyperParams) -> Self {
        Self::new(SvmParams::from_hyperparams(params))
    }

    pub fn params(&self) -> &SvmParams {
        &self.params
    }

    fn resolve_gamma(&self, x: ArrayView2<f64>) -> f64 {
        let n_features = x.ncols().max(1) as f64;
        match self.params.gamma {
            Gamma::Value(gamma) => gamma,
            Gamma::Auto => 1.0 / n_features,
            Gamma::Scale => {
                let variance = x.var(0.0);
                if variance > 0.0 {
                    1.0 / (n_features * variance)
                } else {
                    1.0
                }
            }
        }
    }
}

impl Estimator for SvmClassifier {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<(), ClassifierError> {
        let dataset = Dataset::new(x.to_owned(), y.mapv(|label| label == 1));
        let base = Svm::<f64, Pr>::params().pos_neg_weights(self.params.c, self.params.c);
        let params = match self.params.kernel {
            SvmKernel::Rbf => base.gaussian_kernel(1.0 / self.resolve_gamma(x)),
            SvmKernel::Linear => base.linear_kernel(),
            SvmKernel::Poly => base.polynomial_kernel(1.0, 3.0),
        };
        let model = params
            .fit(&dataset)
            .map_err(|err| ClassifierError::training(ModelKind::Svm, err))?;
        tracing::debug!(
            "Fitted SVM on {} rows ({} support vectors)",
            x.nrows(),
            model.nsupport()
        );
        self.fitted = Some(FittedSvm {
            n_features: x.ncols(),
            model,
        });
        Ok(())
    }

    fn positive_probability(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ClassifierError> {
        let fitted = self.fitted.as_ref().ok_or(ClassifierError::NotFitted {
            kind: ModelKind::Svm,
        })?;
        check_feature_count(fitted.n_features, x)?;
        let probabilities: Array1<Pr> = fitted.model.predict(&x.to_owned());
        Ok(probabilities.mapv(|p| f64::from(*p)))
    }

    fn n_features(&self) -> Option<usize> {
        self.fitted.as_ref().map(|fitted| fitted.n_features)
    }

    fn reset(&mut self) {
        self.fitted = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn scale_gamma_uses_feature_variance() {
        let svm = SvmClassifier::new(SvmParams::default());
        let x = array![[0.0, 2.0], [2.0, 0.0]];
        // variance of [0, 2, 2, 0] is 1
        assert!((svm.resolve_gamma(x.view()) - 0.5).abs() < 1e-12);

        let constant = array![[1.0, 1.0], [1.0, 1.0]];
        assert_eq!(svm.resolve_gamma(constant.view()), 1.0);
    }

    #[test]
    fn unfitted_svm_refuses_to_predict() {
        let svm = SvmClassifier::new(SvmParams::default());
        let x = array![[0.0, 1.0]];
        assert!(matches!(
            svm.positive_probability(x.view()),
            Err(ClassifierError::NotFitted { kind: ModelKind::Svm })
        ));
    }
}
