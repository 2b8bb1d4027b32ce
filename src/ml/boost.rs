use linfa::Dataset;
use linfa::traits::{Fit, Predict};
use linfa_trees::DecisionTree;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::classifier::{Estimator, check_feature_count};
use super::params::{BoostAlgorithm, BoostParams, HyperParams};
use super::{ClassifierError, ModelKind};

/// Lower bound on region probabilities before taking logs.
const PROBABILITY_FLOOR: f64 = 1e-7;

/// AdaBoost over depth-one decision trees (stumps).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostClassifier {
    params: BoostParams,
    #[serde(default)]
    fitted: Option<FittedBoost>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedBoost {
    n_features: usize,
    stages: Vec<Stage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stage {
    stump: DecisionTree<f64, usize>,
    vote: StageVote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum StageVote {
    /// SAMME: weighted hard vote.
    Discrete { alpha: f64 },
    /// SAMME.R: `[predicted label][class]` probability of the training rows
    /// the stump routed to each predicted label.
    Real { region: [[f64; 2]; 2] },
}

impl Stage {
    /// Signed contribution of this stage to the positive-class score.
    fn score(&self, label: usize) -> f64 {
        match &self.vote {
            StageVote::Discrete { alpha } => {
                if label == 1 {
                    *alpha
                } else {
                    -alpha
                }
            }
            StageVote::Real { region } => {
                let probabilities = region[label.min(1)];
                probabilities[1].ln() - probabilities[0].ln()
            }
        }
    }
}

impl BoostClassifier {
    pub fn new(params: BoostParams) -> Self {
        Self {
            params,
            fitted: None,
        }
    }

    pub fn from_hyperparams(params: &HyperParams) -> Self {
        Self::new(BoostParams::from_hyperparams(params))
    }

    pub fn params(&self) -> &BoostParams {
        &self.params
    }

    /// Number of boosting stages kept after training (0 before training).
    pub fn n_stages(&self) -> usize {
        self.fitted.as_ref().map_or(0, |fitted| fitted.stages.len())
    }

    fn fit_stump(
        x: ArrayView2<f64>,
        y: ArrayView1<usize>,
        weights: &Array1<f64>,
    ) -> Result<(DecisionTree<f64, usize>, Array1<usize>), ClassifierError> {
        // Sample weights are rescaled to mean 1 so the tree's minimum-weight
        // thresholds keep their row-count meaning.
        let mean = weights.mean().unwrap_or(1.0);
        let scaled = weights.mapv(|w| (w / mean) as f32);
        let dataset = Dataset::new(x.to_owned(), y.to_owned()).with_weights(scaled);
        let stump = DecisionTree::<f64, usize>::params()
            .max_depth(Some(1))
            .min_weight_split(0.0)
            .min_weight_leaf(0.0)
            .fit(&dataset)
            .map_err(|err| ClassifierError::training(ModelKind::AdaBoost, err))?;
        let predicted: Array1<usize> = stump.predict(&x.to_owned());
        Ok((stump, predicted))
    }
}

impl Estimator for BoostClassifier {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<(), ClassifierError> {
        let n_rows = x.nrows();
        let learning_rate = self.params.learning_rate;
        let mut weights = Array1::from_elem(n_rows, 1.0 / n_rows as f64);
        let mut stages = Vec::with_capacity(self.params.n_estimators);

        for round in 0..self.params.n_estimators {
            let (stump, predicted) = Self::fit_stump(x, y, &weights)?;
            let total: f64 = weights.sum();
            let error = predicted
                .iter()
                .zip(y.iter())
                .zip(weights.iter())
                .filter(|((p, t), _)| p != t)
                .map(|(_, w)| *w)
                .sum::<f64>()
                / total;

            if error >= 0.5 {
                if round == 0 {
                    return Err(ClassifierError::training(
                        ModelKind::AdaBoost,
                        format!("first weak learner is no better than chance (error {error:.3})"),
                    ));
                }
                tracing::debug!("AdaBoost stopped at round {round}: weak learner error {error:.3}");
                break;
            }

            if error <= 0.0 {
                let vote = match self.params.algorithm {
                    BoostAlgorithm::Discrete => StageVote::Discrete { alpha: 1.0 },
                    BoostAlgorithm::Real => StageVote::Real {
                        region: region_probabilities(&predicted, y, &weights),
                    },
                };
                stages.push(Stage { stump, vote });
                tracing::debug!("AdaBoost stopped at round {round}: training data fitted perfectly");
                break;
            }

            let vote = match self.params.algorithm {
                BoostAlgorithm::Discrete => {
                    let alpha = learning_rate * ((1.0 - error) / error).ln();
                    for ((w, p), t) in weights.iter_mut().zip(predicted.iter()).zip(y.iter()) {
                        if p != t {
                            *w *= alpha.exp();
                        }
                    }
                    StageVote::Discrete { alpha }
                }
                BoostAlgorithm::Real => {
                    let region = region_probabilities(&predicted, y, &weights);
                    for ((w, &p), &t) in weights.iter_mut().zip(predicted.iter()).zip(y.iter()) {
                        let probabilities = region[p.min(1)];
                        let truth = t.min(1);
                        let margin = probabilities[truth].ln() - probabilities[1 - truth].ln();
                        *w *= (-learning_rate * 0.5 * margin).exp();
                    }
                    StageVote::Real { region }
                }
            };
            let total: f64 = weights.sum();
            if !total.is_finite() || total <= 0.0 {
                tracing::debug!("AdaBoost stopped at round {round}: sample weights degenerated");
                stages.push(Stage { stump, vote });
                break;
            }
            weights /= total;
            stages.push(Stage { stump, vote });
        }

        tracing::debug!("Fitted AdaBoost with {} stages", stages.len());
        self.fitted = Some(FittedBoost {
            n_features: x.ncols(),
            stages,
        });
        Ok(())
    }

    fn positive_probability(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ClassifierError> {
        let fitted = self.fitted.as_ref().ok_or(ClassifierError::NotFitted {
            kind: ModelKind::AdaBoost,
        })?;
        check_feature_count(fitted.n_features, x)?;
        let rows = x.to_owned();
        let mut score = Array1::<f64>::zeros(x.nrows());
        let mut norm = 0.0;
        for stage in &fitted.stages {
            let labels: Array1<usize> = stage.stump.predict(&rows);
            score.zip_mut_with(&labels, |s, &label| *s += stage.score(label));
            norm += match stage.vote {
                StageVote::Discrete { alpha } => alpha,
                StageVote::Real { .. } => 1.0,
            };
        }
        if norm <= 0.0 {
            return Ok(Array1::from_elem(x.nrows(), 0.5));
        }
        let scale = match self.params.algorithm {
            BoostAlgorithm::Discrete => 2.0 / norm,
            BoostAlgorithm::Real => 1.0 / norm,
        };
        Ok(score.mapv(|s| logistic(s * scale)))
    }

    fn n_features(&self) -> Option<usize> {
        self.fitted.as_ref().map(|fitted| fitted.n_features)
    }

    fn reset(&mut self) {
        self.fitted = None;
    }
}

fn region_probabilities(
    predicted: &Array1<usize>,
    y: ArrayView1<usize>,
    weights: &Array1<f64>,
) -> [[f64; 2]; 2] {
    let mut mass = [[0.0f64; 2]; 2];
    for ((&p, &t), &w) in predicted.iter().zip(y.iter()).zip(weights.iter()) {
        mass[p.min(1)][t.min(1)] += w;
    }
    mass.map(|row| {
        let total = row[0] + row[1];
        if total <= 0.0 {
            [0.5, 0.5]
        } else {
            row.map(|m| (m / total).clamp(PROBABILITY_FLOOR, 1.0))
        }
    })
}

fn logistic(value: f64) -> f64 {
    1.0 / (1.0 + (-value).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    fn interval_data() -> (Array2<f64>, Array1<usize>) {
        // Positive inside [10, 20), negative elsewhere: no single stump fits it.
        let x = Array2::from_shape_fn((30, 1), |(row, _)| row as f64);
        let y = Array1::from_shape_fn(30, |row| usize::from((10..20).contains(&row)));
        (x, y)
    }

    #[test]
    fn region_probabilities_are_clipped_and_normalized() {
        let predicted = array![0, 0, 1, 1];
        let y = array![0, 0, 1, 0];
        let weights = array![0.25, 0.25, 0.25, 0.25];
        let region = region_probabilities(&predicted, y.view(), &weights);
        assert_eq!(region[0][1], PROBABILITY_FLOOR);
        assert!((region[0][0] - 1.0).abs() < 1e-12);
        assert!((region[1][0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn both_algorithms_learn_an_interval() {
        for algorithm in [BoostAlgorithm::Real, BoostAlgorithm::Discrete] {
            let mut boost = BoostClassifier::new(BoostParams {
                n_estimators: 30,
                algorithm,
                ..BoostParams::default()
            });
            let (x, y) = interval_data();
            boost.fit(x.view(), y.view()).unwrap();
            assert!(boost.n_stages() > 1, "{algorithm:?} kept a single stage");

            let probe = array![[2.0], [15.0], [27.0]];
            let p = boost.positive_probability(probe.view()).unwrap();
            assert!(p[0] < 0.5, "{algorithm:?}: {p}");
            assert!(p[1] > 0.5, "{algorithm:?}: {p}");
            assert!(p[2] < 0.5, "{algorithm:?}: {p}");
        }
    }
}
