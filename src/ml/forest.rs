use linfa::Dataset;
use linfa::traits::{Fit, Predict};
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::classifier::{Estimator, check_feature_count};
use super::params::{ForestParams, HyperParams, SplitCriterion};
use super::{ClassifierError, ModelKind};

/// Bagged decision trees.
///
/// Each tree is fitted on a bootstrap sample of the rows and a random subset
/// of the columns. The positive-class probability is the share of trees that
/// vote for the positive class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestClassifier {
    params: ForestParams,
    #[serde(default)]
    fitted: Option<FittedForest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedForest {
    n_features: usize,
    trees: Vec<ForestTree>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ForestTree {
    /// Column indices this tree was trained on, ascending.
    features: Vec<usize>,
    tree: DecisionTree<f64, usize>,
}

impl ForestClassifier {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            fitted: None,
        }
    }

    pub fn from_hyperparams(params: &HyperParams) -> Self {
        Self::new(ForestParams::from_hyperparams(params))
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Number of fitted trees (0 before training).
    pub fn n_trees(&self) -> usize {
        self.fitted.as_ref().map_or(0, |fitted| fitted.trees.len())
    }
}

impl Estimator for ForestClassifier {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<(), ClassifierError> {
        let n_rows = x.nrows();
        let n_features = x.ncols();
        let mut rng = match self.params.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let sample_size = self
            .params
            .max_samples
            .map_or(n_rows, |count| count.resolve(n_rows))
            .clamp(1, n_rows);
        let subset_size = self.params.max_features.resolve(n_features);
        let min_split = self.params.min_samples_split.resolve(n_rows).max(2);
        let quality = match self.params.criterion {
            SplitCriterion::Gini => SplitQuality::Gini,
            SplitCriterion::Entropy => SplitQuality::Entropy,
        };
        let tree_params = DecisionTree::<f64, usize>::params()
            .split_quality(quality)
            .max_depth(self.params.effective_max_depth())
            .min_weight_split(min_split as f32)
            .min_weight_leaf(1.0);

        let mut trees = Vec::with_capacity(self.params.n_estimators);
        for _ in 0..self.params.n_estimators {
            let rows: Vec<usize> = (0..sample_size)
                .map(|_| rng.random_range(0..n_rows))
                .collect();
            let mut features =
                rand::seq::index::sample(&mut rng, n_features, subset_size).into_vec();
            features.sort_unstable();

            let sample_x = x.select(Axis(0), &rows).select(Axis(1), &features);
            let sample_y = y.select(Axis(0), &rows);
            let tree = tree_params
                .fit(&Dataset::new(sample_x, sample_y))
                .map_err(|err| ClassifierError::training(ModelKind::RandomForest, err))?;
            trees.push(ForestTree { features, tree });
        }
        tracing::debug!(
            "Fitted random forest: {} trees, {} of {} features each, {} rows per bootstrap",
            trees.len(),
            subset_size,
            n_features,
            sample_size
        );
        self.fitted = Some(FittedForest { n_features, trees });
        Ok(())
    }

    fn positive_probability(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ClassifierError> {
        let fitted = self.fitted.as_ref().ok_or(ClassifierError::NotFitted {
            kind: ModelKind::RandomForest,
        })?;
        check_feature_count(fitted.n_features, x)?;
        let mut votes = Array1::<f64>::zeros(x.nrows());
        for member in &fitted.trees {
            let labels: Array1<usize> = member.tree.predict(&x.select(Axis(1), &member.features));
            votes.zip_mut_with(&labels, |vote, &label| {
                if label == 1 {
                    *vote += 1.0;
                }
            });
        }
        Ok(votes / fitted.trees.len().max(1) as f64)
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
    use crate::ml::params::{MaxFeatures, hyperparams};
    use ndarray::{Array2, array};

    fn threshold_data() -> (Array2<f64>, Array1<usize>) {
        let x = Array2::from_shape_fn((40, 2), |(row, col)| {
            if col == 0 { row as f64 } else { (row % 3) as f64 }
        });
        let y = Array1::from_shape_fn(40, |row| usize::from(row >= 20));
        (x, y)
    }

    #[test]
    fn seeded_forest_is_reproducible_and_separates_threshold() {
        let params = ForestParams {
            n_estimators: 15,
            max_features: MaxFeatures::All,
            random_state: Some(7),
            ..ForestParams::default()
        };
        let (x, y) = threshold_data();
        let mut first = ForestClassifier::new(params.clone());
        first.fit(x.view(), y.view()).unwrap();
        let mut second = ForestClassifier::new(params);
        second.fit(x.view(), y.view()).unwrap();
        assert_eq!(first.n_trees(), 15);

        let probe = array![[2.0, 0.0], [37.0, 1.0]];
        let a = first.positive_probability(probe.view()).unwrap();
        let b = second.positive_probability(probe.view()).unwrap();
        assert_eq!(a, b);
        assert!(a[0] < 0.5);
        assert!(a[1] > 0.5);
    }

    #[test]
    fn rejects_wrong_column_count() {
        let mut forest = ForestClassifier::from_hyperparams(&hyperparams([
            ("n_estimators", 3i64),
            ("random_state", 1),
        ]));
        let (x, y) = threshold_data();
        forest.fit(x.view(), y.view()).unwrap();
        let probe = array![[1.0, 2.0, 3.0]];
        assert!(matches!(
            forest.positive_probability(probe.view()),
            Err(ClassifierError::FeatureCountMismatch { expected: 2, found: 3 })
        ));
    }
}
