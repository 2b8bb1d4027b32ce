//! Hyperparameter sets for each classifier kind.
//!
//! Raw parameters arrive as loosely typed maps (from `config.toml` or JSON).
//! Each kind reads only its allow-listed keys and ignores the rest. A value of
//! the wrong type or outside its valid range rejects the whole set: the
//! classifier falls back to its defaults and a warning is logged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Loosely typed hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

/// Hyperparameters keyed by name.
pub type HyperParams = BTreeMap<String, ParamValue>;

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

/// Build a [`HyperParams`] map from `(name, value)` pairs.
pub fn hyperparams<I, K, V>(pairs: I) -> HyperParams
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<ParamValue>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

/// Typed access to the allow-listed keys of one parameter map.
struct ParamReader<'a> {
    params: &'a HyperParams,
    allowed: &'static [&'static str],
    kind: &'static str,
}

impl<'a> ParamReader<'a> {
    fn new(params: &'a HyperParams, allowed: &'static [&'static str], kind: &'static str) -> Self {
        for key in params.keys() {
            if !allowed.contains(&key.as_str()) {
                tracing::debug!("Ignoring unrecognized {kind} hyperparameter {key:?}");
            }
        }
        Self {
            params,
            allowed,
            kind,
        }
    }

    fn value(&self, key: &str) -> Option<&'a ParamValue> {
        debug_assert!(self.allowed.contains(&key), "{key} is not allow-listed");
        match self.params.get(key) {
            None | Some(ParamValue::Null) => None,
            Some(value) => Some(value),
        }
    }

    fn positive_f64(&self, key: &str) -> Result<Option<f64>, String> {
        let value = match self.value(key) {
            None => return Ok(None),
            Some(ParamValue::Int(value)) => *value as f64,
            Some(ParamValue::Float(value)) => *value,
            Some(other) => return Err(self.type_error(key, "a number", other)),
        };
        if value.is_finite() && value > 0.0 {
            Ok(Some(value))
        } else {
            Err(format!("{} {key} must be > 0, got {value}", self.kind))
        }
    }

    fn count(&self, key: &str, min: i64) -> Result<Option<usize>, String> {
        match self.value(key) {
            None => Ok(None),
            Some(ParamValue::Int(value)) if *value >= min => Ok(Some(*value as usize)),
            Some(ParamValue::Int(value)) => {
                Err(format!("{} {key} must be >= {min}, got {value}", self.kind))
            }
            Some(other) => Err(self.type_error(key, "an integer", other)),
        }
    }

    fn text(&self, key: &str) -> Result<Option<&'a str>, String> {
        match self.value(key) {
            None => Ok(None),
            Some(ParamValue::Text(value)) => Ok(Some(value.as_str())),
            Some(other) => Err(self.type_error(key, "a string", other)),
        }
    }

    fn seed(&self, key: &str) -> Result<Option<u64>, String> {
        Ok(self.count(key, 0)?.map(|seed| seed as u64))
    }

    fn type_error(&self, key: &str, expected: &str, found: &ParamValue) -> String {
        format!("{} {key} must be {expected}, got {found:?}", self.kind)
    }
}

fn or_default<T: Default>(kind: &str, parsed: Result<T, String>) -> T {
    parsed.unwrap_or_else(|err| {
        tracing::warn!("Invalid {kind} hyperparameters ({err}); using defaults");
        T::default()
    })
}

/// Kernel of the support vector machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SvmKernel {
    Rbf,
    Linear,
    Poly,
}

/// Kernel coefficient for the radial-basis kernel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gamma {
    /// `1 / (n_features * var(X))`, computed from the training data.
    Scale,
    /// `1 / n_features`.
    Auto,
    Value(f64),
}

/// Support vector machine hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvmParams {
    /// Regularization strength, applied to both classes.
    pub c: f64,
    pub kernel: SvmKernel,
    pub gamma: Gamma,
    /// Accepted for configuration parity; SVM training is deterministic.
    pub random_state: Option<u64>,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: SvmKernel::Rbf,
            gamma: Gamma::Scale,
            random_state: None,
        }
    }
}

impl SvmParams {
    pub const KEYS: &'static [&'static str] = &["C", "kernel", "gamma", "random_state"];

    /// Read allow-listed keys, falling back to defaults on invalid values.
    pub fn from_hyperparams(params: &HyperParams) -> Self {
        or_default("SVM", Self::try_from_hyperparams(params))
    }

    pub fn try_from_hyperparams(params: &HyperParams) -> Result<Self, String> {
        let reader = ParamReader::new(params, Self::KEYS, "SVM");
        let defaults = Self::default();
        let kernel = match reader.text("kernel")? {
            None => defaults.kernel,
            Some("rbf" | "radial-basis") => SvmKernel::Rbf,
            Some("linear") => SvmKernel::Linear,
            Some("poly") => SvmKernel::Poly,
            Some(other) => return Err(format!("SVM kernel {other:?} is not supported")),
        };
        let gamma = match reader.value("gamma") {
            None => defaults.gamma,
            Some(ParamValue::Text(text)) if text == "scale" => Gamma::Scale,
            Some(ParamValue::Text(text)) if text == "auto" => Gamma::Auto,
            Some(ParamValue::Text(text)) => {
                return Err(format!("SVM gamma {text:?} is not supported"));
            }
            Some(_) => Gamma::Value(reader.positive_f64("gamma")?.unwrap_or(1.0)),
        };
        Ok(Self {
            c: reader.positive_f64("C")?.unwrap_or(defaults.c),
            kernel,
            gamma,
            random_state: reader.seed("random_state")?,
        })
    }
}

/// Impurity measure used to pick tree splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitCriterion {
    Gini,
    Entropy,
}

/// Sample count given either absolutely or as a fraction of the training rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleCount {
    Absolute(usize),
    Fraction(f64),
}

impl SampleCount {
    /// Resolve against `n` rows; fractions round up.
    pub fn resolve(self, n: usize) -> usize {
        match self {
            SampleCount::Absolute(count) => count,
            SampleCount::Fraction(fraction) => (fraction * n as f64).ceil() as usize,
        }
    }
}

/// Number of features each tree may look at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    Sqrt,
    Log2,
    All,
    Count(usize),
    Fraction(f64),
}

impl MaxFeatures {
    /// Resolve against `d` features, clamped to `1..=d`.
    pub fn resolve(self, d: usize) -> usize {
        let raw = match self {
            MaxFeatures::Sqrt => (d as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (d as f64).log2().floor() as usize,
            MaxFeatures::All => d,
            MaxFeatures::Count(count) => count,
            MaxFeatures::Fraction(fraction) => (fraction * d as f64).floor() as usize,
        };
        raw.clamp(1, d.max(1))
    }
}

/// Random forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub criterion: SplitCriterion,
    pub max_depth: Option<usize>,
    pub min_samples_split: SampleCount,
    pub max_leaf_nodes: Option<usize>,
    pub max_features: MaxFeatures,
    /// Bootstrap sample size; `None` draws as many rows as the training set.
    pub max_samples: Option<SampleCount>,
    pub random_state: Option<u64>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: SampleCount::Absolute(2),
            max_leaf_nodes: None,
            max_features: MaxFeatures::Sqrt,
            max_samples: None,
            random_state: None,
        }
    }
}

impl ForestParams {
    pub const KEYS: &'static [&'static str] = &[
        "n_estimators",
        "criterion",
        "max_depth",
        "min_samples_split",
        "max_leaf_nodes",
        "max_features",
        "max_samples",
        "random_state",
    ];

    pub fn from_hyperparams(params: &HyperParams) -> Self {
        or_default("RandomForest", Self::try_from_hyperparams(params))
    }

    pub fn try_from_hyperparams(params: &HyperParams) -> Result<Self, String> {
        let reader = ParamReader::new(params, Self::KEYS, "RandomForest");
        let defaults = Self::default();
        let criterion = match reader.text("criterion")? {
            None => defaults.criterion,
            Some("gini" | "impurity") => SplitCriterion::Gini,
            Some("entropy") => SplitCriterion::Entropy,
            Some(other) => return Err(format!("RandomForest criterion {other:?} is not supported")),
        };
        let min_samples_split = match reader.value("min_samples_split") {
            None => defaults.min_samples_split,
            Some(ParamValue::Float(fraction)) if *fraction > 0.0 && *fraction <= 1.0 => {
                SampleCount::Fraction(*fraction)
            }
            Some(ParamValue::Float(value)) => {
                return Err(format!(
                    "RandomForest min_samples_split fraction must be in (0, 1], got {value}"
                ));
            }
            Some(_) => SampleCount::Absolute(reader.count("min_samples_split", 2)?.unwrap_or(2)),
        };
        let max_features = match reader.value("max_features") {
            None => MaxFeatures::All,
            Some(ParamValue::Text(text)) => match text.as_str() {
                "auto" | "sqrt" => MaxFeatures::Sqrt,
                "log2" => MaxFeatures::Log2,
                other => {
                    return Err(format!("RandomForest max_features {other:?} is not supported"));
                }
            },
            Some(ParamValue::Float(fraction)) if *fraction > 0.0 && *fraction <= 1.0 => {
                MaxFeatures::Fraction(*fraction)
            }
            Some(ParamValue::Float(value)) => {
                return Err(format!(
                    "RandomForest max_features fraction must be in (0, 1], got {value}"
                ));
            }
            Some(_) => MaxFeatures::Count(reader.count("max_features", 1)?.unwrap_or(1)),
        };
        let max_samples = match reader.value("max_samples") {
            None => None,
            Some(ParamValue::Float(fraction)) if *fraction > 0.0 && *fraction <= 1.0 => {
                Some(SampleCount::Fraction(*fraction))
            }
            Some(ParamValue::Float(value)) => {
                return Err(format!(
                    "RandomForest max_samples fraction must be in (0, 1], got {value}"
                ));
            }
            Some(_) => reader.count("max_samples", 1)?.map(SampleCount::Absolute),
        };
        // An explicit `max_features` key is required to change the default.
        let max_features = if params.contains_key("max_features") {
            max_features
        } else {
            defaults.max_features
        };
        Ok(Self {
            n_estimators: reader.count("n_estimators", 1)?.unwrap_or(defaults.n_estimators),
            criterion,
            max_depth: reader.count("max_depth", 1)?,
            min_samples_split,
            max_leaf_nodes: reader.count("max_leaf_nodes", 2)?,
            max_features,
            max_samples,
            random_state: reader.seed("random_state")?,
        })
    }

    /// Depth bound combining `max_depth` and `max_leaf_nodes`.
    ///
    /// A binary tree of depth `k` has at most `2^k` leaves, so the leaf budget
    /// is enforced by capping the depth at `floor(log2(max_leaf_nodes))`.
    pub fn effective_max_depth(&self) -> Option<usize> {
        let leaf_depth = self
            .max_leaf_nodes
            .map(|leaves| (usize::BITS - 1 - leaves.leading_zeros()) as usize);
        match (self.max_depth, leaf_depth) {
            (Some(depth), Some(leaf)) => Some(depth.min(leaf)),
            (depth, leaf) => depth.or(leaf),
        }
    }
}

/// Boosting variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostAlgorithm {
    /// SAMME.R: weak learners contribute class-probability estimates.
    Real,
    /// SAMME: weak learners contribute weighted hard votes.
    Discrete,
}

/// AdaBoost hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub algorithm: BoostAlgorithm,
    /// Accepted for configuration parity; stump fitting is deterministic.
    pub random_state: Option<u64>,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            n_estimators: 50,
            learning_rate: 1.0,
            algorithm: BoostAlgorithm::Real,
            random_state: None,
        }
    }
}

impl BoostParams {
    pub const KEYS: &'static [&'static str] =
        &["n_estimators", "learning_rate", "algorithm", "random_state"];

    pub fn from_hyperparams(params: &HyperParams) -> Self {
        or_default("AdaBoost", Self::try_from_hyperparams(params))
    }

    pub fn try_from_hyperparams(params: &HyperParams) -> Result<Self, String> {
        let reader = ParamReader::new(params, Self::KEYS, "AdaBoost");
        let defaults = Self::default();
        let algorithm = match reader.text("algorithm")? {
            None => defaults.algorithm,
            Some("SAMME.R" | "real") => BoostAlgorithm::Real,
            Some("SAMME" | "discrete") => BoostAlgorithm::Discrete,
            Some(other) => return Err(format!("AdaBoost algorithm {other:?} is not supported")),
        };
        Ok(Self {
            n_estimators: reader.count("n_estimators", 1)?.unwrap_or(defaults.n_estimators),
            learning_rate: reader
                .positive_f64("learning_rate")?
                .unwrap_or(defaults.learning_rate),
            algorithm,
            random_state: reader.seed("random_state")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svm_reads_allow_listed_keys_and_ignores_others() {
        let params = hyperparams([
            ("C", ParamValue::Int(5)),
            ("gamma", ParamValue::Float(0.5)),
            ("kernel", "poly".into()),
            ("invalid_param", ParamValue::Int(19)),
        ]);
        let svm = SvmParams::from_hyperparams(&params);
        assert_eq!(svm.c, 5.0);
        assert_eq!(svm.gamma, Gamma::Value(0.5));
        assert_eq!(svm.kernel, SvmKernel::Poly);
        assert_eq!(svm.random_state, None);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let params = hyperparams([("C", "large"), ("kernel", "linear")]);
        assert!(SvmParams::try_from_hyperparams(&params).is_err());
        assert_eq!(SvmParams::from_hyperparams(&params), SvmParams::default());

        let params = hyperparams([("n_estimators", ParamValue::Int(0))]);
        assert_eq!(BoostParams::from_hyperparams(&params), BoostParams::default());

        let params = hyperparams([("kernel", "sigmoid")]);
        assert_eq!(SvmParams::from_hyperparams(&params), SvmParams::default());
    }

    #[test]
    fn forest_accepts_fractional_split_and_explicit_values() {
        let params = hyperparams([
            ("n_estimators", ParamValue::Int(10)),
            ("criterion", "entropy".into()),
            ("max_depth", ParamValue::Int(5)),
            ("min_samples_split", ParamValue::Float(0.5)),
            ("invalid_param", ParamValue::Int(19)),
        ]);
        let forest = ForestParams::from_hyperparams(&params);
        assert_eq!(forest.n_estimators, 10);
        assert_eq!(forest.criterion, SplitCriterion::Entropy);
        assert_eq!(forest.max_depth, Some(5));
        assert_eq!(forest.min_samples_split, SampleCount::Fraction(0.5));
        assert_eq!(forest.min_samples_split.resolve(9), 5);
        assert_eq!(forest.max_features, MaxFeatures::Sqrt);
    }

    #[test]
    fn forest_max_features_null_means_all() {
        let params = hyperparams([("max_features", ParamValue::Null)]);
        let forest = ForestParams::from_hyperparams(&params);
        assert_eq!(forest.max_features, MaxFeatures::All);
        assert_eq!(forest.max_features.resolve(16), 16);
        assert_eq!(MaxFeatures::Sqrt.resolve(16), 4);
        assert_eq!(MaxFeatures::Log2.resolve(16), 4);
        assert_eq!(MaxFeatures::Count(40).resolve(16), 16);
    }

    #[test]
    fn leaf_budget_caps_depth() {
        let mut forest = ForestParams {
            max_leaf_nodes: Some(10),
            ..ForestParams::default()
        };
        assert_eq!(forest.effective_max_depth(), Some(3));
        forest.max_depth = Some(2);
        assert_eq!(forest.effective_max_depth(), Some(2));
        forest.max_leaf_nodes = None;
        assert_eq!(forest.effective_max_depth(), Some(2));
    }

    #[test]
    fn boost_algorithm_aliases() {
        let params = hyperparams([
            ("n_estimators", ParamValue::Int(10)),
            ("learning_rate", ParamValue::Float(0.1)),
            ("algorithm", "SAMME".into()),
        ]);
        let boost = BoostParams::from_hyperparams(&params);
        assert_eq!(boost.n_estimators, 10);
        assert_eq!(boost.learning_rate, 0.1);
        assert_eq!(boost.algorithm, BoostAlgorithm::Discrete);
    }

    #[test]
    fn param_values_deserialize_from_toml_and_json() {
        let from_toml: HyperParams = toml::from_str("C = 5\nkernel = \"rbf\"\ngamma = 0.5\n").unwrap();
        assert_eq!(from_toml["C"], ParamValue::Int(5));
        assert_eq!(from_toml["gamma"], ParamValue::Float(0.5));
        let from_json: HyperParams =
            serde_json::from_str(r#"{"max_depth": null, "criterion": "gini"}"#).unwrap();
        assert_eq!(from_json["max_depth"], ParamValue::Null);
    }
}
