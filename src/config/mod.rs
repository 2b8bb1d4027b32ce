//! Application configuration stored as `config.toml` in the app directory.

mod errors;
mod io;
mod types;

pub use errors::ConfigError;
pub use io::{config_path, load_from, load_or_default, save, save_to_path};
pub use types::{
    AppConfig, EnsembleSettings, HyperparameterSettings, RESULTS_FILE_NAME, TrainingSettings,
};

/// Default filename used to store the app configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{ModelKind, ParamValue};
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = load_from(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.training.test_ratio, 0.3);
        assert_eq!(config.training.folds, 10);
        assert_eq!(config.ensemble.members.len(), 3);
    }

    #[test]
    fn parses_paths_training_and_hyperparameters() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            r#"
results_path = "/data/results.csv"

[training]
split_seed = 42
folds = 5

[ensemble]
members = ["SVM", "AdaBoost"]

[hyperparameters.svm]
C = 5
gamma = 0.5

[hyperparameters.random_forest]
n_estimators = 10
criterion = "entropy"
"#,
        )
        .unwrap();
        let config = load_from(&path).unwrap();
        assert_eq!(
            config.resolved_results_path().unwrap(),
            std::path::PathBuf::from("/data/results.csv")
        );
        assert_eq!(config.training.split_seed, 42);
        assert_eq!(config.training.folds, 5);
        assert_eq!(config.training.test_ratio, 0.3);
        assert_eq!(config.ensemble.members, vec![ModelKind::Svm, ModelKind::AdaBoost]);
        assert_eq!(config.hyperparameters.svm["C"], ParamValue::Int(5));

        let voting = config.build_classifier(ModelKind::SoftVoting).unwrap();
        let members: Vec<ModelKind> = voting
            .estimators()
            .unwrap()
            .iter()
            .map(|member| member.kind())
            .collect();
        assert_eq!(members, vec![ModelKind::Svm, ModelKind::AdaBoost]);
    }

    #[test]
    fn out_of_range_settings_are_normalized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[training]\ntest_ratio = 1.5\nfolds = 1\n\n[ensemble]\nmembers = [\"Voting\"]\n",
        )
        .unwrap();
        let config = load_from(&path).unwrap();
        assert_eq!(config.training, TrainingSettings::default());
        assert_eq!(config.ensemble, EnsembleSettings::default());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "results_path = [").unwrap();
        assert!(matches!(load_from(&path), Err(ConfigError::ParseToml { .. })));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let mut config = AppConfig::default();
        config.models_dir = Some(dir.path().join("models"));
        config.training.split_seed = 7;
        config
            .hyperparameters
            .ada_boost
            .insert("learning_rate".to_string(), ParamValue::Float(0.5));
        save_to_path(&config, &path).unwrap();
        assert_eq!(load_from(&path).unwrap(), config);
    }
}
