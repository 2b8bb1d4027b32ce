//! Developer utility to train a classifier on the labelled dataset and save it
//! into its model slot.

use std::path::PathBuf;

use phonation::config::{self, AppConfig};
use phonation::dataset::LabeledDataset;
use phonation::logging;
use phonation::ml::metrics::accuracy;
use phonation::ml::{ModelKind, ModelStore};

fn main() {
    if let Err(err) = logging::init("phonation-train") {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let config = match &options.config_path {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    let dataset_path = options
        .dataset_path
        .clone()
        .or_else(|| config.dataset_path.clone())
        .ok_or_else(|| format!("No dataset given and none configured\n\n{}", help_text()))?;
    let models = match &options.models_dir {
        Some(dir) => ModelStore::new(dir),
        None => config.model_store().map_err(|err| err.to_string())?,
    };
    let test_ratio = options.test_ratio.unwrap_or(config.training.test_ratio);
    let seed = options.seed.unwrap_or(config.training.split_seed);
    let folds = options.folds.unwrap_or(config.training.folds);

    let dataset = LabeledDataset::load(&dataset_path).map_err(|err| err.to_string())?;
    let (train, test) = dataset
        .train_test_split(test_ratio, seed)
        .map_err(|err| err.to_string())?;
    println!(
        "dataset: {} samples ({} positive), train={} test={}",
        dataset.len(),
        dataset.positives(),
        train.len(),
        test.len()
    );

    for kind in &options.kinds {
        train_one(&config, &models, *kind, &train, &test, folds, options.cross_validate)?;
    }
    Ok(())
}

fn train_one(
    config: &AppConfig,
    models: &ModelStore,
    kind: ModelKind,
    train: &LabeledDataset,
    test: &LabeledDataset,
    folds: usize,
    cross_validate: bool,
) -> Result<(), String> {
    let mut classifier = config.build_classifier(kind).map_err(|err| err.to_string())?;
    println!();
    println!("== {kind} ==");
    if cross_validate {
        let score = classifier
            .cross_validate(train.features.view(), train.labels.view(), folds)
            .map_err(|err| err.to_string())?;
        println!("{folds}-fold cross-validation accuracy: {score:.4}");
    }
    classifier
        .train_with_columns(train.features.view(), train.labels.view(), &train.columns)
        .map_err(|err| err.to_string())?;

    let cm = classifier
        .confusion_matrix(test.features.view(), test.labels.view())
        .map_err(|err| err.to_string())?;
    println!("test accuracy: {:.4}", accuracy(&cm));
    let report = classifier
        .classification_report(test.features.view(), test.labels.view())
        .map_err(|err| err.to_string())?;
    println!("{report}");

    let path = classifier.save(models).map_err(|err| err.to_string())?;
    println!("saved model: {}", path.display());
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    config_path: Option<PathBuf>,
    dataset_path: Option<PathBuf>,
    models_dir: Option<PathBuf>,
    kinds: Vec<ModelKind>,
    test_ratio: Option<f64>,
    seed: Option<u64>,
    folds: Option<usize>,
    cross_validate: bool,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut config_path = None;
    let mut dataset_path = None;
    let mut models_dir = None;
    let mut kinds = vec![ModelKind::SoftVoting];
    let mut test_ratio = None;
    let mut seed = None;
    let mut folds = None;
    let mut cross_validate = true;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                config_path = Some(PathBuf::from(value));
            }
            "--dataset" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--dataset requires a value".to_string())?;
                dataset_path = Some(PathBuf::from(value));
            }
            "--models-dir" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--models-dir requires a value".to_string())?;
                models_dir = Some(PathBuf::from(value));
            }
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                kinds = if value == "all" {
                    ModelKind::ALL.to_vec()
                } else {
                    vec![value.parse::<ModelKind>()?]
                };
            }
            "--test-ratio" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--test-ratio requires a value".to_string())?;
                test_ratio = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| format!("Invalid --test-ratio value: {value}"))?,
                );
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("Invalid --seed value: {value}"))?,
                );
            }
            "--folds" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--folds requires a value".to_string())?;
                folds = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --folds value: {value}"))?,
                );
            }
            "--no-cv" => cross_validate = false,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    Ok(CliOptions {
        config_path,
        dataset_path,
        models_dir,
        kinds,
        test_ratio,
        seed,
        folds,
        cross_validate,
    })
}

fn help_text() -> String {
    [
        "phonation-train",
        "",
        "Trains a classifier on a labelled voice dataset and saves it into its model slot.",
        "",
        "Usage:",
        "  phonation-train [--dataset parkinsons.data] [--model voting] [options]",
        "",
        "Options:",
        "  --dataset <file>       Labelled table (default: dataset_path from config.toml).",
        "  --model <kind|all>     svm, random_forest, ada_boost, voting or all (default: voting).",
        "  --models-dir <dir>     Model slot directory (default: from config / app dir).",
        "  --test-ratio <f64>     Held-out share (default: training.test_ratio, 0.3).",
        "  --seed <u64>           Train/test shuffle seed (default: training.split_seed, 0).",
        "  --folds <n>            Cross-validation folds (default: training.folds, 10).",
        "  --no-cv                Skip cross-validation.",
        "  --config <file>        Config file (default: <app dir>/config.toml).",
    ]
    .join("\n")
}
