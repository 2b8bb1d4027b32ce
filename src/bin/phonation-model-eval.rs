//! Developer utility to evaluate a saved model against the labelled dataset.

use std::path::PathBuf;

use phonation::config;
use phonation::dataset::LabeledDataset;
use phonation::logging;
use phonation::ml::metrics::{CLASS_NAMES, accuracy, classification_report};
use phonation::ml::{ModelKind, ModelStore};

fn main() {
    if let Err(err) = logging::init("phonation-model-eval") {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    config_path: Option<PathBuf>,
    dataset_path: Option<PathBuf>,
    model_path: Option<PathBuf>,
    kind: ModelKind,
    split: Split,
    top: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Split {
    Train,
    Test,
    All,
}

#[derive(Debug, Clone)]
struct MisclassifiedSample {
    name: String,
    truth: usize,
    predicted: usize,
    confidence: f64,
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
    let model_path = match &options.model_path {
        Some(path) => path.clone(),
        None => config
            .model_store()
            .map_err(|err| err.to_string())?
            .path_for(options.kind),
    };

    let dataset = LabeledDataset::load(&dataset_path).map_err(|err| err.to_string())?;
    let dataset = match options.split {
        Split::All => dataset,
        split => {
            let (train, test) = dataset
                .train_test_split(config.training.test_ratio, config.training.split_seed)
                .map_err(|err| err.to_string())?;
            if split == Split::Train { train } else { test }
        }
    };

    let mut classifier = config
        .build_classifier(options.kind)
        .map_err(|err| err.to_string())?;
    classifier.load(&model_path).map_err(|err| err.to_string())?;

    let x = dataset.features.view();
    let y = dataset.labels.view();
    let probabilities = classifier
        .predict_probability(x)
        .map_err(|err| err.to_string())?;
    let cm = classifier.confusion_matrix(x, y).map_err(|err| err.to_string())?;

    println!("model: {} ({})", options.kind, model_path.display());
    println!("samples: {}", dataset.len());
    println!("accuracy: {:.4}", accuracy(&cm));
    println!("{}", classification_report(&cm, &CLASS_NAMES));
    println!("confusion matrix (rows=true, cols=pred):");
    for truth in 0..cm.n_classes {
        let mut row = String::new();
        for pred in 0..cm.n_classes {
            row.push_str(&format!("{:6}", cm.get(truth, pred)));
        }
        println!("{row}");
    }

    let mut misclassified: Vec<MisclassifiedSample> = probabilities
        .rows()
        .into_iter()
        .zip(y.iter())
        .zip(&dataset.names)
        .filter_map(|((row, &truth), name)| {
            let predicted = usize::from(row[1] > row[0]);
            (predicted != truth).then(|| MisclassifiedSample {
                name: name.clone(),
                truth,
                predicted,
                confidence: row[predicted],
            })
        })
        .collect();
    if !misclassified.is_empty() {
        println!();
        println!("Top misclassified samples (highest confidence):");
        misclassified.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        for item in misclassified.iter().take(options.top) {
            println!(
                "- {}  truth={}  pred={}  conf={:.3}",
                item.name, CLASS_NAMES[item.truth], CLASS_NAMES[item.predicted], item.confidence
            );
        }
    }
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut config_path = None;
    let mut dataset_path = None;
    let mut model_path = None;
    let mut models_dir: Option<PathBuf> = None;
    let mut kind = ModelKind::SoftVoting;
    let mut split = Split::Test;
    let mut top = 10usize;

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
            "--model-path" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--model-path requires a value".to_string())?;
                model_path = Some(PathBuf::from(value));
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
                kind = value.parse::<ModelKind>()?;
            }
            "--split" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--split requires a value".to_string())?;
                split = match value.as_str() {
                    "train" => Split::Train,
                    "test" => Split::Test,
                    "all" => Split::All,
                    other => return Err(format!("Invalid --split value: {other}")),
                };
            }
            "--top" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--top requires a value".to_string())?;
                top = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --top value: {value}"))?;
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    if model_path.is_none()
        && let Some(dir) = models_dir
    {
        model_path = Some(ModelStore::new(dir).path_for(kind));
    }
    Ok(CliOptions {
        config_path,
        dataset_path,
        model_path,
        kind,
        split,
        top,
    })
}

fn help_text() -> String {
    [
        "phonation-model-eval",
        "",
        "Evaluates a saved classifier against a labelled voice dataset.",
        "",
        "Usage:",
        "  phonation-model-eval [--dataset parkinsons.data] [--model voting] [options]",
        "",
        "Options:",
        "  --dataset <file>       Labelled table (default: dataset_path from config.toml).",
        "  --model <kind>         svm, random_forest, ada_boost or voting (default: voting).",
        "  --model-path <file>    Saved model file (default: the kind's slot).",
        "  --models-dir <dir>     Model slot directory (default: from config / app dir).",
        "  --split <name>         train | test | all (default: test, using the configured split).",
        "  --top <n>              Number of misclassified samples to list (default: 10).",
        "  --config <file>        Config file (default: <app dir>/config.toml).",
    ]
    .join("\n")
}
