//! Operator command line for the patient results store.

use std::collections::BTreeMap;
use std::path::PathBuf;

use phonation::config::{self, AppConfig};
use phonation::features::{FeatureKey, Status, parse_voice_report};
use phonation::logging;
use phonation::ml::ModelKind;
use phonation::pipeline::PredictionPipeline;
use phonation::results::{ResultsStore, StatusView, Uid};

fn main() {
    if let Err(err) = logging::init("phonation") {
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
    let results_path = match &options.results_path {
        Some(path) => path.clone(),
        None => config.resolved_results_path().map_err(|err| err.to_string())?,
    };
    let mut store = ResultsStore::load(&results_path);

    match options.command {
        Command::Status { uid } => {
            println!("{}", describe_status(store.status_view(uid)));
        }
        Command::Show { uid } => {
            let record = store
                .get_features(uid)
                .ok_or_else(|| format!("No record for patient {uid}"))?;
            println!("patient {uid}: {}", describe_status(store.status_view(uid)));
            for (key, value) in record.features() {
                match value {
                    Some(value) => println!("  {:<18} {value}", key.column_name()),
                    None => println!("  {:<18} -", key.column_name()),
                }
            }
        }
        Command::List { unpredicted_only } => {
            let uids: Vec<Uid> = if unpredicted_only {
                store.list_unpredicted()
            } else {
                store.uids().collect()
            };
            for uid in uids {
                println!("{uid}  {}", describe_status(store.status_view(uid)));
            }
        }
        Command::Add { source, status } => {
            let features = read_features(&source)?;
            let uid = add_patient(&mut store, &features, status)?;
            println!("{uid}");
        }
        Command::Remove { uid } => {
            if !remove_patient(&mut store, uid)? {
                println!("No record for patient {uid}");
            }
        }
        Command::SetStatus { uid, status } => {
            if !set_patient_status(&mut store, uid, status)? {
                println!("No record for patient {uid}");
            }
        }
        Command::Predict { kind } => predict(&config, store, kind)?,
    }
    Ok(())
}

// Every edit is written straight back to the results file; each CLI
// invocation loads the file afresh.
fn add_patient(
    store: &mut ResultsStore,
    features: &BTreeMap<String, f64>,
    status: Option<Status>,
) -> Result<Uid, String> {
    let uid = store
        .add(features.iter().map(|(name, value)| (name.as_str(), *value)), status)
        .map_err(|err| err.to_string())?;
    store.save(None).map_err(|err| err.to_string())?;
    Ok(uid)
}

fn remove_patient(store: &mut ResultsStore, uid: Uid) -> Result<bool, String> {
    if !store.contains(uid) {
        return Ok(false);
    }
    store.remove(uid);
    store.save(None).map_err(|err| err.to_string())?;
    Ok(true)
}

fn set_patient_status(store: &mut ResultsStore, uid: Uid, status: Status) -> Result<bool, String> {
    if !store.contains(uid) {
        return Ok(false);
    }
    store.set_status(uid, status);
    store.save(None).map_err(|err| err.to_string())?;
    Ok(true)
}

fn predict(config: &AppConfig, mut store: ResultsStore, kind: ModelKind) -> Result<(), String> {
    let models = config.model_store().map_err(|err| err.to_string())?;
    let mut classifier = config.build_classifier(kind).map_err(|err| err.to_string())?;
    classifier
        .load(&models.path_for(kind))
        .map_err(|err| format!("{err}\nTrain a model first with phonation-train."))?;
    let report = PredictionPipeline::new(&classifier)
        .run_batch(&mut store)
        .map_err(|err| err.to_string())?;
    for (uid, status) in &report.predicted {
        println!("{uid}  {}", describe_status(StatusView::Predicted(*status)));
    }
    for (uid, reason) in &report.skipped {
        println!("{uid}  skipped: {reason}");
    }
    println!(
        "{} predicted, {} skipped",
        report.predicted.len(),
        report.skipped.len()
    );
    Ok(())
}

fn describe_status(view: StatusView) -> &'static str {
    match view {
        StatusView::NoSuchRecord => "no such record",
        StatusView::NoPrediction => "no prediction yet",
        StatusView::Predicted(Status::Positive) => "positive (Parkinson's indicated)",
        StatusView::Predicted(Status::Negative) => "negative",
        StatusView::Predicted(Status::Unknown) => "unknown",
    }
}

fn read_features(source: &FeatureSource) -> Result<BTreeMap<String, f64>, String> {
    match source {
        FeatureSource::Json(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|err| format!("Failed to read {}: {err}", path.display()))?;
            serde_json::from_str(&text)
                .map_err(|err| format!("Invalid feature file {}: {err}", path.display()))
        }
        FeatureSource::VoiceReport(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|err| format!("Failed to read {}: {err}", path.display()))?;
            let features = parse_voice_report(&text);
            if features.is_empty() {
                return Err(format!("No voice measures found in {}", path.display()));
            }
            Ok(features)
        }
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    config_path: Option<PathBuf>,
    results_path: Option<PathBuf>,
    command: Command,
}

#[derive(Debug, Clone)]
enum Command {
    Status { uid: Uid },
    Show { uid: Uid },
    List { unpredicted_only: bool },
    Add { source: FeatureSource, status: Option<Status> },
    Remove { uid: Uid },
    SetStatus { uid: Uid, status: Status },
    Predict { kind: ModelKind },
}

#[derive(Debug, Clone)]
enum FeatureSource {
    Json(PathBuf),
    VoiceReport(PathBuf),
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut config_path = None;
    let mut results_path = None;
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                config_path = Some(PathBuf::from(value));
            }
            "--results" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--results requires a value".to_string())?;
                results_path = Some(PathBuf::from(value));
            }
            _ => break,
        }
        idx += 1;
    }
    let command_name = args.get(idx).ok_or_else(help_text)?;
    let rest = &args[idx + 1..];
    let command = match command_name.as_str() {
        "status" => Command::Status {
            uid: parse_uid(rest.first())?,
        },
        "show" => Command::Show {
            uid: parse_uid(rest.first())?,
        },
        "list" => match rest {
            [] => Command::List {
                unpredicted_only: false,
            },
            [flag] if flag == "--unpredicted" => Command::List {
                unpredicted_only: true,
            },
            _ => return Err(format!("Unexpected list arguments\n\n{}", help_text())),
        },
        "add" => parse_add(rest)?,
        "remove" => Command::Remove {
            uid: parse_uid(rest.first())?,
        },
        "set-status" => Command::SetStatus {
            uid: parse_uid(rest.first())?,
            status: parse_status(rest.get(1))?,
        },
        "predict" => {
            let kind = match rest {
                [] => ModelKind::SoftVoting,
                [flag, value] if flag == "--model" => value.parse::<ModelKind>()?,
                _ => return Err(format!("Unexpected predict arguments\n\n{}", help_text())),
            };
            Command::Predict { kind }
        }
        unknown => return Err(format!("Unknown command: {unknown}\n\n{}", help_text())),
    };
    Ok(CliOptions {
        config_path,
        results_path,
        command,
    })
}

fn parse_add(args: &[String]) -> Result<Command, String> {
    let mut source = None;
    let mut status = None;
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--features" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--features requires a value".to_string())?;
                source = Some(FeatureSource::Json(PathBuf::from(value)));
            }
            "--voice-report" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--voice-report requires a value".to_string())?;
                source = Some(FeatureSource::VoiceReport(PathBuf::from(value)));
            }
            "--status" => {
                idx += 1;
                status = Some(parse_status(args.get(idx))?);
            }
            unknown => return Err(format!("Unknown add argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    let source = source.ok_or_else(|| "add requires --features or --voice-report".to_string())?;
    Ok(Command::Add { source, status })
}

fn parse_uid(value: Option<&String>) -> Result<Uid, String> {
    let value = value.ok_or_else(|| "Missing patient id".to_string())?;
    value.parse::<Uid>().map_err(|err| err.to_string())
}

fn parse_status(value: Option<&String>) -> Result<Status, String> {
    let value = value.ok_or_else(|| "Missing status (0 or 1)".to_string())?;
    match value.as_str() {
        "0" | "negative" => Ok(Status::Negative),
        "1" | "positive" => Ok(Status::Positive),
        other => Err(format!("Invalid status: {other} (expected 0 or 1)")),
    }
}

fn help_text() -> String {
    let features = FeatureKey::core()
        .map(|key| key.column_name())
        .collect::<Vec<_>>()
        .join(", ");
    [
        "phonation".to_string(),
        String::new(),
        "Stores voice-biomarker results per patient and predicts Parkinson's status.".to_string(),
        String::new(),
        "Usage:".to_string(),
        "  phonation [--config <file>] [--results <file>] <command> [args]".to_string(),
        String::new(),
        "Commands:".to_string(),
        "  status <uid>                       Show the stored status of a patient.".to_string(),
        "  show <uid>                         Show every stored feature of a patient.".to_string(),
        "  list [--unpredicted]               List patients (optionally only unpredicted ones).".to_string(),
        "  add --features <json> [--status s] Add a patient from a JSON name -> value map.".to_string(),
        "  add --voice-report <txt>           Add a patient from a Praat voice report.".to_string(),
        "  remove <uid>                       Delete a patient.".to_string(),
        "  set-status <uid> <0|1>             Record a clinician-confirmed status.".to_string(),
        "  predict [--model <kind>]           Predict every unpredicted patient".to_string(),
        "                                     (kind: svm, random_forest, ada_boost, voting; default voting).".to_string(),
        String::new(),
        format!("Feature names: {features}"),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_global_options_and_commands() {
        let options = parse_args(args(&["--results", "r.csv", "set-status", "454", "1"])).unwrap();
        assert_eq!(options.results_path, Some(PathBuf::from("r.csv")));
        assert!(matches!(
            options.command,
            Command::SetStatus {
                status: Status::Positive,
                ..
            }
        ));

        let options = parse_args(args(&["predict", "--model", "rf"])).unwrap();
        assert!(matches!(
            options.command,
            Command::Predict {
                kind: ModelKind::RandomForest
            }
        ));
        let options = parse_args(args(&["list", "--unpredicted"])).unwrap();
        assert!(matches!(
            options.command,
            Command::List {
                unpredicted_only: true
            }
        ));
    }

    #[test]
    fn rejects_bad_uids_and_missing_sources() {
        assert!(parse_args(args(&["status", "1000"])).is_err());
        assert!(parse_args(args(&["status", "abc"])).is_err());
        assert!(parse_args(args(&["add"])).is_err());
        assert!(parse_args(args(&[])).is_err());
    }

    #[test]
    fn edits_are_written_back_to_the_results_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let features = BTreeMap::from([("HNR".to_string(), 21.5)]);

        let uid = add_patient(&mut ResultsStore::load(&path), &features, None).unwrap();
        assert_eq!(ResultsStore::load(&path).get_status(uid), Some(-1));

        assert!(set_patient_status(&mut ResultsStore::load(&path), uid, Status::Positive).unwrap());
        assert_eq!(ResultsStore::load(&path).get_status(uid), Some(1));

        let other = Uid::all().find(|&candidate| candidate != uid).unwrap();
        assert!(!set_patient_status(&mut ResultsStore::load(&path), other, Status::Negative).unwrap());
        assert!(!remove_patient(&mut ResultsStore::load(&path), other).unwrap());

        assert!(remove_patient(&mut ResultsStore::load(&path), uid).unwrap());
        assert_eq!(ResultsStore::load(&path).get_status(uid), None);
    }
}
