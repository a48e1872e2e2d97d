//! Developer utility to train, evaluate and persist the classifier.

use std::path::PathBuf;

use tabpredict::config::{self, Settings};
use tabpredict::logging;
use tabpredict::ml::ModelKind;
use tabpredict::ml::metrics::Averaging;
use tabpredict::preprocess::{MissingPolicy, Scaling};
use tabpredict::workflow;

fn main() {
    if let Err(err) = logging::init("tabpredict-train") {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(settings) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    let run = workflow::run_training(&settings).map_err(|err| err.to_string())?;
    println!(
        "trained {} on {} rows ({} after cleaning): {} train / {} test",
        run.artifact.kind(),
        run.loaded_rows,
        run.cleaned_rows,
        run.train_rows,
        run.test_rows
    );
    println!("features: {}", run.artifact.feature_names().join(", "));
    print!("{}", run.report);
    println!(
        "saved model {} to {}",
        run.artifact.model_id,
        run.model_path.display()
    );
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<Option<Settings>, String> {
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("{}", help_text());
        return Ok(None);
    }
    let mut config_path: Option<PathBuf> = None;
    let mut overrides = Vec::new();
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        match flag {
            "--random-seed" | "--stratify" => overrides.push((flag.to_string(), String::new())),
            "--config" | "--data" | "--label" | "--features" | "--model" | "--out" | "--seed"
            | "--test-fraction" | "--missing" | "--scaling" | "--averaging" | "--delimiter"
            | "--decimal" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| format!("{flag} requires a value"))?;
                if flag == "--config" {
                    config_path = Some(PathBuf::from(value));
                } else {
                    overrides.push((flag.to_string(), value.clone()));
                }
            }
            other => return Err(format!("Unknown argument: {other}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let mut settings = match config_path {
        Some(path) => config::load_from(&path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    for (flag, value) in overrides {
        apply_override(&mut settings, &flag, &value)?;
    }
    Ok(Some(settings.normalized()))
}

fn apply_override(settings: &mut Settings, flag: &str, value: &str) -> Result<(), String> {
    match flag {
        "--data" => settings.dataset.path = PathBuf::from(value),
        "--label" => settings.dataset.label_column = value.to_string(),
        "--features" => {
            settings.dataset.feature_columns = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }
        "--model" => settings.training.model = value.parse::<ModelKind>()?,
        "--out" => settings.model.path = PathBuf::from(value),
        "--seed" => {
            let seed = value
                .parse::<u64>()
                .map_err(|_| format!("Invalid --seed value: {value}"))?;
            settings.preprocess.seed = Some(seed);
        }
        "--random-seed" => settings.preprocess.seed = None,
        "--stratify" => settings.preprocess.stratify = true,
        "--test-fraction" => {
            settings.preprocess.test_fraction = value
                .parse::<f64>()
                .map_err(|_| format!("Invalid --test-fraction value: {value}"))?;
        }
        "--missing" => {
            settings.preprocess.missing = match value {
                "drop_rows" | "drop" => MissingPolicy::DropRows,
                "impute_mean" | "mean" => MissingPolicy::ImputeMean,
                "impute_median" | "median" => MissingPolicy::ImputeMedian,
                other => return Err(format!("Invalid --missing value: {other}")),
            };
        }
        "--scaling" => {
            settings.preprocess.scaling = match value {
                "standard" => Scaling::Standard,
                "min_max" | "minmax" => Scaling::MinMax,
                "none" => Scaling::None,
                other => return Err(format!("Invalid --scaling value: {other}")),
            };
        }
        "--averaging" => settings.training.averaging = value.parse::<Averaging>()?,
        "--delimiter" => {
            settings.dataset.delimiter = match value {
                "tab" | "\\t" => '\t',
                other => other
                    .chars()
                    .next()
                    .ok_or_else(|| "--delimiter requires a character".to_string())?,
            };
        }
        "--decimal" => {
            settings.dataset.decimal = value
                .chars()
                .next()
                .ok_or_else(|| "--decimal requires a character".to_string())?;
        }
        _ => {}
    }
    Ok(())
}

fn help_text() -> String {
    [
        "Usage: tabpredict-train [options]",
        "",
        "Trains the configured classifier, prints held-out metrics and saves the model.",
        "",
        "Options:",
        "  --config <file>          Settings file (defaults to the app config.toml)",
        "  --data <csv>             Dataset path",
        "  --label <column>         Label column",
        "  --features <a,b,c>       Feature columns (default: every numeric non-label column)",
        "  --model <kind>           logistic_regression | random_forest | gradient_boosted_stumps",
        "  --out <file>             Model artifact path",
        "  --seed <n>               Seed for the split and the model",
        "  --random-seed            Draw a fresh seed from the OS",
        "  --test-fraction <f>      Held-out share, e.g. 0.2",
        "  --stratify               Keep class proportions in both partitions",
        "  --missing <policy>       drop_rows | impute_mean | impute_median",
        "  --scaling <kind>         standard | min_max | none",
        "  --averaging <kind>       macro | weighted",
        "  --delimiter <c>          , ; or tab",
        "  --decimal <c>            . or ,",
    ]
    .join("\n")
}
