//! Developer utility to score a saved model against a labeled CSV.

use std::path::PathBuf;

use tabpredict::config::{self, Settings};
use tabpredict::dataset::{DatasetSchema, load_dataset};
use tabpredict::ml::metrics::{Averaging, ConfusionMatrix};
use tabpredict::{store, workflow};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    config_path: Option<PathBuf>,
    model_path: Option<PathBuf>,
    data_path: Option<PathBuf>,
    averaging: Option<Averaging>,
    top: usize,
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    let settings: Settings = match &options.config_path {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    let model_path = options
        .model_path
        .unwrap_or_else(|| settings.model.path.clone());
    let data_path = options
        .data_path
        .unwrap_or_else(|| settings.dataset.path.clone());
    let averaging = options.averaging.unwrap_or(settings.training.averaging);

    let artifact = store::load(&model_path).map_err(|err| err.to_string())?;
    let schema = DatasetSchema {
        label_column: artifact.label_column.clone(),
        feature_columns: artifact.feature_names().to_vec(),
    };
    let dataset =
        load_dataset(&data_path, &schema, &settings.csv_options()).map_err(|err| err.to_string())?;
    let (report, skipped) =
        workflow::evaluate_artifact(&artifact, &dataset, averaging).map_err(|err| err.to_string())?;

    println!(
        "model {} ({}) created {}",
        artifact.model_id,
        artifact.kind(),
        artifact.created_at
    );
    println!(
        "scored {} of {} rows from {} ({skipped} skipped)",
        report.total,
        dataset.len(),
        data_path.display()
    );
    print!("{report}");

    let confusions = top_confusions(&report.confusion, options.top);
    if !confusions.is_empty() {
        println!();
        println!("Top confusions:");
        for (count, truth, pred) in confusions {
            println!(
                "- {} -> {}: {count}",
                report.classes[truth], report.classes[pred]
            );
        }
    }
    Ok(())
}

/// Off-diagonal `(count, truth, predicted)` cells, most frequent first.
fn top_confusions(confusion: &ConfusionMatrix, limit: usize) -> Vec<(u32, usize, usize)> {
    let mut cells = Vec::new();
    for truth in 0..confusion.n_classes {
        for pred in 0..confusion.n_classes {
            let count = confusion.get(truth, pred);
            if truth != pred && count > 0 {
                cells.push((count, truth, pred));
            }
        }
    }
    cells.sort_by(|a, b| b.0.cmp(&a.0));
    cells.truncate(limit);
    cells
}

fn parse_args(args: Vec<String>) -> Result<Option<CliOptions>, String> {
    let mut options = CliOptions {
        config_path: None,
        model_path: None,
        data_path: None,
        averaging: None,
        top: 10,
    };
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                return Ok(None);
            }
            "--config" => {
                let value = it.next().ok_or_else(|| "--config requires a value".to_string())?;
                options.config_path = Some(PathBuf::from(value));
            }
            "--model" => {
                let value = it.next().ok_or_else(|| "--model requires a value".to_string())?;
                options.model_path = Some(PathBuf::from(value));
            }
            "--data" => {
                let value = it.next().ok_or_else(|| "--data requires a value".to_string())?;
                options.data_path = Some(PathBuf::from(value));
            }
            "--averaging" => {
                let value = it
                    .next()
                    .ok_or_else(|| "--averaging requires a value".to_string())?;
                options.averaging = Some(value.parse()?);
            }
            "--top" => {
                let value = it.next().ok_or_else(|| "--top requires a value".to_string())?;
                options.top = value
                    .parse()
                    .map_err(|_| format!("Invalid --top value: {value}"))?;
            }
            _ => return Err(format!("Unknown argument: {arg}")),
        }
    }
    Ok(Some(options))
}

fn print_help() {
    println!("Usage: tabpredict-eval [--config <file>] [--model <file>] [--data <csv>] [--averaging macro|weighted] [--top <n>]");
    println!();
    println!("Options:");
    println!("  --config <file>     Settings file (defaults to the app config.toml)");
    println!("  --model <file>      Model artifact (defaults to [model].path)");
    println!("  --data <csv>        Labeled CSV (defaults to [dataset].path)");
    println!("  --averaging <kind>  Precision/recall/F1 averaging");
    println!("  --top <n>           Most frequent confusions to list (default 10)");
}
