//! Developer utility to write the synthetic sports dataset as CSV.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use tabpredict::synthetic;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    rows: usize,
    seed: u64,
    missing_pct: f64,
    out: Option<PathBuf>,
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    let mut table = synthetic::generate_sports(options.rows, options.seed);
    table.inject_missing(options.missing_pct / 100.0, options.seed);
    match &options.out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|err| format!("Create {} failed: {err}", parent.display()))?;
            }
            let file = File::create(path)
                .map_err(|err| format!("Create {} failed: {err}", path.display()))?;
            table
                .write_csv(BufWriter::new(file))
                .map_err(|err| format!("Write {} failed: {err}", path.display()))?;
            eprintln!(
                "wrote {} rows ({} missing cells) to {}",
                table.row_count(),
                table.missing_cells(),
                path.display()
            );
        }
        None => table
            .write_csv(io::stdout().lock())
            .map_err(|err| format!("Write failed: {err}"))?,
    }
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<Option<CliOptions>, String> {
    let mut options = CliOptions {
        rows: 300,
        seed: 42,
        missing_pct: 0.0,
        out: None,
    };
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                return Ok(None);
            }
            "--rows" => {
                let value = it.next().ok_or_else(|| "--rows requires a value".to_string())?;
                options.rows = value
                    .parse()
                    .map_err(|_| format!("Invalid --rows value: {value}"))?;
            }
            "--seed" => {
                let value = it.next().ok_or_else(|| "--seed requires a value".to_string())?;
                options.seed = value
                    .parse()
                    .map_err(|_| format!("Invalid --seed value: {value}"))?;
            }
            "--missing" => {
                let value = it
                    .next()
                    .ok_or_else(|| "--missing requires a value".to_string())?;
                let pct: f64 = value
                    .parse()
                    .map_err(|_| format!("Invalid --missing value: {value}"))?;
                if !(0.0..=30.0).contains(&pct) {
                    return Err(format!("--missing must be between 0 and 30, got {value}"));
                }
                options.missing_pct = pct;
            }
            "--out" => {
                let value = it.next().ok_or_else(|| "--out requires a value".to_string())?;
                options.out = Some(PathBuf::from(value));
            }
            _ => return Err(format!("Unknown argument: {arg}")),
        }
    }
    Ok(Some(options))
}

fn print_help() {
    println!("Usage: tabpredict-synth [--rows <n>] [--seed <n>] [--missing <pct>] [--out <file>]");
    println!();
    println!("Options:");
    println!("  --rows <n>       Number of players (default 300)");
    println!("  --seed <n>       Generator seed (default 42)");
    println!("  --missing <pct>  Blank this share of cells, 0-30 (default 0)");
    println!("  --out <file>     Output path (defaults to stdout)");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn defaults_match_the_download_link() {
        let options = parse_args(Vec::new()).unwrap().unwrap();
        assert_eq!((options.rows, options.seed), (300, 42));
        assert_eq!(options.missing_pct, 0.0);
        assert!(options.out.is_none());
    }

    #[test]
    fn parses_every_flag() {
        let options = parse_args(args(&[
            "--rows", "50", "--seed", "7", "--missing", "15", "--out", "data/s.csv",
        ]))
        .unwrap()
        .unwrap();
        assert_eq!((options.rows, options.seed), (50, 7));
        assert_eq!(options.missing_pct, 15.0);
        assert_eq!(options.out, Some(PathBuf::from("data/s.csv")));
    }

    #[test]
    fn rejects_out_of_range_missing_and_bad_numbers() {
        assert!(parse_args(args(&["--missing", "45"])).is_err());
        assert!(parse_args(args(&["--missing", "-1"])).is_err());
        assert!(parse_args(args(&["--rows", "ten"])).is_err());
        assert!(parse_args(args(&["--seed"])).is_err());
        assert!(parse_args(args(&["--bogus"])).is_err());
    }
}
