//! txgen: deterministic sample transaction CSV generator.
//!
//! Usage:
//!   txgen --out transactions.csv --rows 100000 --entities 500 --seed 42

use anyhow::Result;
use riskengine_core::datagen::{write_sample_file, GeneratorConfig};
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(out) = arg_value(&args, "--out") else {
        usage("--out is required");
    };

    let defaults = GeneratorConfig::default();
    let config = GeneratorConfig {
        rows: parse_arg(&args, "--rows", defaults.rows).unwrap_or_else(|problem| usage(&problem)),
        entities: parse_arg(&args, "--entities", defaults.entities)
            .unwrap_or_else(|problem| usage(&problem)),
        seed: parse_arg(&args, "--seed", defaults.seed).unwrap_or_else(|problem| usage(&problem)),
        anomaly_rate: parse_arg(&args, "--anomaly-rate", defaults.anomaly_rate)
            .unwrap_or_else(|problem| usage(&problem)),
    };

    println!("txgen");
    println!("  out:          {out}");
    println!("  rows:         {}", config.rows);
    println!("  entities:     {}", config.entities);
    println!("  seed:         {}", config.seed);
    println!("  anomaly rate: {}", config.anomaly_rate);

    write_sample_file(Path::new(out), &config)?;
    println!();
    println!("Wrote {} rows to {out}", config.rows);
    Ok(())
}

fn usage(problem: &str) -> ! {
    eprintln!("error: {problem}");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  txgen --out FILE [--rows N] [--entities N] [--seed N] [--anomaly-rate X]");
    std::process::exit(2)
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|window| window[0] == flag)
        .map(|window| window[1].as_str())
}

/// An absent flag reads as its default; a flag whose value does not
/// parse is an error, never a silent fallback.
fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> Result<T, String> {
    match arg_value(args, flag) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("{flag} expects a numeric value, got '{raw}'")),
    }
}
