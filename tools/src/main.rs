//! risk-runner: headless scoring run over a transaction CSV.
//!
//! Usage:
//!   risk-runner --input transactions.csv --output-dir ./out
//!   risk-runner --input transactions.csv --output-dir ./out \
//!       --threshold 4 --simulation on --chunk-size 500000

use anyhow::Result;
use riskengine_core::{
    aggregate::SummaryDocument,
    config::{EngineConfig, DEFAULT_CHUNK_SIZE, DEFAULT_THRESHOLD},
    engine::RiskEngine,
    report::{LEDGER_FILE, SUMMARY_FILE},
};
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(input) = arg_value(&args, "--input") else {
        usage("--input is required");
    };
    let Some(output_dir) = arg_value(&args, "--output-dir") else {
        usage("--output-dir is required");
    };
    let threshold =
        parse_arg(&args, "--threshold", DEFAULT_THRESHOLD).unwrap_or_else(|problem| usage(&problem));
    let chunk_size = parse_arg(&args, "--chunk-size", DEFAULT_CHUNK_SIZE)
        .unwrap_or_else(|problem| usage(&problem));
    let simulation = match arg_value(&args, "--simulation").unwrap_or("off") {
        "on" => true,
        "off" => false,
        other => usage(&format!("--simulation must be on or off, got '{other}'")),
    };

    println!("risk-runner");
    println!("  input:      {input}");
    println!("  output_dir: {output_dir}");
    println!("  threshold:  {threshold}");
    println!("  simulation: {}", if simulation { "on" } else { "off" });
    println!("  chunk_size: {chunk_size}");
    println!();

    let config = EngineConfig {
        threshold,
        simulation,
        chunk_size,
        ..EngineConfig::default()
    };

    log::info!("scoring {input} into {output_dir}");
    let engine = RiskEngine::build(config)?;
    let summary = engine.run(Path::new(input), Path::new(output_dir))?;
    print_summary(&summary, output_dir);
    Ok(())
}

fn print_summary(summary: &SummaryDocument, output_dir: &str) {
    println!("=== RUN SUMMARY ===");
    println!("  total rows:     {}", summary.total_rows);
    println!("  parsed rows:    {}", summary.parsed_rows);
    println!("  parse failures: {}", summary.parse_failures);
    println!(
        "  flagged:        {} ({:.2}%)",
        summary.flagged_count, summary.flagged_rate_pct
    );
    println!("  threshold:      {}", summary.threshold);

    if !summary.top_reasons.is_empty() {
        println!();
        println!("=== TOP REASONS ===");
        for reason in &summary.top_reasons {
            println!("  {:<16} {}", reason.code, reason.count);
        }
    }

    println!();
    println!("  ledger:  {}", Path::new(output_dir).join(LEDGER_FILE).display());
    println!("  summary: {}", Path::new(output_dir).join(SUMMARY_FILE).display());
}

fn usage(problem: &str) -> ! {
    eprintln!("error: {problem}");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  risk-runner --input FILE --output-dir DIR");
    eprintln!("              [--threshold N] [--simulation on|off] [--chunk-size N]");
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
