//! On-disk artifact behavior.
//!
//! RULES
//!   1. A completed run leaves exactly two artifacts in the output
//!      directory: the flagged ledger and summary.json.
//!   2. summary.json is written last. If it is missing, the run did
//!      not finish and the other artifacts are untrustworthy.
//!   3. Bad configuration and an unreadable input fail before or
//!      during the run, never after the summary lands.

use std::fs;
use std::path::Path;

use riskengine_core::{
    aggregate::SummaryDocument,
    config::EngineConfig,
    datagen::{self, GeneratorConfig},
    engine::RiskEngine,
    error::EngineError,
    report::{LEDGER_FILE, SUMMARY_FILE},
};

fn write_input(dir: &Path, name: &str, contents: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write input");
    path
}

#[test]
fn run_writes_ledger_and_summary() {
    let _ = env_logger::try_init();
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_input(
        dir.path(),
        "input.csv",
        b"transaction_id,entity_id,timestamp,amount,country,channel\n\
T1,E1,2026-03-01 10:00:00,12000.00,US,wire\n\
T2,E2,2026-03-01 10:01:00,25.00,US,card\n",
    );
    let out_dir = dir.path().join("out");

    let engine = RiskEngine::build(EngineConfig::default()).expect("engine build");
    let summary = engine.run(&input, &out_dir).expect("run");
    assert_eq!(summary.flagged_count, 1);
    assert_eq!(summary.total_rows, 2);

    let ledger_path = out_dir.join(LEDGER_FILE);
    let summary_path = out_dir.join(SUMMARY_FILE);
    assert!(ledger_path.is_file(), "ledger should exist at {ledger_path:?}");
    assert!(summary_path.is_file(), "summary should exist at {summary_path:?}");

    let ledger = fs::read_to_string(&ledger_path).expect("read ledger");
    assert!(ledger.starts_with("transaction_id,risk_score,reasons\n"), "ledger:\n{ledger}");
    assert!(ledger.contains("T1,4,"), "ledger:\n{ledger}");

    let on_disk: SummaryDocument = serde_json::from_str(
        &fs::read_to_string(&summary_path).expect("read summary"),
    )
    .expect("parse summary");
    assert_eq!(on_disk, summary, "the returned summary and the file must agree");
}

#[test]
fn missing_input_is_a_fatal_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = RiskEngine::build(EngineConfig::default()).expect("engine build");

    let err = engine
        .run(&dir.path().join("no-such-file.csv"), &dir.path().join("out"))
        .err()
        .expect("missing input must fail");
    assert!(
        err.to_string().contains("Cannot read"),
        "error should name the unreadable input: {err}"
    );
}

#[test]
fn invalid_config_is_rejected_before_any_input() {
    let config = EngineConfig {
        chunk_size: 0,
        ..EngineConfig::default()
    };
    let err = RiskEngine::build(config).err().expect("zero chunk size must fail");
    assert!(
        matches!(err, EngineError::InvalidConfig { .. }),
        "expected a configuration error, got: {err}"
    );
    assert!(err.to_string().contains("chunk_size"), "error should name the field: {err}");
}

#[test]
fn failed_run_leaves_no_summary() {
    let dir = tempfile::tempdir().expect("tempdir");
    // Invalid UTF-8 in the header makes the whole file unreadable.
    let input = write_input(dir.path(), "broken.csv", b"transaction_id,ent\xFFity\nT1,E1\n");
    let out_dir = dir.path().join("out");

    let engine = RiskEngine::build(EngineConfig::default()).expect("engine build");
    assert!(engine.run(&input, &out_dir).is_err(), "a broken header must fail the run");
    assert!(
        !out_dir.join(SUMMARY_FILE).exists(),
        "an aborted run must not leave a summary behind"
    );
}

#[test]
fn sample_generator_is_deterministic_on_disk() {
    let _ = env_logger::try_init();
    let dir = tempfile::tempdir().expect("tempdir");
    let config = GeneratorConfig {
        rows: 200,
        entities: 10,
        seed: 3,
        ..GeneratorConfig::default()
    };

    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");
    datagen::write_sample_file(&first, &config).expect("first sample");
    datagen::write_sample_file(&second, &config).expect("second sample");
    assert_eq!(
        fs::read(&first).expect("read first"),
        fs::read(&second).expect("read second"),
        "same seed must give byte-identical files"
    );

    let engine = RiskEngine::build(EngineConfig {
        simulation: true,
        ..EngineConfig::default()
    })
    .expect("engine build");
    let summary = engine.run(&first, &dir.path().join("out")).expect("run over sample");
    assert_eq!(summary.total_rows, 200);
    assert_eq!(summary.parse_failures, 0, "generated rows must all parse");
}
