//! The risk engine: chunked scoring over a transaction CSV.
//!
//! PIPELINE ORDER (fixed, documented, never reordered):
//!   1. Pull up to chunk_size raw rows from the reader.
//!   2. Parse each row; failures are counted and skipped.
//!   3. Observe velocity state (simulation mode only, file order).
//!   4. Evaluate the rule catalog.
//!   5. Flag when score >= threshold; append flagged rows to the ledger.
//!   6. Fold every outcome into the aggregator; flush the ledger.
//!   7. After the last chunk: write summary.json.
//!
//! RULES:
//!   - Chunks run strictly sequentially, in file order.
//!   - Velocity state is the only thing that outlives a chunk.
//!   - A malformed row never aborts the run; an unreadable source does.

use crate::aggregate::{RunAggregator, SummaryDocument};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::report::{write_summary, LedgerWriter, LEDGER_FILE, SUMMARY_FILE};
use crate::rules::RuleSet;
use crate::transaction::{parse_row, ParseFailure};
use crate::velocity::VelocitySimulator;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

pub struct RiskEngine {
    config: EngineConfig,
    rules: RuleSet,
    velocity: Option<VelocitySimulator>,
    aggregator: RunAggregator,
}

impl RiskEngine {
    /// Build a fully wired engine. A bad config or a malformed rule
    /// catalog is rejected here, before any input is touched.
    pub fn build(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let rules = RuleSet::standard()?;
        let velocity = config
            .simulation
            .then(|| VelocitySimulator::new(config.velocity.clone()));
        log::info!(
            "engine ready: {} rules, threshold {}, simulation {}",
            rules.len(),
            config.threshold,
            if config.simulation { "on" } else { "off" }
        );
        Ok(Self {
            config,
            rules,
            velocity,
            aggregator: RunAggregator::new(),
        })
    }

    /// Score a transaction file end to end, leaving both artifacts in
    /// output_dir. Consumes the engine: one engine, one run.
    pub fn run(self, input: &Path, output_dir: &Path) -> EngineResult<SummaryDocument> {
        let file = File::open(input)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", input.display()))?;
        std::fs::create_dir_all(output_dir)
            .map_err(|e| anyhow::anyhow!("Cannot create {}: {e}", output_dir.display()))?;

        let mut ledger = LedgerWriter::create(&output_dir.join(LEDGER_FILE))?;
        let summary = self.process(file, &mut ledger)?;
        ledger.finish()?;

        // Written last: its presence marks a completed run.
        write_summary(&output_dir.join(SUMMARY_FILE), &summary)?;
        Ok(summary)
    }

    /// The chunk loop over any reader. Public so tests can drive the
    /// pipeline with in-memory input and an in-memory ledger.
    pub fn process<R: Read, W: Write>(
        mut self,
        input: R,
        ledger: &mut LedgerWriter<W>,
    ) -> EngineResult<SummaryDocument> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);

        // An empty input has no header row and therefore no records;
        // that is a zero-row run, not an error.
        let headers = reader.headers()?.clone();
        let mut records = reader.into_records();
        let mut chunks_done = 0u64;

        loop {
            let mut rows_in_chunk = 0usize;
            let mut exhausted = false;

            while rows_in_chunk < self.config.chunk_size {
                match records.next() {
                    None => {
                        exhausted = true;
                        break;
                    }
                    Some(Ok(record)) => {
                        rows_in_chunk += 1;
                        self.score_row(&headers, &record, ledger)?;
                    }
                    Some(Err(err)) => {
                        // A mid-stream I/O failure means the source
                        // itself went bad: fatal. Anything else is a
                        // row-local decode problem.
                        if matches!(err.kind(), csv::ErrorKind::Io(_)) {
                            return Err(err.into());
                        }
                        rows_in_chunk += 1;
                        self.record_failure(&ParseFailure::UnreadableRow {
                            message: err.to_string(),
                        });
                    }
                }
            }

            if rows_in_chunk > 0 {
                ledger.flush()?;
                chunks_done += 1;
                log::info!(
                    "chunk {chunks_done}: {rows_in_chunk} rows in, {} flagged so far, {} parse failures",
                    ledger.appended(),
                    self.aggregator.parse_failures()
                );
            }

            if exhausted {
                break;
            }
        }

        if let Some(simulator) = &self.velocity {
            log::info!(
                "velocity state held {} entities at run end",
                simulator.tracked_entities()
            );
        }
        if self.aggregator.parse_failures() > 0 {
            log::warn!(
                "{} of {} rows failed to parse and were skipped",
                self.aggregator.parse_failures(),
                self.aggregator.total_rows()
            );
        }

        let summary = self.aggregator.summarize(&self.config);
        log::info!(
            "run complete: {} rows, {} flagged, {} parse failures",
            summary.total_rows,
            summary.flagged_count,
            summary.parse_failures
        );
        Ok(summary)
    }

    fn score_row<W: Write>(
        &mut self,
        headers: &csv::StringRecord,
        record: &csv::StringRecord,
        ledger: &mut LedgerWriter<W>,
    ) -> EngineResult<()> {
        let transaction = match parse_row(headers, record) {
            Ok(transaction) => transaction,
            Err(failure) => {
                self.record_failure(&failure);
                return Ok(());
            }
        };

        // One observation per parsed transaction, before evaluation,
        // so the velocity rule sees a window that already includes
        // this transaction.
        let sample = self
            .velocity
            .as_mut()
            .map(|simulator| simulator.observe(&transaction.entity_id, transaction.epoch_secs()));

        let scored = self.rules.evaluate(transaction, sample.as_ref());
        let flagged = scored.is_flagged(self.config.threshold);
        if flagged {
            ledger.append(&scored)?;
        }
        self.aggregator.record_scored(&scored, flagged);
        Ok(())
    }

    fn record_failure(&mut self, failure: &ParseFailure) {
        log::debug!("row {}: {failure}", self.aggregator.total_rows() + 1);
        self.aggregator.record_failure();
    }
}
