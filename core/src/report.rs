//! Run artifacts: the flagged ledger and the summary document.
//!
//! The ledger streams: one append per flagged transaction as it is
//! discovered, one flush per chunk, never an unbounded buffer. The
//! summary is written once, after the last chunk, so a missing
//! summary.json marks an incomplete run.

use crate::aggregate::SummaryDocument;
use crate::error::EngineResult;
use crate::rules::ScoredTransaction;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// File name of the streamed flagged-transaction table.
pub const LEDGER_FILE: &str = "flagged_transactions.csv";

/// File name of the final run summary.
pub const SUMMARY_FILE: &str = "summary.json";

/// Separator between reason descriptions in the ledger's reasons column.
const REASON_SEPARATOR: &str = "; ";

/// Streaming writer for the flagged ledger. Lifecycle: create (header
/// goes out immediately), append per flagged row, flush per chunk,
/// finish at end of run.
pub struct LedgerWriter<W: Write> {
    writer: csv::Writer<W>,
    appended: u64,
}

impl LedgerWriter<File> {
    /// Create the ledger file and write its header.
    pub fn create(path: &Path) -> EngineResult<Self> {
        let file = File::create(path)
            .map_err(|e| anyhow::anyhow!("Cannot create {}: {e}", path.display()))?;
        Self::from_writer(file)
    }
}

impl<W: Write> LedgerWriter<W> {
    /// Wrap any writer. Tests use this with an in-memory buffer.
    pub fn from_writer(inner: W) -> EngineResult<Self> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(["transaction_id", "risk_score", "reasons"])?;
        Ok(Self {
            writer,
            appended: 0,
        })
    }

    /// Append one flagged transaction, reasons joined for display.
    pub fn append(&mut self, scored: &ScoredTransaction) -> EngineResult<()> {
        let reasons = scored
            .reasons
            .iter()
            .map(|reason| reason.description.as_str())
            .collect::<Vec<_>>()
            .join(REASON_SEPARATOR);
        self.writer.write_record([
            scored.transaction.transaction_id.as_str(),
            scored.score.to_string().as_str(),
            reasons.as_str(),
        ])?;
        self.appended += 1;
        Ok(())
    }

    /// Push buffered rows down to the underlying writer.
    pub fn flush(&mut self) -> EngineResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Rows appended so far.
    pub fn appended(&self) -> u64 {
        self.appended
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(self) -> EngineResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Cannot finish ledger: {}", e.error()).into())
    }
}

/// Write the summary document. Called exactly once per run, after the
/// final chunk has been processed and the ledger flushed.
pub fn write_summary(path: &Path, summary: &SummaryDocument) -> EngineResult<()> {
    let mut file = File::create(path)
        .map_err(|e| anyhow::anyhow!("Cannot create {}: {e}", path.display()))?;
    serde_json::to_writer_pretty(&mut file, summary)?;
    file.write_all(b"\n")?;
    Ok(())
}
