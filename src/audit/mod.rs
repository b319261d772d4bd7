//! 🗂️ Audit Trail
//!
//! Every completed race run is handed to an `AuditSink` together with a run id
//! and timestamp so any verdict can be reconstructed later. Sinks are
//! best-effort from the orchestrator's point of view: a failed write is
//! logged and counted, never allowed to drop the verdicts.

pub mod csv_log;
pub mod sqlite;

pub use csv_log::CsvAuditSink;
pub use sqlite::SqliteAuditSink;

use crate::decision_engine::Verdict;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One race run as persisted by a sink
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub run_id: Uuid,
    pub race_id: String,
    pub recorded_at: DateTime<Utc>,
    pub verdicts: Vec<Verdict>,
}

impl AuditRecord {
    pub fn new(race_id: impl Into<String>, verdicts: Vec<Verdict>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            race_id: race_id.into(),
            recorded_at: Utc::now(),
            verdicts,
        }
    }
}

/// Destination for race-run audit records
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord) -> Result<()>;
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _record: &AuditRecord) -> Result<()> {
        Ok(())
    }
}

/// Fixed-order per-analyzer score columns shared by the persistent sinks
pub(crate) fn score_columns(verdict: &Verdict) -> [Option<f64>; 5] {
    use crate::decision_engine::AnalyzerKind;

    let mut columns = [None; 5];
    for (slot, kind) in AnalyzerKind::ALL.iter().enumerate() {
        columns[slot] = verdict.scores.iter().find(|s| s.analyzer == *kind).map(|s| s.score);
    }
    columns
}
