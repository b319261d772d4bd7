//! 📝 CSV Audit Log
//!
//! One row per verdict. A new file gets a header row; an existing file is
//! appended to and entry ids continue from the last row already written.

use super::{score_columns, AuditRecord, AuditSink};
use anyhow::{anyhow, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// CSV row layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRow {
    pub entry_id: u64,
    pub run_id: String,
    pub race_id: String,
    pub recorded_at: String,
    pub horse_name: String,
    pub action: String,
    pub stake_pct: f64,
    pub final_score: f64,
    pub rule: String,
    pub gated: bool,
    pub connections: Option<f64>,
    pub ratings: Option<f64>,
    pub form: Option<f64>,
    pub course_distance: Option<f64>,
    pub market: Option<f64>,
    pub reason: String,
}

struct CsvState {
    writer: csv::Writer<File>,
    next_entry_id: u64,
    entries_logged: u64,
}

pub struct CsvAuditSink {
    path: PathBuf,
    state: Mutex<CsvState>,
}

impl CsvAuditSink {
    /// Open (or create) the audit log at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file_exists = path.exists() && path.metadata().map(|m| m.len() > 0).unwrap_or(false);

        let next_entry_id = if file_exists { last_entry_id(path)? + 1 } else { 1 };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open audit log: {}", path.display()))?;

        let writer = csv::WriterBuilder::new().has_headers(!file_exists).from_writer(file);

        if file_exists {
            info!("📝 Opened existing audit log: {} (next entry #{})", path.display(), next_entry_id);
        } else {
            info!("📝 Created new audit log: {}", path.display());
        }

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(CsvState {
                writer,
                next_entry_id,
                entries_logged: 0,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written by this sink instance
    pub fn entries_logged(&self) -> Result<u64> {
        Ok(self.lock()?.entries_logged)
    }

    pub fn next_entry_id(&self) -> Result<u64> {
        Ok(self.lock()?.next_entry_id)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, CsvState>> {
        self.state.lock().map_err(|_| anyhow!("audit log lock poisoned"))
    }

    /// Read every row back (used for replay and tests)
    pub fn read_rows<P: AsRef<Path>>(path: P) -> Result<Vec<AuditRow>> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open audit log: {}", path.display()))?;
        reader
            .deserialize()
            .collect::<Result<Vec<AuditRow>, csv::Error>>()
            .with_context(|| format!("Failed to parse audit log: {}", path.display()))
    }
}

fn last_entry_id(path: &Path) -> Result<u64> {
    Ok(CsvAuditSink::read_rows(path)?
        .iter()
        .map(|row| row.entry_id)
        .max()
        .unwrap_or(0))
}

impl AuditSink for CsvAuditSink {
    fn record(&self, record: &AuditRecord) -> Result<()> {
        let mut state = self.lock()?;
        let recorded_at = record.recorded_at.to_rfc3339();

        // Rows are not transactional: a failed write can leave part of a race
        // in the file, and the ids already handed out stay used.
        for verdict in &record.verdicts {
            let [connections, ratings, form, course_distance, market] = score_columns(verdict);
            let row = AuditRow {
                entry_id: state.next_entry_id,
                run_id: record.run_id.to_string(),
                race_id: record.race_id.clone(),
                recorded_at: recorded_at.clone(),
                horse_name: verdict.horse_name.clone(),
                action: verdict.action.to_string(),
                stake_pct: verdict.stake_pct,
                final_score: verdict.final_score,
                rule: verdict.rule.map(|r| r.to_string()).unwrap_or_default(),
                gated: verdict.gated,
                connections,
                ratings,
                form,
                course_distance,
                market,
                reason: verdict.reason.clone(),
            };
            state.writer.serialize(&row).context("Failed to write audit row")?;
            state.next_entry_id += 1;
            state.entries_logged += 1;
        }

        state.writer.flush().context("Failed to flush audit log")?;
        Ok(())
    }
}
