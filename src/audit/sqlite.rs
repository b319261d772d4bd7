//! SQLite audit store: one `audit_runs` row per race run, one
//! `audit_verdicts` row per runner, written in a single transaction.

use super::{score_columns, AuditRecord, AuditSink};
use anyhow::{anyhow, Context, Result};
use log::info;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

pub const AUDIT_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS audit_runs (
        run_id TEXT PRIMARY KEY,
        race_id TEXT NOT NULL,
        recorded_at TEXT NOT NULL,
        runners INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS audit_verdicts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        run_id TEXT NOT NULL REFERENCES audit_runs(run_id),
        position INTEGER NOT NULL,
        horse_name TEXT NOT NULL,
        action TEXT CHECK(action IN ('BACK', 'LAY', 'PASS')) NOT NULL,
        stake_pct REAL NOT NULL,
        final_score REAL NOT NULL,
        rule TEXT,
        gated INTEGER NOT NULL DEFAULT 0,
        connections_score REAL,
        ratings_score REAL,
        form_score REAL,
        course_distance_score REAL,
        market_score REAL,
        reason TEXT NOT NULL,
        scores_json TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_audit_runs_race ON audit_runs(race_id);
    CREATE INDEX IF NOT EXISTS idx_audit_verdicts_run ON audit_verdicts(run_id);
"#;

pub struct SqliteAuditSink {
    conn: Mutex<Connection>,
}

impl SqliteAuditSink {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create audit database directory")?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open audit database: {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to enable WAL mode")?;

        let sink = Self::with_connection(conn)?;
        info!("🗂️ Audit database ready: {}", path.display());
        Ok(sink)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory().context("Failed to open in-memory audit database")?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(AUDIT_SCHEMA)
            .context("Failed to initialize audit schema")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("audit database lock poisoned"))
    }

    pub fn run_count(&self, race_id: &str) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM audit_runs WHERE race_id = ?1",
            params![race_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// (horse, action, stake) of the latest run of a race, in runner order
    pub fn latest_verdicts(&self, race_id: &str) -> Result<Vec<(String, String, f64)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT v.horse_name, v.action, v.stake_pct
             FROM audit_verdicts v
             WHERE v.run_id = (
                 SELECT run_id FROM audit_runs WHERE race_id = ?1
                 ORDER BY recorded_at DESC, rowid DESC LIMIT 1
             )
             ORDER BY v.position",
        )?;

        let rows = stmt
            .query_map(params![race_id], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl AuditSink for SqliteAuditSink {
    fn record(&self, record: &AuditRecord) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().context("Failed to begin audit transaction")?;
        let run_id = record.run_id.to_string();

        tx.execute(
            "INSERT INTO audit_runs (run_id, race_id, recorded_at, runners) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, record.race_id, record.recorded_at.to_rfc3339(), record.verdicts.len() as i64],
        )
        .context("Failed to insert audit run")?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO audit_verdicts (
                    run_id, position, horse_name, action, stake_pct, final_score, rule, gated,
                    connections_score, ratings_score, form_score, course_distance_score, market_score,
                    reason, scores_json
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            )?;

            for (position, verdict) in record.verdicts.iter().enumerate() {
                let [connections, ratings, form, course_distance, market] = score_columns(verdict);
                let scores_json =
                    serde_json::to_string(&verdict.scores).context("Failed to serialize agent scores")?;
                stmt.execute(params![
                    run_id,
                    position as i64,
                    verdict.horse_name,
                    verdict.action.as_str(),
                    verdict.stake_pct,
                    verdict.final_score,
                    verdict.rule.map(|r| r.as_str()),
                    verdict.gated,
                    connections,
                    ratings,
                    form,
                    course_distance,
                    market,
                    verdict.reason,
                    scores_json,
                ])
                .with_context(|| format!("Failed to insert verdict for '{}'", verdict.horse_name))?;
            }
        }

        tx.commit().context("Failed to commit audit transaction")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision_engine::{Action, RuleId, Verdict};

    fn verdict(name: &str, action: Action, stake_pct: f64) -> Verdict {
        Verdict {
            horse_name: name.to_string(),
            final_score: 72.0,
            action,
            stake_pct,
            rule: Some(RuleId::ValueBack),
            gated: false,
            reason: "VALUE_BACK".to_string(),
            scores: Vec::new(),
        }
    }

    #[test]
    fn test_record_and_read_back() {
        let sink = SqliteAuditSink::in_memory().unwrap();
        let record = AuditRecord::new(
            "R1",
            vec![verdict("Zeta", Action::Back, 1.0), verdict("Alpha", Action::Pass, 0.0)],
        );
        sink.record(&record).unwrap();

        assert_eq!(sink.run_count("R1").unwrap(), 1);
        let rows = sink.latest_verdicts("R1").unwrap();
        assert_eq!(
            rows,
            vec![
                ("Zeta".to_string(), "BACK".to_string(), 1.0),
                ("Alpha".to_string(), "PASS".to_string(), 0.0)
            ]
        );
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit").join("oracle.db");
        {
            let sink = SqliteAuditSink::open(&path).unwrap();
            sink.record(&AuditRecord::new("R9", vec![verdict("Kappa", Action::Lay, 0.5)]))
                .unwrap();
        }
        let reopened = SqliteAuditSink::open(&path).unwrap();
        assert_eq!(reopened.run_count("R9").unwrap(), 1);
        assert_eq!(reopened.run_count("R1").unwrap(), 0);
    }
}
