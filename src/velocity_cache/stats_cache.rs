//! 🗂️ Velocity Statistics Cache
//!
//! Lock-free cache of trainer/jockey/horse records, loaded before scoring from a
//! historical CSV export or the SQLite `velocity_stats` table. Scoring only
//! reads from it, so one cache can serve every race on a card concurrently.

use super::velocity_stat::{StatWindow, VelocityKey, VelocityStat};
use super::VelocityStore;
use anyhow::{bail, Context, Result};
use dashmap::DashMap;
use log::{debug, info, warn};
use rusqlite::Connection;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Schema of the SQLite source table (same columns as the CSV export)
pub const VELOCITY_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS velocity_stats (
    kind TEXT NOT NULL CHECK(kind IN ('trainer', 'jockey', 'horse')),
    name TEXT NOT NULL,
    context TEXT,
    context_value TEXT,
    window_days INTEGER,
    wins INTEGER NOT NULL,
    runs INTEGER NOT NULL,
    profit_loss REAL
);
CREATE INDEX IF NOT EXISTS idx_velocity_kind_name ON velocity_stats(kind, name);
"#;

/// Raw row as exported by the ingestion jobs
///
/// `window_days` empty/0 means lifetime; otherwise the row covers the last N days.
#[derive(Debug, Clone, Deserialize)]
pub struct VelocityRow {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub context_value: Option<String>,
    #[serde(default)]
    pub window_days: Option<u32>,
    pub wins: u32,
    pub runs: u32,
    #[serde(default)]
    pub profit_loss: Option<f64>,
}

impl VelocityRow {
    /// Convert into a statistic
    ///
    /// Returns `Ok(None)` for recent rows whose window differs from the one
    /// this store serves; malformed rows are errors.
    pub fn into_stat(self, recent_window_days: u32) -> Result<Option<VelocityStat>> {
        if self.name.trim().is_empty() {
            bail!("row has an empty name");
        }
        if self.wins > self.runs {
            bail!("'{}' has more wins ({}) than runs ({})", self.name, self.wins, self.runs);
        }

        let window = match self.window_days {
            None | Some(0) => StatWindow::Lifetime,
            Some(days) if days == recent_window_days => StatWindow::Recent,
            Some(days) => {
                debug!("Skipping {}d row for '{}' (serving {}d)", days, self.name, recent_window_days);
                return Ok(None);
            }
        };

        let key = match self.kind.trim().to_ascii_lowercase().as_str() {
            "trainer" => VelocityKey::trainer(&self.name),
            "jockey" => VelocityKey::jockey(&self.name),
            "horse" => {
                let value = self
                    .context_value
                    .as_deref()
                    .filter(|v| !v.trim().is_empty())
                    .with_context(|| format!("horse row '{}' has no context value", self.name))?;
                match self.context.as_deref().map(|c| c.trim().to_ascii_lowercase()) {
                    Some(c) if c == "course" => VelocityKey::horse_at_course(&self.name, value),
                    Some(c) if c == "distance" => VelocityKey::horse_at_distance(&self.name, value),
                    Some(c) if c == "going" => VelocityKey::horse_on_going(&self.name, value),
                    other => bail!("horse row '{}' has unknown context {:?}", self.name, other),
                }
            }
            other => bail!("unknown entity kind '{}'", other),
        };

        let mut stat = VelocityStat::new(key, window, self.wins, self.runs);
        stat.profit_loss = self.profit_loss;
        Ok(Some(stat))
    }
}

/// Lock-free cache of velocity statistics
#[derive(Clone)]
pub struct VelocityCache {
    cache: Arc<DashMap<(VelocityKey, StatWindow), VelocityStat>>,
    recent_window_days: u32,
}

impl VelocityCache {
    /// Create an empty cache serving `recent_window_days`-day recent stats
    pub fn new(recent_window_days: u32) -> Self {
        Self {
            cache: Arc::new(DashMap::new()),
            recent_window_days,
        }
    }

    /// Build a cache from already-constructed statistics
    pub fn from_stats<I: IntoIterator<Item = VelocityStat>>(recent_window_days: u32, stats: I) -> Self {
        let cache = Self::new(recent_window_days);
        for stat in stats {
            cache.insert(stat);
        }
        cache
    }

    /// Insert or replace the statistic for its key and window
    pub fn insert(&self, stat: VelocityStat) {
        self.cache.insert((stat.key.clone(), stat.window), stat);
    }

    /// Get a statistic (returns None if not in cache)
    pub fn get(&self, key: &VelocityKey, window: StatWindow) -> Option<VelocityStat> {
        self.cache
            .get(&(key.clone(), window))
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn recent_window_days(&self) -> u32 {
        self.recent_window_days
    }

    /// Load rows from a CSV export; returns the number of statistics cached
    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("Failed to open velocity CSV: {}", path.display()))?;

        let mut loaded = 0;
        for (line, row) in reader.deserialize::<VelocityRow>().enumerate() {
            let row = match row {
                Ok(r) => r,
                Err(e) => {
                    warn!("⚠️  Skipping unreadable velocity row {}: {}", line + 2, e);
                    continue;
                }
            };
            loaded += self.ingest(row, line + 2);
        }

        info!("📈 Velocity cache: {} stats from {}", loaded, path.display());
        Ok(loaded)
    }

    /// Load rows from the SQLite `velocity_stats` table
    pub fn load_sqlite<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open velocity database: {}", path.display()))?;
        let loaded = self.load_from_connection(&conn)?;
        info!("📈 Velocity cache: {} stats from {}", loaded, path.display());
        Ok(loaded)
    }

    /// Load rows from an open connection
    pub fn load_from_connection(&self, conn: &Connection) -> Result<usize> {
        let mut stmt = conn
            .prepare(
                "SELECT kind, name, context, context_value, window_days, wins, runs, profit_loss
                 FROM velocity_stats",
            )
            .context("Failed to query velocity_stats")?;

        let rows = stmt.query_map([], |row| {
            Ok(VelocityRow {
                kind: row.get(0)?,
                name: row.get(1)?,
                context: row.get(2)?,
                context_value: row.get(3)?,
                window_days: row.get(4)?,
                wins: row.get(5)?,
                runs: row.get(6)?,
                profit_loss: row.get(7)?,
            })
        })?;

        let mut loaded = 0;
        for (index, row) in rows.enumerate() {
            match row {
                Ok(r) => loaded += self.ingest(r, index + 1),
                Err(e) => warn!("⚠️  Skipping unreadable velocity row {}: {}", index + 1, e),
            }
        }
        Ok(loaded)
    }

    fn ingest(&self, row: VelocityRow, line: usize) -> usize {
        match row.into_stat(self.recent_window_days) {
            Ok(Some(stat)) => {
                self.insert(stat);
                1
            }
            Ok(None) => 0,
            Err(e) => {
                warn!("⚠️  Rejected velocity row {}: {}", line, e);
                0
            }
        }
    }
}

impl VelocityStore for VelocityCache {
    fn lookup(&self, key: &VelocityKey, window: StatWindow) -> Option<VelocityStat> {
        self.get(key, window)
    }

    fn recent_window_days(&self) -> Option<u32> {
        Some(self.recent_window_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    const CSV: &str = "\
kind,name,context,context_value,window_days,wins,runs,profit_loss
trainer,W P Mullins,,,14,9,30,12.5
trainer,W P Mullins,,,,400,1500,-80.0
jockey,P Townend,,,14,5,20,
horse,Galopin Des Champs,course,Leopardstown,,4,5,6.0
horse,Galopin Des Champs,going,Soft,,2,3,
trainer,Old Window,,,30,1,4,
trainer,Bad Row,,,14,5,3,
alien,Who,,,14,1,2,
";

    #[test]
    fn test_load_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("velocity.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(CSV.as_bytes()).unwrap();

        let cache = VelocityCache::new(14);
        let loaded = cache.load_csv(&path).unwrap();

        // 30-day row skipped, wins>runs and unknown kind rejected
        assert_eq!(loaded, 5);
        assert_eq!(cache.len(), 5);

        let recent = cache.get(&VelocityKey::trainer("w p mullins"), StatWindow::Recent).unwrap();
        assert_eq!(recent.strike_rate(), Some(30.0));
        assert_eq!(recent.profit_loss, Some(12.5));

        let lifetime = cache.get(&VelocityKey::trainer("W P Mullins"), StatWindow::Lifetime).unwrap();
        assert_eq!(lifetime.record(), "400-1500");

        let jockey = cache.get(&VelocityKey::jockey("P Townend"), StatWindow::Recent).unwrap();
        assert_eq!(jockey.profit_loss, None);

        let course = cache
            .lookup(&VelocityKey::horse_at_course("Galopin Des Champs", "Leopardstown"), StatWindow::Lifetime)
            .unwrap();
        assert_eq!(course.strike_rate(), Some(80.0));

        assert!(cache.get(&VelocityKey::trainer("Old Window"), StatWindow::Recent).is_none());
        assert!(cache.get(&VelocityKey::trainer("Bad Row"), StatWindow::Recent).is_none());
    }

    #[test]
    fn test_load_sqlite() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(VELOCITY_SCHEMA).unwrap();
        conn.execute_batch(
            "INSERT INTO velocity_stats VALUES ('jockey', 'R Moore', NULL, NULL, 14, 6, 24, 3.25);
             INSERT INTO velocity_stats VALUES ('horse', 'Kyprios', 'distance', '2m', NULL, 3, 4, NULL);
             INSERT INTO velocity_stats VALUES ('horse', 'Kyprios', NULL, NULL, NULL, 3, 4, NULL);",
        )
        .unwrap();

        let cache = VelocityCache::new(14);
        let loaded = cache.load_from_connection(&conn).unwrap();
        assert_eq!(loaded, 2);

        let jockey = cache.get(&VelocityKey::jockey("r moore"), StatWindow::Recent).unwrap();
        assert_eq!(jockey.strike_rate(), Some(25.0));
        assert_eq!(jockey.is_profitable(), Some(true));

        let distance = cache
            .get(&VelocityKey::horse_at_distance("Kyprios", "2M"), StatWindow::Lifetime)
            .unwrap();
        assert_eq!(distance.strike_rate(), Some(75.0));
    }

    #[test]
    fn test_missing_is_not_found() {
        let cache = VelocityCache::new(14);
        assert!(cache.is_empty());
        assert!(cache.lookup(&VelocityKey::trainer("Nobody"), StatWindow::Recent).is_none());
    }

    #[test]
    fn test_row_window_mapping() {
        let row = VelocityRow {
            kind: "trainer".into(),
            name: "A O'Brien".into(),
            context: None,
            context_value: None,
            window_days: Some(0),
            wins: 1,
            runs: 2,
            profit_loss: None,
        };
        let stat = row.into_stat(14).unwrap().unwrap();
        assert_eq!(stat.window, StatWindow::Lifetime);
    }
}
