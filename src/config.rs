//! Configuration management for the Oracle
//!
//! Loads configuration from environment variables (via .env file) and provides
//! validated, type-safe access to all engine parameters.

use crate::decision_engine::{AggregationWeights, AnalyzerConfig, OracleConfig, PolicyConfig};
use crate::race::RatingKind;
use anyhow::{bail, Context, Result};
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

/// Complete configuration for the Oracle
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub engine: OracleConfig,
    pub data: DataConfig,
    pub audit: AuditConfig,
    pub logging: LoggingConfig,
}

/// Velocity statistics sources
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataConfig {
    /// CSV export of velocity stats
    pub velocity_csv_path: Option<PathBuf>,
    /// SQLite database with a `velocity_stats` table
    pub velocity_sqlite_path: Option<PathBuf>,
}

/// Where race runs are audited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditSinkKind {
    Csv,
    Sqlite,
    None,
}

impl FromStr for AuditSinkKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(AuditSinkKind::Csv),
            "sqlite" => Ok(AuditSinkKind::Sqlite),
            "none" | "off" => Ok(AuditSinkKind::None),
            other => bail!("unknown audit sink '{}' (expected csv, sqlite or none)", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditConfig {
    pub sink: AuditSinkKind,
    /// Path to audit log CSV file
    pub csv_path: PathBuf,
    pub sqlite_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
    /// Prometheus text dump written after each batch
    pub metrics_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: OracleConfig::default(),
            data: DataConfig::default(),
            audit: AuditConfig {
                sink: AuditSinkKind::Csv,
                csv_path: PathBuf::from("./data/oracle_audit.csv"),
                sqlite_path: PathBuf::from("./data/oracle_audit.db"),
            },
            logging: LoggingConfig {
                log_level: "info".to_string(),
                metrics_path: None,
            },
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Reads a .env file in the working directory when present. Unset keys
    /// fall back to defaults; set-but-unparsable keys are an error.
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (ignoring error if not found)
        let _ = dotenv::dotenv();

        let config = Self::from_lookup(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Build from any key → value source (environment, test map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvSource { lookup };
        let defaults = Config::default();
        let w = &defaults.engine.weights;
        let p = &defaults.engine.policy;
        let a = &defaults.engine.analyzers;

        let rating_preference = match env.string("RATING_PREFERENCE") {
            Some(raw) => parse_rating_preference(&raw)?,
            None => a.rating_preference.clone(),
        };

        Ok(Config {
            engine: OracleConfig {
                weights: AggregationWeights {
                    connections: env.get("WEIGHT_CONNECTIONS", w.connections)?,
                    ratings: env.get("WEIGHT_RATINGS", w.ratings)?,
                    form: env.get("WEIGHT_FORM", w.form)?,
                    course_distance: env.get("WEIGHT_COURSE_DISTANCE", w.course_distance)?,
                    market: env.get("WEIGHT_MARKET", w.market)?,
                },
                policy: PolicyConfig {
                    strong_back_score: env.get("STRONG_BACK_SCORE", p.strong_back_score)?,
                    value_back_score: env.get("VALUE_BACK_SCORE", p.value_back_score)?,
                    lay_score: env.get("LAY_SCORE", p.lay_score)?,
                    strong_back_stake_pct: env.get("STRONG_BACK_STAKE_PCT", p.strong_back_stake_pct)?,
                    value_back_stake_pct: env.get("VALUE_BACK_STAKE_PCT", p.value_back_stake_pct)?,
                    lay_stake_pct: env.get("LAY_STAKE_PCT", p.lay_stake_pct)?,
                    odds_min: env.get("ODDS_MIN", p.odds_min)?,
                    odds_max: env.get("ODDS_MAX", p.odds_max)?,
                },
                analyzers: AnalyzerConfig {
                    form_base: env.get("FORM_BASE", a.form_base)?,
                    connections_base: env.get("CONNECTIONS_BASE", a.connections_base)?,
                    course_distance_base: env.get("COURSE_DISTANCE_BASE", a.course_distance_base)?,
                    ratings_base: env.get("RATINGS_BASE", a.ratings_base)?,
                    market_base: env.get("MARKET_BASE", a.market_base)?,
                    hot_trainer_sr: env.get("HOT_TRAINER_SR", a.hot_trainer_sr)?,
                    hot_jockey_sr: env.get("HOT_JOCKEY_SR", a.hot_jockey_sr)?,
                    recent_window_days: env.get("RECENT_WINDOW_DAYS", a.recent_window_days)?,
                    specialist_sr: env.get("SPECIALIST_SR", a.specialist_sr)?,
                    proven_sr: env.get("PROVEN_SR", a.proven_sr)?,
                    rating_margin: env.get("RATING_MARGIN", a.rating_margin)?,
                    rating_preference,
                    sweet_spot_min: env.get("SWEET_SPOT_MIN", a.sweet_spot_min)?,
                    sweet_spot_max: env.get("SWEET_SPOT_MAX", a.sweet_spot_max)?,
                },
            },
            data: DataConfig {
                velocity_csv_path: env.string("VELOCITY_CSV_PATH").map(PathBuf::from),
                velocity_sqlite_path: env.string("VELOCITY_SQLITE_PATH").map(PathBuf::from),
            },
            audit: AuditConfig {
                sink: env.get("AUDIT_SINK", defaults.audit.sink)?,
                csv_path: env
                    .string("AUDIT_CSV_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.audit.csv_path),
                sqlite_path: env
                    .string("AUDIT_SQLITE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.audit.sqlite_path),
            },
            logging: LoggingConfig {
                log_level: env.string("LOG_LEVEL").unwrap_or(defaults.logging.log_level),
                metrics_path: env.string("METRICS_PATH").map(PathBuf::from),
            },
        })
    }

    /// Validate configuration values are within acceptable ranges
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;

        match self.logging.log_level.to_ascii_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" | "off" => {}
            other => bail!("LOG_LEVEL must be one of error, warn, info, debug, trace, off (got {})", other),
        }

        Ok(())
    }
}

struct EnvSource<F> {
    lookup: F,
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-empty value for `key`
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.string(key) {
            Some(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("{}", e))
                .with_context(|| format!("Invalid {} value '{}'", key, raw)),
            None => Ok(default),
        }
    }
}

fn parse_rating_preference(raw: &str) -> Result<Vec<RatingKind>> {
    let mut kinds = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let kind = RatingKind::parse(part).with_context(|| format!("Invalid RATING_PREFERENCE entry '{}'", part))?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.policy.odds_min, 3.0);
        assert_eq!(config.engine.weights.connections, 0.25);
        assert_eq!(config.audit.sink, AuditSinkKind::Csv);
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("STRONG_BACK_SCORE", "75"),
            ("ODDS_MAX", "16.0"),
            ("RECENT_WINDOW_DAYS", "21"),
            ("RATING_PREFERENCE", "rpr, or"),
            ("AUDIT_SINK", "SQLite"),
            ("VELOCITY_CSV_PATH", "./data/velocity.csv"),
            ("METRICS_PATH", "  "),
        ])
        .unwrap();

        assert_eq!(config.engine.policy.strong_back_score, 75.0);
        assert_eq!(config.engine.policy.odds_max, 16.0);
        assert_eq!(config.engine.analyzers.recent_window_days, 21);
        assert_eq!(
            config.engine.analyzers.rating_preference,
            vec![RatingKind::RacingPost, RatingKind::Official]
        );
        assert_eq!(config.audit.sink, AuditSinkKind::Sqlite);
        assert_eq!(config.data.velocity_csv_path, Some(PathBuf::from("./data/velocity.csv")));
        assert_eq!(config.logging.metrics_path, None);
    }

    #[test]
    fn test_unparsable_value_is_an_error() {
        let err = from_pairs(&[("LAY_SCORE", "forty")]).unwrap_err();
        assert!(format!("{:#}", err).contains("LAY_SCORE"));

        assert!(from_pairs(&[("AUDIT_SINK", "kafka")]).is_err());
        assert!(from_pairs(&[("RATING_PREFERENCE", "elo")]).is_err());
    }

    #[test]
    fn test_validation_catches_bad_combinations() {
        let config = from_pairs(&[("WEIGHT_MARKET", "0.30")]).unwrap();
        assert!(config.validate().is_err());

        let config = from_pairs(&[("VALUE_BACK_SCORE", "75")]).unwrap();
        assert!(config.validate().is_err());

        let config = from_pairs(&[("ODDS_MIN", "25")]).unwrap();
        assert!(config.validate().is_err());

        let config = from_pairs(&[("LOG_LEVEL", "loud")]).unwrap();
        assert!(config.validate().is_err());
    }
}
