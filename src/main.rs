// src/main.rs
//
// Batch scorer: loads one or more race card files, scores every race
// concurrently and prints a verdict table (or JSON).

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use velo_oracle::audit::{AuditSink, CsvAuditSink, NullAuditSink, SqliteAuditSink};
use velo_oracle::config::{AuditSinkKind, Config};
use velo_oracle::decision_engine::{RaceSummary, Verdict};
use velo_oracle::metrics;
use velo_oracle::velocity_cache::VelocityCache;
use velo_oracle::{RaceCard, RaceOrchestrator, RaceOutcome, RunError};

#[derive(Parser)]
#[command(name = "velo-oracle")]
#[command(about = "Score horse races with weighted analyzers and emit BACK / LAY / PASS verdicts")]
struct Args {
    /// Race card JSON files (a single race or an array of races)
    #[arg(required = true)]
    races: Vec<PathBuf>,

    /// Print verdicts as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Override the audit sink (csv, sqlite, none)
    #[arg(long)]
    audit: Option<AuditSinkKind>,
}

/// One race in the JSON report
#[derive(Serialize)]
struct RaceReport {
    race_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<RaceSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verdicts: Option<Vec<Verdict>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl RaceReport {
    fn new(race_id: String, result: &Result<RaceOutcome, RunError>) -> Self {
        match result {
            Ok(outcome) => Self {
                race_id,
                summary: Some(outcome.summary()),
                verdicts: Some(outcome.verdicts.clone()),
                error: None,
            },
            Err(e) => Self {
                race_id,
                summary: None,
                verdicts: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(sink) = args.audit {
        config.audit.sink = sink;
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.logging.log_level.as_str()))
        .init();

    info!("🏇 VÉLØ Oracle starting");
    info!("✅ Configuration: Loaded");

    let stats = Arc::new(load_velocity_stats(&config)?);
    let audit = build_audit_sink(&config)?;
    let orchestrator = Arc::new(RaceOrchestrator::new(config.engine.clone(), stats, audit)?);
    info!("✅ Orchestrator: Ready");

    let mut races = Vec::new();
    for path in &args.races {
        let cards = RaceCard::load_json(path)?;
        info!("📥 Loaded {} race(s) from {}", cards.len(), path.display());
        races.extend(cards);
    }

    let results = run_concurrently(orchestrator, races).await?;

    let reports: Vec<RaceReport> = results
        .iter()
        .map(|(race_id, result)| RaceReport::new(race_id.clone(), result))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports).context("Failed to serialize verdicts")?);
    } else {
        print_table(&results);
    }

    if let Some(path) = &config.logging.metrics_path {
        if let Err(e) = metrics::write_to(path) {
            warn!("⚠️ {:#}", e);
        }
    }

    let rejected = results.iter().filter(|(_, r)| r.is_err()).count();
    if rejected > 0 {
        bail!("{} of {} races rejected", rejected, results.len());
    }
    Ok(())
}

fn load_velocity_stats(config: &Config) -> Result<VelocityCache> {
    let cache = VelocityCache::new(config.engine.analyzers.recent_window_days);

    if let Some(path) = &config.data.velocity_csv_path {
        cache.load_csv(path)?;
    }
    if let Some(path) = &config.data.velocity_sqlite_path {
        cache.load_sqlite(path)?;
    }
    if cache.is_empty() {
        warn!("⚠️ No velocity stats loaded; connections and course analyzers will score neutral");
    }
    Ok(cache)
}

fn build_audit_sink(config: &Config) -> Result<Arc<dyn AuditSink>> {
    Ok(match config.audit.sink {
        AuditSinkKind::Csv => {
            if let Some(parent) = config.audit.csv_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).context("Failed to create audit log directory")?;
            }
            Arc::new(CsvAuditSink::new(&config.audit.csv_path)?)
        }
        AuditSinkKind::Sqlite => Arc::new(SqliteAuditSink::open(&config.audit.sqlite_path)?),
        AuditSinkKind::None => {
            info!("🗂️ Audit: disabled");
            Arc::new(NullAuditSink)
        }
    })
}

/// Score every race on the blocking pool; results come back in input order
async fn run_concurrently(
    orchestrator: Arc<RaceOrchestrator>,
    races: Vec<RaceCard>,
) -> Result<Vec<(String, Result<RaceOutcome, RunError>)>> {
    let handles = races.into_iter().map(|race| {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::task::spawn_blocking(move || {
            let result = orchestrator.run_race(&race);
            (race.race_id, result)
        })
    });

    futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.context("Race scoring task panicked"))
        .collect()
}

fn print_table(results: &[(String, Result<RaceOutcome, RunError>)]) {
    for (race_id, result) in results {
        match result {
            Ok(outcome) => {
                let summary = outcome.summary();
                println!(
                    "\n🏁 {} | {} back / {} lay / {} pass",
                    race_id, summary.backs, summary.lays, summary.passes
                );
                println!("{:<24} {:>6} {:>6} {:>6}  {}", "HORSE", "SCORE", "ACTION", "STAKE", "REASON");
                for v in &outcome.verdicts {
                    println!(
                        "{:<24} {:>6.1} {:>6} {:>5.1}%  {}",
                        v.horse_name, v.final_score, v.action.as_str(), v.stake_pct, v.reason
                    );
                }
            }
            Err(e) => error!("❌ {}: {}", race_id, e),
        }
    }
}
