//! 📊 Prometheus Metrics
//!
//! Process-wide counters for the race pipeline, kept in a lazily built
//! registry. `render()` produces the text exposition format; the CLI writes it
//! to `METRICS_PATH` after a batch run.

use crate::decision_engine::{Action, Verdict};
use anyhow::{Context, Result};
use log::info;
use once_cell::sync::Lazy;
use prometheus::core::Collector;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Global metrics registry
static METRICS: Lazy<Arc<OracleMetrics>> = Lazy::new(|| Arc::new(OracleMetrics::new()));

/// Oracle pipeline metrics
pub struct OracleMetrics {
    registry: Registry,

    // Race counters
    pub races_scored: IntCounter,
    pub races_rejected: IntCounter,

    // Verdicts by action (BACK / LAY / PASS)
    pub verdicts: IntCounterVec,
    pub gated_verdicts: IntCounter,
    pub neutral_scores: IntCounter,

    pub audit_failures: IntCounter,

    pub race_latency: Histogram,
}

fn register<C: Collector + Clone + 'static>(registry: &Registry, collector: C) -> C {
    // Names are static and unique, so registration can only fail on a programming error
    registry
        .register(Box::new(collector.clone()))
        .expect("metric registered twice");
    collector
}

impl OracleMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let races_scored = register(
            &registry,
            IntCounter::with_opts(Opts::new("oracle_races_scored_total", "Races fully scored"))
                .expect("valid counter opts"),
        );
        let races_rejected = register(
            &registry,
            IntCounter::with_opts(Opts::new(
                "oracle_races_rejected_total",
                "Races rejected by validation or aggregation",
            ))
            .expect("valid counter opts"),
        );

        let verdicts = register(
            &registry,
            IntCounterVec::new(Opts::new("oracle_verdicts_total", "Verdicts emitted by action"), &["action"])
                .expect("valid counter opts"),
        );
        let gated_verdicts = register(
            &registry,
            IntCounter::with_opts(Opts::new(
                "oracle_gated_verdicts_total",
                "Bets turned into PASS by the odds gate",
            ))
            .expect("valid counter opts"),
        );
        let neutral_scores = register(
            &registry,
            IntCounter::with_opts(Opts::new(
                "oracle_neutral_scores_total",
                "Agent scores that fell back to neutral for lack of data",
            ))
            .expect("valid counter opts"),
        );

        let audit_failures = register(
            &registry,
            IntCounter::with_opts(Opts::new("oracle_audit_failures_total", "Audit sink write failures"))
                .expect("valid counter opts"),
        );

        let race_latency = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new("oracle_race_latency_seconds", "Time to score one race")
                    .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
            )
            .expect("valid histogram opts"),
        );

        Self {
            registry,
            races_scored,
            races_rejected,
            verdicts,
            gated_verdicts,
            neutral_scores,
            audit_failures,
            race_latency,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for OracleMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Get global metrics instance
pub fn metrics() -> Arc<OracleMetrics> {
    METRICS.clone()
}

/// Record a scored race and its verdicts
pub fn record_race_scored(verdicts: &[Verdict]) {
    let m = metrics();
    m.races_scored.inc();
    for verdict in verdicts {
        m.verdicts.with_label_values(&[verdict.action.as_str()]).inc();
        if verdict.gated {
            m.gated_verdicts.inc();
        }
        let neutral = verdict.scores.iter().filter(|s| s.insufficient_data()).count();
        m.neutral_scores.inc_by(neutral as u64);
    }
}

pub fn record_race_rejected() {
    metrics().races_rejected.inc();
}

pub fn record_audit_failure() {
    metrics().audit_failures.inc();
}

/// Count of verdicts emitted so far for one action
pub fn verdict_count(action: Action) -> u64 {
    metrics().verdicts.with_label_values(&[action.as_str()]).get()
}

/// Timer for measuring race scoring latency
pub struct RaceTimer {
    start: Instant,
}

impl RaceTimer {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    pub fn observe(self) {
        metrics().race_latency.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Text exposition of every registered metric
pub fn render() -> Result<String> {
    TextEncoder::new()
        .encode_to_string(&metrics().registry().gather())
        .context("Failed to encode metrics")
}

/// Write the text exposition to a file
pub fn write_to<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, render()?).with_context(|| format!("Failed to write metrics: {}", path.display()))?;
    info!("📊 Metrics written to {}", path.display());
    Ok(())
}
