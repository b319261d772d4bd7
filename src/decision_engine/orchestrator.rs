//! 🎼 Race Orchestrator
//!
//! Runs one race end to end: validate → race context → five analyzers per
//! runner → weighted aggregate → decision policy → verdict → audit.
//! Nothing is scored until the race passes validation, and a race either
//! yields a verdict for every runner or an error.

use super::aggregator::{AggregationError, AggregationWeights, ScoreAggregator};
use super::analyzers::{AnalyzerConfig, AnalyzerSet};
use super::context::RaceContext;
use super::policy::{Action, DecisionPolicy, EvidenceBundle, PolicyConfig};
use super::verdict::Verdict;
use crate::audit::{AuditRecord, AuditSink};
use crate::metrics;
use crate::race::{RaceCard, RaceError};
use crate::velocity_cache::VelocityStore;
use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Everything the pipeline can be tuned with
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OracleConfig {
    pub weights: AggregationWeights,
    pub policy: PolicyConfig,
    pub analyzers: AnalyzerConfig,
}

impl OracleConfig {
    pub fn validate(&self) -> Result<()> {
        self.weights.validate().context("Invalid aggregation weights")?;
        self.policy.validate().context("Invalid decision policy")?;
        self.analyzers.validate().context("Invalid analyzer configuration")?;
        Ok(())
    }
}

/// Why a race produced no verdicts
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error(transparent)]
    Invalid(#[from] RaceError),

    #[error("failed to aggregate scores for '{horse_name}': {source}")]
    Aggregation {
        horse_name: String,
        #[source]
        source: AggregationError,
    },
}

/// BACK / LAY / PASS tallies for one race
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RaceSummary {
    pub backs: usize,
    pub lays: usize,
    pub passes: usize,
}

/// Verdicts for one race, in runner input order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceOutcome {
    pub race_id: String,
    pub verdicts: Vec<Verdict>,
}

impl RaceOutcome {
    pub fn summary(&self) -> RaceSummary {
        self.verdicts.iter().fold(RaceSummary::default(), |mut s, v| {
            match v.action {
                Action::Back => s.backs += 1,
                Action::Lay => s.lays += 1,
                Action::Pass => s.passes += 1,
            }
            s
        })
    }

    pub fn verdict(&self, horse_name: &str) -> Option<&Verdict> {
        self.verdicts.iter().find(|v| v.horse_name == horse_name)
    }
}

pub struct RaceOrchestrator {
    config: OracleConfig,
    analyzers: AnalyzerSet,
    aggregator: ScoreAggregator,
    policy: DecisionPolicy,
    stats: Arc<dyn VelocityStore>,
    audit: Arc<dyn AuditSink>,
}

impl RaceOrchestrator {
    /// Fails fast on an invalid configuration or a store serving another recent window
    pub fn new(config: OracleConfig, stats: Arc<dyn VelocityStore>, audit: Arc<dyn AuditSink>) -> Result<Self> {
        config.validate()?;

        if let Some(days) = stats.recent_window_days() {
            if days != config.analyzers.recent_window_days {
                bail!(
                    "Velocity store serves {}d recent stats but RECENT_WINDOW_DAYS is {}",
                    days,
                    config.analyzers.recent_window_days
                );
            }
        }

        let analyzers = AnalyzerSet::standard(&config.analyzers);
        let aggregator = ScoreAggregator::new(config.weights.clone())?;
        let policy = DecisionPolicy::new(config.policy.clone())?;

        Ok(Self {
            config,
            analyzers,
            aggregator,
            policy,
            stats,
            audit,
        })
    }

    /// Swap in a custom analyzer line-up
    pub fn with_analyzers(mut self, analyzers: AnalyzerSet) -> Self {
        self.analyzers = analyzers;
        self
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Score one race and hand the result to the audit sink
    pub fn run_race(&self, race: &RaceCard) -> Result<RaceOutcome, RunError> {
        let timer = metrics::RaceTimer::start();

        let verdicts = match self.score_race(race) {
            Ok(verdicts) => verdicts,
            Err(e) => {
                metrics::record_race_rejected();
                warn!("🚫 Race {} rejected: {}", race.race_id, e);
                return Err(e);
            }
        };

        let outcome = RaceOutcome {
            race_id: race.race_id.clone(),
            verdicts,
        };

        let record = AuditRecord::new(outcome.race_id.clone(), outcome.verdicts.clone());
        if let Err(e) = self.audit.record(&record) {
            metrics::record_audit_failure();
            warn!("⚠️ Audit write failed for race {} (run {}): {:#}", outcome.race_id, record.run_id, e);
        }

        metrics::record_race_scored(&outcome.verdicts);
        timer.observe();

        let summary = outcome.summary();
        info!(
            "🏁 Race {} scored: {} runners | {} back, {} lay, {} pass",
            outcome.race_id,
            outcome.verdicts.len(),
            summary.backs,
            summary.lays,
            summary.passes
        );
        Ok(outcome)
    }

    /// Validate and score without touching the audit trail
    pub fn score_race(&self, race: &RaceCard) -> Result<Vec<Verdict>, RunError> {
        race.validate()?;

        let ctx = RaceContext::build(race, &self.config.analyzers.rating_preference);
        debug!(
            "🏟️ Race {} context: {} runners, basis={:?}, field_avg={:?}",
            ctx.race_id, ctx.field_size, ctx.rating_basis, ctx.field_avg_rating
        );

        race.runners
            .iter()
            .map(|runner| {
                let scores = self.analyzers.score_all(runner, &ctx, self.stats.as_ref());
                let final_score = self.aggregator.aggregate(&scores).map_err(|source| RunError::Aggregation {
                    horse_name: runner.horse_name.clone(),
                    source,
                })?;

                let decision = self.policy.decide(&EvidenceBundle::from_scores(final_score, &scores));
                let verdict = Verdict {
                    horse_name: runner.horse_name.clone(),
                    final_score,
                    action: decision.action,
                    stake_pct: decision.stake_pct,
                    rule: decision.rule,
                    gated: decision.gated,
                    reason: decision.reason,
                    scores: scores.into_values().collect(),
                };
                info!("🎯 {}", verdict.breakdown());
                Ok(verdict)
            })
            .collect()
    }

    /// Run a day's card; races are independent and one failure does not stop the rest
    pub fn run_card(&self, races: &[RaceCard]) -> Vec<(String, Result<RaceOutcome, RunError>)> {
        races
            .iter()
            .map(|race| (race.race_id.clone(), self.run_race(race)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::NullAuditSink;
    use crate::decision_engine::analyzers::test_support::EmptyStore;
    use crate::decision_engine::analyzers::{FormAnalyzer, MarketAnalyzer};
    use crate::decision_engine::evidence::AnalyzerKind;
    use crate::race::RunnerRecord;
    use crate::velocity_cache::VelocityCache;

    fn orchestrator() -> RaceOrchestrator {
        RaceOrchestrator::new(OracleConfig::default(), Arc::new(EmptyStore), Arc::new(NullAuditSink)).unwrap()
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut config = OracleConfig::default();
        config.weights.market = 0.5;
        assert!(RaceOrchestrator::new(config, Arc::new(EmptyStore), Arc::new(NullAuditSink)).is_err());
    }

    #[test]
    fn test_store_window_must_match_config() {
        let week = Arc::new(VelocityCache::new(7));
        let err = RaceOrchestrator::new(OracleConfig::default(), week, Arc::new(NullAuditSink))
            .err()
            .expect("7d store accepted with a 14d config");
        assert!(err.to_string().contains("7d"), "{}", err);

        let mut config = OracleConfig::default();
        config.analyzers.recent_window_days = 7;
        assert!(RaceOrchestrator::new(config, Arc::new(VelocityCache::new(7)), Arc::new(NullAuditSink)).is_ok());
    }

    #[test]
    fn test_verdicts_keep_input_order() {
        let race = RaceCard::new("R1", "Ascot", "1m", "good")
            .with_runner(RunnerRecord::new("Zulu").with_odds(6.0))
            .with_runner(RunnerRecord::new("Alpha").with_odds(3.5))
            .with_runner(RunnerRecord::new("Mike"));
        let outcome = orchestrator().run_race(&race).unwrap();
        let names: Vec<&str> = outcome.verdicts.iter().map(|v| v.horse_name.as_str()).collect();
        assert_eq!(names, vec!["Zulu", "Alpha", "Mike"]);

        for verdict in &outcome.verdicts {
            let kinds: Vec<AnalyzerKind> = verdict.scores.iter().map(|s| s.analyzer).collect();
            assert_eq!(kinds, AnalyzerKind::ALL.to_vec());
        }
    }

    #[test]
    fn test_all_neutral_field_passes() {
        let race = RaceCard::new("R2", "Ascot", "1m", "good").with_runner(RunnerRecord::new("Blank"));
        let outcome = orchestrator().run_race(&race).unwrap();
        let verdict = &outcome.verdicts[0];
        assert_eq!(verdict.final_score, 50.0);
        assert_eq!(verdict.action, Action::Pass);
        assert_eq!(verdict.stake_pct, 0.0);
        assert_eq!(
            outcome.summary(),
            RaceSummary {
                backs: 0,
                lays: 0,
                passes: 1
            }
        );
    }

    #[test]
    fn test_partial_analyzer_line_up_is_an_error() {
        let config = AnalyzerConfig::default();
        let partial = AnalyzerSet::from_analyzers(vec![
            Box::new(FormAnalyzer::new(&config)),
            Box::new(MarketAnalyzer::new(&config)),
        ])
        .unwrap();
        let race = RaceCard::new("R3", "Ascot", "1m", "good").with_runner(RunnerRecord::new("Solo"));
        let result = orchestrator().with_analyzers(partial).run_race(&race);
        match result {
            Err(RunError::Aggregation { horse_name, source }) => {
                assert_eq!(horse_name, "Solo");
                assert_eq!(source, AggregationError::MissingScore(AnalyzerKind::Connections));
            }
            other => panic!("expected aggregation error, got {:?}", other),
        }
    }

    #[test]
    fn test_run_card_isolates_failures() {
        let good = RaceCard::new("R4", "Ascot", "1m", "good").with_runner(RunnerRecord::new("A"));
        let empty = RaceCard::new("R5", "Ascot", "1m", "good");
        let results = orchestrator().run_card(&[good, empty]);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "R4");
        assert!(results[0].1.is_ok());
        assert_eq!(
            results[1].1,
            Err(RunError::Invalid(RaceError::EmptyField {
                race_id: "R5".to_string()
            }))
        );
    }
}
