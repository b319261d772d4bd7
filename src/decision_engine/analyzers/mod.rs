//! 🔬 Runner Analyzers
//!
//! Five independent, deterministic scorers. Each maps a runner (plus the shared
//! race context and velocity statistics) to an `AgentScore` in [0, 100].
//! Missing optional inputs never fail the pipeline: the analyzer returns the
//! neutral score with its insufficient-data flag set.

pub mod connections;
pub mod course_distance;
pub mod form;
pub mod market;
pub mod ratings;

pub use connections::ConnectionsAnalyzer;
pub use course_distance::CourseDistanceAnalyzer;
pub use form::FormAnalyzer;
pub use market::MarketAnalyzer;
pub use ratings::RatingsAnalyzer;

use super::context::RaceContext;
use super::evidence::{AgentScore, AgentScores, AnalyzerKind};
use crate::race::{RatingKind, RunnerRecord};
use crate::velocity_cache::VelocityStore;
use anyhow::{bail, Result};
use log::debug;

/// A single heuristic scorer
pub trait Analyzer: Send + Sync {
    fn kind(&self) -> AnalyzerKind;

    fn score(&self, runner: &RunnerRecord, ctx: &RaceContext, stats: &dyn VelocityStore) -> AgentScore;
}

/// Analyzer thresholds and base scores
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Starting score when the analyzer has data to judge (0-100)
    pub form_base: f64,
    pub connections_base: f64,
    pub course_distance_base: f64,
    pub ratings_base: f64,
    pub market_base: f64,

    /// Recent-window strike rate (%) that makes a trainer "hot" (default: 25)
    pub hot_trainer_sr: f64,
    /// Recent-window strike rate (%) that makes a jockey "hot" (default: 20)
    pub hot_jockey_sr: f64,
    /// Recent window length in days (default: 14)
    pub recent_window_days: u32,

    /// Course/distance/going strike rate (%) for a specialist (default: 33)
    pub specialist_sr: f64,
    /// Course/distance/going strike rate (%) for a proven horse (default: 20)
    pub proven_sr: f64,

    /// Rating points from the field average that count as material (default: 3)
    pub rating_margin: f64,
    /// Rating kinds in preference order for the race basis
    pub rating_preference: Vec<RatingKind>,

    /// Decimal odds sweet spot, inclusive (default: 3.0-20.0)
    pub sweet_spot_min: f64,
    pub sweet_spot_max: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            form_base: 30.0,
            connections_base: 30.0,
            course_distance_base: 30.0,
            ratings_base: 40.0,
            market_base: 40.0,
            hot_trainer_sr: 25.0,
            hot_jockey_sr: 20.0,
            recent_window_days: 14,
            specialist_sr: 33.0,
            proven_sr: 20.0,
            rating_margin: 3.0,
            rating_preference: RatingKind::PREFERENCE.to_vec(),
            sweet_spot_min: 3.0,
            sweet_spot_max: 20.0,
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<()> {
        let bases = [
            ("FORM_BASE", self.form_base),
            ("CONNECTIONS_BASE", self.connections_base),
            ("COURSE_DISTANCE_BASE", self.course_distance_base),
            ("RATINGS_BASE", self.ratings_base),
            ("MARKET_BASE", self.market_base),
        ];
        for (name, value) in bases {
            if !(0.0..=100.0).contains(&value) {
                bail!("{} must be between 0 and 100 (got {})", name, value);
            }
        }

        for (name, value) in [("HOT_TRAINER_SR", self.hot_trainer_sr), ("HOT_JOCKEY_SR", self.hot_jockey_sr)] {
            if !(0.0..=100.0).contains(&value) {
                bail!("{} must be a strike rate between 0 and 100 (got {})", name, value);
            }
        }
        if self.recent_window_days == 0 {
            bail!("RECENT_WINDOW_DAYS must be > 0");
        }
        if !(self.proven_sr < self.specialist_sr && self.specialist_sr <= 100.0 && self.proven_sr >= 0.0) {
            bail!(
                "PROVEN_SR ({}) must be below SPECIALIST_SR ({}) and both within 0-100",
                self.proven_sr,
                self.specialist_sr
            );
        }
        if !(self.rating_margin >= 0.0 && self.rating_margin.is_finite()) {
            bail!("RATING_MARGIN must be ≥ 0");
        }
        if self.rating_preference.is_empty() {
            bail!("RATING_PREFERENCE must name at least one rating kind");
        }
        if !(self.sweet_spot_min < self.sweet_spot_max) {
            bail!(
                "SWEET_SPOT_MIN ({}) must be below SWEET_SPOT_MAX ({})",
                self.sweet_spot_min,
                self.sweet_spot_max
            );
        }
        Ok(())
    }
}

/// The full analyzer line-up run against every runner
pub struct AnalyzerSet {
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl AnalyzerSet {
    /// The five standard analyzers
    pub fn standard(config: &AnalyzerConfig) -> Self {
        Self {
            analyzers: vec![
                Box::new(ConnectionsAnalyzer::new(config)),
                Box::new(RatingsAnalyzer::new(config)),
                Box::new(FormAnalyzer::new(config)),
                Box::new(CourseDistanceAnalyzer::new(config)),
                Box::new(MarketAnalyzer::new(config)),
            ],
        }
    }

    /// Custom line-up, at most one analyzer per kind
    ///
    /// Line-ups missing a kind are accepted here; the aggregator rejects them.
    pub fn from_analyzers(analyzers: Vec<Box<dyn Analyzer>>) -> Result<Self> {
        let mut seen = Vec::with_capacity(analyzers.len());
        for analyzer in &analyzers {
            let kind = analyzer.kind();
            if seen.contains(&kind) {
                bail!("Analyzer line-up has more than one {} analyzer", kind);
            }
            seen.push(kind);
        }
        Ok(Self { analyzers })
    }

    pub fn kinds(&self) -> Vec<AnalyzerKind> {
        self.analyzers.iter().map(|a| a.kind()).collect()
    }

    /// Run every analyzer against one runner
    pub fn score_all(&self, runner: &RunnerRecord, ctx: &RaceContext, stats: &dyn VelocityStore) -> AgentScores {
        let mut scores = AgentScores::new();
        for analyzer in &self.analyzers {
            let score = analyzer.score(runner, ctx, stats);
            debug!(
                "🔬 {} | {}={:.1}{} [{}]",
                runner.horse_name,
                score.analyzer,
                score.score,
                if score.insufficient_data() { " (neutral)" } else { "" },
                score.evidence.citations().join(", ")
            );
            scores.insert(score.analyzer, score);
        }
        scores
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::EmptyStore;
    use super::*;
    use crate::race::RaceCard;

    #[test]
    fn test_default_config_valid() {
        assert!(AnalyzerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_inverted_thresholds() {
        let mut config = AnalyzerConfig::default();
        config.proven_sr = 40.0;
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.sweet_spot_min = 25.0;
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.market_base = 120.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_standard_set_covers_all_kinds() {
        let set = AnalyzerSet::standard(&AnalyzerConfig::default());
        let mut kinds = set.kinds();
        kinds.sort();
        assert_eq!(kinds, AnalyzerKind::ALL.to_vec());
    }

    #[test]
    fn test_duplicate_kind_rejected() {
        let config = AnalyzerConfig::default();
        let result = AnalyzerSet::from_analyzers(vec![
            Box::new(FormAnalyzer::new(&config)),
            Box::new(MarketAnalyzer::new(&config)),
            Box::new(FormAnalyzer::new(&config)),
        ]);
        let err = result.err().expect("duplicate form analyzer accepted");
        assert!(err.to_string().contains("form"), "{}", err);

        let single = AnalyzerSet::from_analyzers(vec![Box::new(MarketAnalyzer::new(&config))]).unwrap();
        assert_eq!(single.kinds(), vec![AnalyzerKind::Market]);
    }

    #[test]
    fn test_bare_runner_is_neutral_everywhere() {
        let race = RaceCard::new("R1", "Ascot", "1m", "good").with_runner(RunnerRecord::new("Blank"));
        let ctx = RaceContext::build(&race, &RatingKind::PREFERENCE);
        let set = AnalyzerSet::standard(&AnalyzerConfig::default());

        let scores = set.score_all(&race.runners[0], &ctx, &EmptyStore);
        assert_eq!(scores.len(), 5);
        for score in scores.values() {
            assert_eq!(score.score, 50.0, "{} should be neutral", score.analyzer);
            assert!(score.insufficient_data());
        }
    }
}
