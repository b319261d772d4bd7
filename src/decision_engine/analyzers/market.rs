//! Market analyzer: price against ability.
//!
//! - +35 value: the runner is rated at least two places higher than the market ranks it
//! - +20 price inside the sweet spot (inclusive)
//! - −25 overbet favourite: market favourite that is not top rated

use super::{Analyzer, AnalyzerConfig};
use crate::decision_engine::context::RaceContext;
use crate::decision_engine::evidence::{AgentScore, AnalyzerKind, Evidence, MarketEvidence};
use crate::race::RunnerRecord;
use crate::velocity_cache::VelocityStore;

const VALUE_BONUS: f64 = 35.0;
const SWEET_SPOT_BONUS: f64 = 20.0;
const OVERBET_PENALTY: f64 = 25.0;

pub struct MarketAnalyzer {
    base_score: f64,
    sweet_spot_min: f64,
    sweet_spot_max: f64,
}

impl MarketAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            base_score: config.market_base,
            sweet_spot_min: config.sweet_spot_min,
            sweet_spot_max: config.sweet_spot_max,
        }
    }
}

impl Analyzer for MarketAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Market
    }

    fn score(&self, runner: &RunnerRecord, ctx: &RaceContext, _stats: &dyn VelocityStore) -> AgentScore {
        let rating_rank = ctx.rating_rank(&runner.horse_name);

        let odds = match runner.odds {
            Some(odds) => odds,
            None => {
                return AgentScore::neutral(Evidence::Market(MarketEvidence {
                    rating_rank,
                    no_market: true,
                    insufficient_data: true,
                    ..Default::default()
                }))
            }
        };

        let market_rank = ctx.market_rank(&runner.horse_name);
        let value_signal = matches!((rating_rank, market_rank), (Some(r), Some(m)) if r + 1 < m);
        let in_sweet_spot = odds >= self.sweet_spot_min && odds <= self.sweet_spot_max;
        let overbet_favourite = market_rank == Some(1) && matches!(rating_rank, Some(r) if r != 1);

        let mut score = self.base_score;
        if value_signal {
            score += VALUE_BONUS;
        }
        if in_sweet_spot {
            score += SWEET_SPOT_BONUS;
        }
        if overbet_favourite {
            score -= OVERBET_PENALTY;
        }

        AgentScore::new(
            score,
            Evidence::Market(MarketEvidence {
                odds: Some(odds),
                market_rank,
                rating_rank,
                value_signal,
                in_sweet_spot,
                overbet_favourite,
                no_market: false,
                insufficient_data: false,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision_engine::analyzers::test_support::EmptyStore;
    use crate::race::{RaceCard, RatingKind};

    fn field() -> RaceCard {
        RaceCard::new("R1", "Haydock", "1m", "soft")
            .with_runner(RunnerRecord::new("Fav").with_rating(RatingKind::Official, 88).with_odds(2.0))
            .with_runner(RunnerRecord::new("Second").with_rating(RatingKind::Official, 85).with_odds(4.0))
            .with_runner(RunnerRecord::new("Value").with_rating(RatingKind::Official, 95).with_odds(9.0))
            .with_runner(RunnerRecord::new("Outsider").with_rating(RatingKind::Official, 70).with_odds(34.0))
            .with_runner(RunnerRecord::new("NoPrice").with_rating(RatingKind::Official, 80))
    }

    fn scores(race: &RaceCard) -> Vec<AgentScore> {
        let ctx = RaceContext::build(race, &RatingKind::PREFERENCE);
        let analyzer = MarketAnalyzer::new(&AnalyzerConfig::default());
        race.runners.iter().map(|r| analyzer.score(r, &ctx, &EmptyStore)).collect()
    }

    fn evidence(score: &AgentScore) -> &MarketEvidence {
        match &score.evidence {
            Evidence::Market(e) => e,
            other => panic!("unexpected evidence {:?}", other),
        }
    }

    #[test]
    fn test_value_runner() {
        // rated 1st, third in the market at 9.0
        let s = scores(&field());
        let e = evidence(&s[2]);
        assert!(e.value_signal && e.in_sweet_spot);
        assert_eq!(e.rating_rank, Some(1));
        assert_eq!(e.market_rank, Some(3));
        assert_eq!(s[2].score, 95.0);
    }

    #[test]
    fn test_overbet_favourite() {
        let s = scores(&field());
        let e = evidence(&s[0]);
        assert!(e.overbet_favourite);
        assert!(!e.in_sweet_spot);
        assert_eq!(s[0].score, 15.0);
    }

    #[test]
    fn test_sweet_spot_bounds_inclusive() {
        let race = RaceCard::new("R2", "Haydock", "1m", "soft")
            .with_runner(RunnerRecord::new("Low").with_odds(3.0))
            .with_runner(RunnerRecord::new("High").with_odds(20.0));
        let s = scores(&race);
        assert!(evidence(&s[0]).in_sweet_spot);
        assert!(evidence(&s[1]).in_sweet_spot);
        // unrated favourite is not overbet
        assert!(!evidence(&s[0]).overbet_favourite);
    }

    #[test]
    fn test_outside_sweet_spot() {
        let s = scores(&field());
        assert_eq!(s[1].score, 60.0);
        assert_eq!(s[3].score, 40.0);
    }

    #[test]
    fn test_no_market_is_neutral() {
        let s = scores(&field());
        assert_eq!(s[4].score, 50.0);
        let e = evidence(&s[4]);
        assert!(e.no_market && e.insufficient_data);
        assert_eq!(s[4].evidence.citations(), vec!["no_market=true".to_string()]);
    }
}
