//! 🏟️ Race Context
//!
//! Race-wide aggregates the relative analyzers (Ratings, Market) need, computed
//! once per race before any runner is scored and shared read-only afterwards.

use crate::race::{RaceCard, RatingKind, RunnerRecord};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct RaceContext {
    pub race_id: String,
    pub course: String,
    pub distance: String,
    pub going: String,
    pub field_size: usize,

    /// Rating kind every runner is compared on
    pub rating_basis: Option<RatingKind>,
    pub rated_runners: usize,
    pub field_avg_rating: Option<f64>,
    pub field_max_rating: Option<i32>,
    /// How many runners share the top rating
    pub top_rated_count: usize,

    rating_ranks: HashMap<String, usize>,
    market_ranks: HashMap<String, usize>,
}

impl RaceContext {
    /// Build the shared aggregates for a (validated) race
    ///
    /// The rating basis is the kind carried by the most runners; coverage ties
    /// go to the earlier entry of `preference`.
    pub fn build(race: &RaceCard, preference: &[RatingKind]) -> Self {
        let rating_basis = pick_rating_basis(&race.runners, preference);

        let rated: Vec<(&str, i32)> = match rating_basis {
            Some(kind) => race
                .runners
                .iter()
                .filter_map(|r| r.ratings.get(kind).map(|v| (r.horse_name.as_str(), v)))
                .collect(),
            None => Vec::new(),
        };

        let field_avg_rating = if rated.is_empty() {
            None
        } else {
            Some(rated.iter().map(|(_, v)| *v as f64).sum::<f64>() / rated.len() as f64)
        };
        let field_max_rating = rated.iter().map(|(_, v)| *v).max();
        let top_rated_count = field_max_rating
            .map(|max| rated.iter().filter(|(_, v)| *v == max).count())
            .unwrap_or(0);

        // Higher rating ranks first; shorter price ranks first
        let rating_ranks = competition_ranks(&rated, |a, b| b.cmp(a));

        let priced: Vec<(&str, f64)> = race
            .runners
            .iter()
            .filter_map(|r| r.odds.map(|o| (r.horse_name.as_str(), o)))
            .collect();
        let market_ranks = competition_ranks(&priced, |a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        Self {
            race_id: race.race_id.clone(),
            course: race.course.clone(),
            distance: race.distance.clone(),
            going: race.going.clone(),
            field_size: race.runners.len(),
            rating_basis,
            rated_runners: rated.len(),
            field_avg_rating,
            field_max_rating,
            top_rated_count,
            rating_ranks,
            market_ranks,
        }
    }

    /// The runner's rating on the race basis
    pub fn rating_of(&self, runner: &RunnerRecord) -> Option<i32> {
        self.rating_basis.and_then(|kind| runner.ratings.get(kind))
    }

    /// 1 = top rated
    pub fn rating_rank(&self, horse_name: &str) -> Option<usize> {
        self.rating_ranks.get(horse_name).copied()
    }

    /// 1 = market favourite
    pub fn market_rank(&self, horse_name: &str) -> Option<usize> {
        self.market_ranks.get(horse_name).copied()
    }
}

fn pick_rating_basis(runners: &[RunnerRecord], preference: &[RatingKind]) -> Option<RatingKind> {
    let mut best: Option<(RatingKind, usize)> = None;
    for kind in preference {
        let coverage = runners.iter().filter(|r| r.ratings.get(*kind).is_some()).count();
        if coverage == 0 {
            continue;
        }
        match best {
            Some((_, best_coverage)) if best_coverage >= coverage => {}
            _ => best = Some((*kind, coverage)),
        }
    }
    best.map(|(kind, _)| kind)
}

/// Standard competition ranking ("1224"): ties share the best rank
fn competition_ranks<T, F>(entries: &[(&str, T)], order: F) -> HashMap<String, usize>
where
    F: Fn(&T, &T) -> Ordering,
{
    entries
        .iter()
        .map(|(name, value)| {
            let better = entries
                .iter()
                .filter(|(_, other)| order(other, value) == Ordering::Less)
                .count();
            (name.to_string(), better + 1)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn race() -> RaceCard {
        RaceCard::new("R1", "Ascot", "1m", "good")
            .with_runner(
                RunnerRecord::new("A")
                    .with_rating(RatingKind::Official, 90)
                    .with_rating(RatingKind::Speed, 70)
                    .with_odds(5.0),
            )
            .with_runner(RunnerRecord::new("B").with_rating(RatingKind::Official, 100).with_odds(2.5))
            .with_runner(RunnerRecord::new("C").with_rating(RatingKind::Official, 90).with_odds(5.0))
            .with_runner(RunnerRecord::new("D").with_rating(RatingKind::Speed, 80))
    }

    #[test]
    fn test_rating_basis_by_coverage() {
        let ctx = RaceContext::build(&race(), &RatingKind::PREFERENCE);
        assert_eq!(ctx.rating_basis, Some(RatingKind::Official));
        assert_eq!(ctx.rated_runners, 3);
        assert!((ctx.field_avg_rating.unwrap() - 93.333).abs() < 0.01);
        assert_eq!(ctx.field_max_rating, Some(100));
        assert_eq!(ctx.top_rated_count, 1);
    }

    #[test]
    fn test_preference_breaks_coverage_ties() {
        let race = RaceCard::new("R2", "Ayr", "6f", "soft")
            .with_runner(RunnerRecord::new("A").with_rating(RatingKind::Speed, 60))
            .with_runner(RunnerRecord::new("B").with_rating(RatingKind::RacingPost, 70));
        let ctx = RaceContext::build(&race, &[RatingKind::Speed, RatingKind::RacingPost]);
        assert_eq!(ctx.rating_basis, Some(RatingKind::Speed));
        let ctx = RaceContext::build(&race, &RatingKind::PREFERENCE);
        assert_eq!(ctx.rating_basis, Some(RatingKind::RacingPost));
    }

    #[test]
    fn test_competition_ranks() {
        let ctx = RaceContext::build(&race(), &RatingKind::PREFERENCE);
        assert_eq!(ctx.rating_rank("B"), Some(1));
        assert_eq!(ctx.rating_rank("A"), Some(2));
        assert_eq!(ctx.rating_rank("C"), Some(2));
        assert_eq!(ctx.rating_rank("D"), None);

        assert_eq!(ctx.market_rank("B"), Some(1));
        assert_eq!(ctx.market_rank("A"), Some(2));
        assert_eq!(ctx.market_rank("C"), Some(2));
        assert_eq!(ctx.market_rank("D"), None);
    }

    #[test]
    fn test_unrated_field() {
        let race = RaceCard::new("R3", "Ayr", "6f", "soft").with_runner(RunnerRecord::new("A"));
        let ctx = RaceContext::build(&race, &RatingKind::PREFERENCE);
        assert_eq!(ctx.rating_basis, None);
        assert_eq!(ctx.field_avg_rating, None);
        assert_eq!(ctx.top_rated_count, 0);
    }
}
