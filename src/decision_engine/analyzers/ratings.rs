//! Ratings analyzer: the runner's rating against the rest of the field.
//!
//! Every runner is compared on the race's single rating basis (see
//! `RaceContext::build`); mixing official and speed figures would be noise.

use super::{Analyzer, AnalyzerConfig};
use crate::decision_engine::context::RaceContext;
use crate::decision_engine::evidence::{AgentScore, AnalyzerKind, Evidence, RatingsEvidence};
use crate::race::RunnerRecord;
use crate::velocity_cache::VelocityStore;

const TOP_RATED_BONUS: f64 = 35.0;
const WELL_HANDICAPPED_BONUS: f64 = 25.0;
const BELOW_AVERAGE_PENALTY: f64 = 20.0;

pub struct RatingsAnalyzer {
    base_score: f64,
    margin: f64,
}

impl RatingsAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            base_score: config.ratings_base,
            margin: config.rating_margin,
        }
    }
}

impl Analyzer for RatingsAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Ratings
    }

    fn score(&self, runner: &RunnerRecord, ctx: &RaceContext, _stats: &dyn VelocityStore) -> AgentScore {
        let (rating, field_avg, field_max) = match (ctx.rating_of(runner), ctx.field_avg_rating, ctx.field_max_rating) {
            (Some(rating), Some(avg), Some(max)) => (rating, avg, max),
            _ => {
                return AgentScore::neutral(Evidence::Ratings(RatingsEvidence {
                    basis: ctx.rating_basis,
                    field_avg: ctx.field_avg_rating,
                    field_max: ctx.field_max_rating,
                    insufficient_data: true,
                    ..Default::default()
                }))
            }
        };

        let top_rated = rating == field_max;
        let joint_top = top_rated && ctx.top_rated_count > 1;
        let well_handicapped = !top_rated && rating as f64 >= field_avg + self.margin;
        let below_average = rating as f64 <= field_avg - self.margin;

        let mut score = self.base_score;
        if top_rated {
            score += TOP_RATED_BONUS;
        } else if well_handicapped {
            score += WELL_HANDICAPPED_BONUS;
        } else if below_average {
            score -= BELOW_AVERAGE_PENALTY;
        }

        AgentScore::new(
            score,
            Evidence::Ratings(RatingsEvidence {
                basis: ctx.rating_basis,
                rating: Some(rating),
                field_avg: Some(field_avg),
                field_max: Some(field_max),
                top_rated,
                joint_top,
                well_handicapped,
                below_average,
                insufficient_data: false,
            }),
        )
    }
}
