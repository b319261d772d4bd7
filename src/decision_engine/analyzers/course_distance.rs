//! Course/distance analyzer: the horse's lifetime record in today's conditions.
//!
//! Looks up the horse at today's course, at today's distance and on today's
//! going, then scores the best of the three strike rates.

use super::{Analyzer, AnalyzerConfig};
use crate::decision_engine::context::RaceContext;
use crate::decision_engine::evidence::{AgentScore, AnalyzerKind, CourseDistanceEvidence, Evidence};
use crate::race::RunnerRecord;
use crate::velocity_cache::{StatWindow, VelocityKey, VelocityStore};

const SPECIALIST_BONUS: f64 = 40.0;
const PROVEN_BONUS: f64 = 25.0;
const MULTI_SPECIALIST_BONUS: f64 = 15.0;

pub struct CourseDistanceAnalyzer {
    base_score: f64,
    specialist_sr: f64,
    proven_sr: f64,
}

impl CourseDistanceAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            base_score: config.course_distance_base,
            specialist_sr: config.specialist_sr,
            proven_sr: config.proven_sr,
        }
    }

    fn lifetime_sr(&self, stats: &dyn VelocityStore, context: &str, key: impl Fn() -> VelocityKey) -> Option<f64> {
        if context.trim().is_empty() {
            return None;
        }
        stats
            .lookup(&key(), StatWindow::Lifetime)
            .and_then(|stat| stat.strike_rate())
    }
}

impl Analyzer for CourseDistanceAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::CourseDistance
    }

    fn score(&self, runner: &RunnerRecord, ctx: &RaceContext, stats: &dyn VelocityStore) -> AgentScore {
        let horse = runner.horse_name.as_str();
        let course_sr = self.lifetime_sr(stats, &ctx.course, || VelocityKey::horse_at_course(horse, &ctx.course));
        let distance_sr =
            self.lifetime_sr(stats, &ctx.distance, || VelocityKey::horse_at_distance(horse, &ctx.distance));
        let going_sr = self.lifetime_sr(stats, &ctx.going, || VelocityKey::horse_on_going(horse, &ctx.going));

        let known: Vec<f64> = [course_sr, distance_sr, going_sr].into_iter().flatten().collect();
        if known.is_empty() {
            return AgentScore::neutral(Evidence::CourseDistance(CourseDistanceEvidence {
                insufficient_data: true,
                ..Default::default()
            }));
        }

        let best_sr = known.iter().copied().fold(f64::MIN, f64::max);
        let specialist_contexts = known.iter().filter(|&&sr| sr >= self.specialist_sr).count();
        let specialist = best_sr >= self.specialist_sr;
        let proven = !specialist && best_sr >= self.proven_sr;
        let multi_specialist = specialist_contexts > 1;

        let mut score = self.base_score;
        if specialist {
            score += SPECIALIST_BONUS;
        } else if proven {
            score += PROVEN_BONUS;
        }
        if multi_specialist {
            score += MULTI_SPECIALIST_BONUS;
        }

        AgentScore::new(
            score,
            Evidence::CourseDistance(CourseDistanceEvidence {
                course_sr,
                distance_sr,
                going_sr,
                best_sr: Some(best_sr),
                specialist,
                proven,
                specialist_contexts,
                multi_specialist,
                insufficient_data: false,
            }),
        )
    }
}
