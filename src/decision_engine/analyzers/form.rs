//! Form analyzer: recent finishing positions only.
//!
//! - +30 latest run a win
//! - +20 latest run placed (2nd/3rd)
//! - up to +20 for top-4 consistency across the window
//! - up to +15 when the window never gets worse, oldest to newest

use super::{Analyzer, AnalyzerConfig};
use crate::decision_engine::context::RaceContext;
use crate::decision_engine::evidence::{AgentScore, AnalyzerKind, Evidence, FormEvidence};
use crate::race::RunnerRecord;
use crate::velocity_cache::VelocityStore;

const WIN_BONUS: f64 = 30.0;
const PLACE_BONUS: f64 = 20.0;
const CONSISTENCY_MAX: f64 = 20.0;
const TREND_MAX: f64 = 15.0;

pub struct FormAnalyzer {
    base_score: f64,
}

impl FormAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            base_score: config.form_base,
        }
    }

    /// Score a form line (most recent first)
    pub fn score_figures(&self, figures: &[u8]) -> AgentScore {
        if figures.is_empty() {
            return AgentScore::neutral(Evidence::Form(FormEvidence {
                insufficient_data: true,
                ..Default::default()
            }));
        }

        let last = figures[0];
        let last_win = last == 1;
        let last_placed = last == 2 || last == 3;

        let top4_count = figures.iter().filter(|&&f| (1..=4).contains(&f)).count();
        let consistency_bonus = CONSISTENCY_MAX * top4_count as f64 / figures.len() as f64;

        let (improving_steps, worsening_steps) = trend_steps(figures);
        let steps = figures.len() - 1;
        let trend_bonus = if worsening_steps == 0 && improving_steps > 0 {
            TREND_MAX * improving_steps as f64 / steps as f64
        } else {
            0.0
        };

        let mut score = self.base_score + consistency_bonus + trend_bonus;
        if last_win {
            score += WIN_BONUS;
        } else if last_placed {
            score += PLACE_BONUS;
        }

        AgentScore::new(
            score,
            Evidence::Form(FormEvidence {
                window_len: figures.len(),
                last_figure: Some(last),
                last_win,
                last_placed,
                top4_count,
                consistency_bonus,
                improving_steps,
                worsening_steps,
                trend_bonus,
                insufficient_data: false,
            }),
        )
    }
}

/// Count improving and worsening steps walking oldest → newest
///
/// A non-completion (0) ranks behind every finishing position.
fn trend_steps(figures: &[u8]) -> (usize, usize) {
    let rank = |f: u8| if f == 0 { u16::MAX } else { f as u16 };
    let chronological: Vec<u16> = figures.iter().rev().map(|&f| rank(f)).collect();

    chronological.windows(2).fold((0, 0), |(up, down), pair| match pair[1].cmp(&pair[0]) {
        std::cmp::Ordering::Less => (up + 1, down),
        std::cmp::Ordering::Greater => (up, down + 1),
        std::cmp::Ordering::Equal => (up, down),
    })
}

impl Analyzer for FormAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Form
    }

    fn score(&self, runner: &RunnerRecord, _ctx: &RaceContext, _stats: &dyn VelocityStore) -> AgentScore {
        self.score_figures(&runner.form_figures)
    }
}
