//! Final per-runner output.

use super::evidence::AgentScore;
use super::policy::{Action, RuleId};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub horse_name: String,
    pub final_score: f64,
    pub action: Action,
    /// % of bank; zero for PASS
    pub stake_pct: f64,
    pub rule: Option<RuleId>,
    /// A rule fired but the odds gate turned it into PASS
    pub gated: bool,
    pub reason: String,
    /// All five agent scores in fixed analyzer order
    pub scores: Vec<AgentScore>,
}

impl Verdict {
    /// Create a breakdown string for logging
    pub fn breakdown(&self) -> String {
        let parts: Vec<String> = self
            .scores
            .iter()
            .map(|s| format!("{}={:.0}{}", s.analyzer, s.score, if s.insufficient_data() { "*" } else { "" }))
            .collect();
        format!(
            "{} {} {:.1}% | final={:.1} ({})",
            self.action,
            self.horse_name,
            self.stake_pct,
            self.final_score,
            parts.join(", ")
        )
    }

    pub fn is_bet(&self) -> bool {
        self.action != Action::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision_engine::evidence::{Evidence, FormEvidence, MarketEvidence};

    #[test]
    fn test_breakdown_marks_neutral_scores() {
        let verdict = Verdict {
            horse_name: "Kauto Star".to_string(),
            final_score: 61.3,
            action: Action::Back,
            stake_pct: 1.0,
            rule: Some(RuleId::ValueBack),
            gated: false,
            reason: "VALUE_BACK".to_string(),
            scores: vec![
                AgentScore::new(80.0, Evidence::Form(FormEvidence::default())),
                AgentScore::neutral(Evidence::Market(MarketEvidence {
                    no_market: true,
                    insufficient_data: true,
                    ..Default::default()
                })),
            ],
        };
        assert_eq!(
            verdict.breakdown(),
            "BACK Kauto Star 1.0% | final=61.3 (form=80, market=50*)"
        );
        assert!(verdict.is_bet());
    }
}
