//! 🧾 Agent Scores & Evidence
//!
//! Every analyzer returns a bounded score plus a fixed-schema evidence record
//! explaining it. Evidence is what makes a verdict's reasoning reconstructable,
//! so it is never empty: a neutral score carries `insufficient_data = true`.

use crate::race::RatingKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Score reported when an analyzer lacks the inputs to judge a runner
pub const NEUTRAL_SCORE: f64 = 50.0;

/// The five independent analyzers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    Connections,
    Ratings,
    Form,
    CourseDistance,
    Market,
}

impl AnalyzerKind {
    pub const ALL: [AnalyzerKind; 5] = [
        AnalyzerKind::Connections,
        AnalyzerKind::Ratings,
        AnalyzerKind::Form,
        AnalyzerKind::CourseDistance,
        AnalyzerKind::Market,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyzerKind::Connections => "connections",
            AnalyzerKind::Ratings => "ratings",
            AnalyzerKind::Form => "form",
            AnalyzerKind::CourseDistance => "course_distance",
            AnalyzerKind::Market => "market",
        }
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormEvidence {
    pub window_len: usize,
    pub last_figure: Option<u8>,
    pub last_win: bool,
    pub last_placed: bool,
    pub top4_count: usize,
    pub consistency_bonus: f64,
    pub improving_steps: usize,
    pub worsening_steps: usize,
    pub trend_bonus: f64,
    pub insufficient_data: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionsEvidence {
    pub window_days: u32,
    pub trainer_sr: Option<f64>,
    pub trainer_record: Option<String>,
    pub trainer_pl: Option<f64>,
    pub jockey_sr: Option<f64>,
    pub jockey_record: Option<String>,
    pub jockey_pl: Option<f64>,
    pub hot_trainer: bool,
    pub hot_jockey: bool,
    pub hot_combo: bool,
    pub insufficient_data: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CourseDistanceEvidence {
    pub course_sr: Option<f64>,
    pub distance_sr: Option<f64>,
    pub going_sr: Option<f64>,
    pub best_sr: Option<f64>,
    pub specialist: bool,
    pub proven: bool,
    pub specialist_contexts: usize,
    pub multi_specialist: bool,
    pub insufficient_data: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RatingsEvidence {
    pub basis: Option<RatingKind>,
    pub rating: Option<i32>,
    pub field_avg: Option<f64>,
    pub field_max: Option<i32>,
    pub top_rated: bool,
    pub joint_top: bool,
    pub well_handicapped: bool,
    pub below_average: bool,
    pub insufficient_data: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketEvidence {
    pub odds: Option<f64>,
    pub market_rank: Option<usize>,
    pub rating_rank: Option<usize>,
    pub value_signal: bool,
    pub in_sweet_spot: bool,
    pub overbet_favourite: bool,
    pub no_market: bool,
    pub insufficient_data: bool,
}

/// Evidence record, one fixed schema per analyzer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    Form(FormEvidence),
    Connections(ConnectionsEvidence),
    CourseDistance(CourseDistanceEvidence),
    Ratings(RatingsEvidence),
    Market(MarketEvidence),
}

impl Evidence {
    pub fn kind(&self) -> AnalyzerKind {
        match self {
            Evidence::Form(_) => AnalyzerKind::Form,
            Evidence::Connections(_) => AnalyzerKind::Connections,
            Evidence::CourseDistance(_) => AnalyzerKind::CourseDistance,
            Evidence::Ratings(_) => AnalyzerKind::Ratings,
            Evidence::Market(_) => AnalyzerKind::Market,
        }
    }

    pub fn insufficient_data(&self) -> bool {
        match self {
            Evidence::Form(e) => e.insufficient_data,
            Evidence::Connections(e) => e.insufficient_data,
            Evidence::CourseDistance(e) => e.insufficient_data,
            Evidence::Ratings(e) => e.insufficient_data,
            Evidence::Market(e) => e.insufficient_data,
        }
    }

    /// Concrete `key=value` findings, always at least one entry
    pub fn citations(&self) -> Vec<String> {
        let mut out = Vec::new();
        match self {
            Evidence::Form(e) => {
                if e.insufficient_data {
                    out.push("form=insufficient_data".to_string());
                } else {
                    if let Some(last) = e.last_figure {
                        out.push(format!("form_last={}", last));
                    }
                    out.push(format!("top4={}/{}", e.top4_count, e.window_len));
                    if e.trend_bonus > 0.0 {
                        out.push(format!("trend_bonus={:.1}", e.trend_bonus));
                    }
                }
            }
            Evidence::Connections(e) => {
                if e.insufficient_data {
                    out.push("connections=no_data".to_string());
                } else {
                    if let Some(sr) = e.trainer_sr {
                        out.push(format!("trainer_sr_{}d={:.1}", e.window_days, sr));
                    }
                    if let Some(sr) = e.jockey_sr {
                        out.push(format!("jockey_sr_{}d={:.1}", e.window_days, sr));
                    }
                    if e.hot_combo {
                        out.push("hot_combo=true".to_string());
                    }
                }
            }
            Evidence::CourseDistance(e) => {
                if e.insufficient_data {
                    out.push("course_distance=insufficient_data".to_string());
                } else {
                    if let Some(sr) = e.course_sr {
                        out.push(format!("course_sr={:.1}", sr));
                    }
                    if let Some(sr) = e.distance_sr {
                        out.push(format!("distance_sr={:.1}", sr));
                    }
                    if let Some(sr) = e.going_sr {
                        out.push(format!("going_sr={:.1}", sr));
                    }
                }
            }
            Evidence::Ratings(e) => {
                if e.insufficient_data {
                    out.push("ratings=insufficient_data".to_string());
                } else {
                    if let Some(rating) = e.rating {
                        out.push(format!("rating={}", rating));
                    }
                    if let Some(avg) = e.field_avg {
                        out.push(format!("field_avg={:.1}", avg));
                    }
                    if e.top_rated {
                        out.push("top_rated=true".to_string());
                    }
                }
            }
            Evidence::Market(e) => {
                if e.no_market {
                    out.push("no_market=true".to_string());
                } else {
                    if let Some(odds) = e.odds {
                        out.push(format!("odds={:.2}", odds));
                    }
                    if let (Some(rating_rank), Some(market_rank)) = (e.rating_rank, e.market_rank) {
                        out.push(format!("rating_rank={} market_rank={}", rating_rank, market_rank));
                    } else if let Some(market_rank) = e.market_rank {
                        out.push(format!("market_rank={}", market_rank));
                    }
                }
            }
        }

        if out.is_empty() {
            out.push(format!("{}=scored", self.kind()));
        }
        out
    }
}

/// A single analyzer's bounded verdict on one runner
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentScore {
    pub analyzer: AnalyzerKind,
    pub score: f64,
    pub evidence: Evidence,
}

impl AgentScore {
    /// Score clamped to [0, 100]; the producer is taken from the evidence
    pub fn new(raw_score: f64, evidence: Evidence) -> Self {
        Self {
            analyzer: evidence.kind(),
            score: raw_score.clamp(0.0, 100.0),
            evidence,
        }
    }

    /// Neutral midpoint score; the evidence must carry its insufficient-data flag
    pub fn neutral(evidence: Evidence) -> Self {
        debug_assert!(evidence.insufficient_data());
        Self::new(NEUTRAL_SCORE, evidence)
    }

    pub fn insufficient_data(&self) -> bool {
        self.evidence.insufficient_data()
    }
}

/// All analyzer scores for one runner, keyed by producer
pub type AgentScores = BTreeMap<AnalyzerKind, AgentScore>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_clamped() {
        let high = AgentScore::new(140.0, Evidence::Form(FormEvidence::default()));
        assert_eq!(high.score, 100.0);
        assert_eq!(high.analyzer, AnalyzerKind::Form);

        let low = AgentScore::new(-12.0, Evidence::Market(MarketEvidence::default()));
        assert_eq!(low.score, 0.0);
        assert_eq!(low.analyzer, AnalyzerKind::Market);
    }

    #[test]
    fn test_neutral_keeps_flag() {
        let score = AgentScore::neutral(Evidence::Connections(ConnectionsEvidence {
            insufficient_data: true,
            ..Default::default()
        }));
        assert_eq!(score.score, NEUTRAL_SCORE);
        assert!(score.insufficient_data());
        assert_eq!(score.evidence.citations(), vec!["connections=no_data".to_string()]);
    }

    #[test]
    fn test_citations_never_empty() {
        let evidences = vec![
            Evidence::Form(FormEvidence::default()),
            Evidence::Connections(ConnectionsEvidence::default()),
            Evidence::CourseDistance(CourseDistanceEvidence::default()),
            Evidence::Ratings(RatingsEvidence::default()),
            Evidence::Market(MarketEvidence::default()),
        ];
        for evidence in evidences {
            assert!(!evidence.citations().is_empty(), "{:?} produced no citations", evidence.kind());
        }
    }

    #[test]
    fn test_connections_citation_format() {
        let evidence = Evidence::Connections(ConnectionsEvidence {
            window_days: 14,
            trainer_sr: Some(27.27),
            ..Default::default()
        });
        assert_eq!(evidence.citations(), vec!["trainer_sr_14d=27.3".to_string()]);
    }

    #[test]
    fn test_kind_order_is_stable() {
        let mut kinds = AnalyzerKind::ALL.to_vec();
        kinds.reverse();
        kinds.sort();
        assert_eq!(kinds, AnalyzerKind::ALL.to_vec());
    }
}
