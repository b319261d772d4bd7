//! 🎯 Decision Policy
//!
//! Maps a final score plus the analyzers' evidence onto BACK / LAY / PASS.
//! Rules are evaluated in priority order and the first match wins:
//! 1. Strong back: score > 70, hot connections, course/distance specialist → BACK 2%
//! 2. Value back: score > 60, market value signal → BACK 1%
//! 3. Lay: score < 40 → LAY 0.5%
//! 4. Otherwise PASS
//!
//! The odds gate runs after rule selection: a price outside the configured
//! range (or no price at all) turns any BACK/LAY into PASS.

use super::evidence::{AgentScores, AnalyzerKind, Evidence};
use crate::race::MIN_VALID_ODDS;
use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Betting action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Back,
    Lay,
    Pass,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Back => "BACK",
            Action::Lay => "LAY",
            Action::Pass => "PASS",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule identifier, recorded on every verdict a rule produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleId {
    StrongBack,
    ValueBack,
    Lay,
}

impl RuleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::StrongBack => "STRONG_BACK",
            RuleId::ValueBack => "VALUE_BACK",
            RuleId::Lay => "LAY",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy thresholds, stakes and odds gate
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    /// Final score a strong back must exceed (default: 70)
    pub strong_back_score: f64,
    /// Final score a value back must exceed (default: 60)
    pub value_back_score: f64,
    /// Final score a lay must be below (default: 40)
    pub lay_score: f64,

    /// Stakes as % of bank
    pub strong_back_stake_pct: f64,
    pub value_back_stake_pct: f64,
    pub lay_stake_pct: f64,

    /// Inclusive decimal odds range outside which no bet is placed
    pub odds_min: f64,
    pub odds_max: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            strong_back_score: 70.0,
            value_back_score: 60.0,
            lay_score: 40.0,
            strong_back_stake_pct: 2.0,
            value_back_stake_pct: 1.0,
            lay_stake_pct: 0.5,
            odds_min: 3.0,
            odds_max: 20.0,
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("STRONG_BACK_SCORE", self.strong_back_score),
            ("VALUE_BACK_SCORE", self.value_back_score),
            ("LAY_SCORE", self.lay_score),
        ] {
            if !(0.0..=100.0).contains(&value) {
                bail!("{} must be between 0 and 100 (got {})", name, value);
            }
        }
        if !(self.lay_score < self.value_back_score && self.value_back_score < self.strong_back_score) {
            bail!(
                "Thresholds must satisfy LAY_SCORE < VALUE_BACK_SCORE < STRONG_BACK_SCORE ({} / {} / {})",
                self.lay_score,
                self.value_back_score,
                self.strong_back_score
            );
        }

        for (name, value) in [
            ("STRONG_BACK_STAKE_PCT", self.strong_back_stake_pct),
            ("VALUE_BACK_STAKE_PCT", self.value_back_stake_pct),
            ("LAY_STAKE_PCT", self.lay_stake_pct),
        ] {
            if !(value > 0.0 && value <= 100.0) {
                bail!("{} must be > 0 and <= 100 (got {})", name, value);
            }
        }

        if self.odds_min < MIN_VALID_ODDS {
            bail!("ODDS_MIN must be >= {} (got {})", MIN_VALID_ODDS, self.odds_min);
        }
        if !(self.odds_min < self.odds_max) {
            bail!("ODDS_MIN ({}) must be below ODDS_MAX ({})", self.odds_min, self.odds_max);
        }
        Ok(())
    }
}

/// What the policy sees of one runner
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvidenceBundle {
    pub final_score: f64,
    pub odds: Option<f64>,
    /// Hot trainer or hot jockey
    pub hot_connections: bool,
    pub specialist: bool,
    pub value_signal: bool,
    /// (score, citations) per analyzer
    pub findings: BTreeMap<AnalyzerKind, (f64, Vec<String>)>,
}

impl EvidenceBundle {
    pub fn from_scores(final_score: f64, scores: &AgentScores) -> Self {
        let mut bundle = Self {
            final_score,
            ..Default::default()
        };

        for (kind, score) in scores {
            match &score.evidence {
                Evidence::Connections(e) => bundle.hot_connections = e.hot_trainer || e.hot_jockey,
                Evidence::CourseDistance(e) => bundle.specialist = e.specialist,
                Evidence::Market(e) => {
                    bundle.odds = e.odds;
                    bundle.value_signal = e.value_signal;
                }
                Evidence::Form(_) | Evidence::Ratings(_) => {}
            }
            bundle.findings.insert(*kind, (score.score, score.evidence.citations()));
        }
        bundle
    }

    fn cite(&self, kinds: &[AnalyzerKind]) -> String {
        kinds
            .iter()
            .filter_map(|k| self.findings.get(k))
            .flat_map(|(_, citations)| citations.iter().cloned())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Analyzers dragging the runner down: all below `threshold`, or else the weakest
    fn weakest(&self, threshold: f64) -> Vec<AnalyzerKind> {
        let below: Vec<AnalyzerKind> = self
            .findings
            .iter()
            .filter(|(_, (score, _))| *score < threshold)
            .map(|(kind, _)| *kind)
            .collect();
        if !below.is_empty() {
            return below;
        }

        self.findings
            .iter()
            .min_by(|a, b| a.1 .0.partial_cmp(&b.1 .0).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(kind, _)| vec![*kind])
            .unwrap_or_default()
    }
}

/// One prioritized rule
pub struct DecisionRule {
    pub id: RuleId,
    pub action: Action,
    pub stake_pct: f64,
    predicate: fn(&EvidenceBundle, &PolicyConfig) -> bool,
}

impl DecisionRule {
    pub fn matches(&self, bundle: &EvidenceBundle, config: &PolicyConfig) -> bool {
        (self.predicate)(bundle, config)
    }
}

/// Policy output for one runner
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: Action,
    pub stake_pct: f64,
    /// Rule that fired, kept even when the odds gate vetoed it
    pub rule: Option<RuleId>,
    pub gated: bool,
    pub reason: String,
}

pub struct DecisionPolicy {
    config: PolicyConfig,
    rules: Vec<DecisionRule>,
}

impl DecisionPolicy {
    pub fn new(config: PolicyConfig) -> Result<Self> {
        config.validate()?;

        let rules = vec![
            DecisionRule {
                id: RuleId::StrongBack,
                action: Action::Back,
                stake_pct: config.strong_back_stake_pct,
                predicate: |b, c| b.final_score > c.strong_back_score && b.hot_connections && b.specialist,
            },
            DecisionRule {
                id: RuleId::ValueBack,
                action: Action::Back,
                stake_pct: config.value_back_stake_pct,
                predicate: |b, c| b.final_score > c.value_back_score && b.value_signal,
            },
            DecisionRule {
                id: RuleId::Lay,
                action: Action::Lay,
                stake_pct: config.lay_stake_pct,
                predicate: |b, c| b.final_score < c.lay_score,
            },
        ];

        Ok(Self { config, rules })
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn rules(&self) -> &[DecisionRule] {
        &self.rules
    }

    fn odds_in_range(&self, odds: Option<f64>) -> bool {
        matches!(odds, Some(o) if o >= self.config.odds_min && o <= self.config.odds_max)
    }

    pub fn decide(&self, bundle: &EvidenceBundle) -> Decision {
        let rule = match self.rules.iter().find(|r| r.matches(bundle, &self.config)) {
            Some(rule) => rule,
            None => {
                return Decision {
                    action: Action::Pass,
                    stake_pct: 0.0,
                    rule: None,
                    gated: false,
                    reason: format!(
                        "NO_EDGE: score {:.1} matched no rule (lay < {}, value > {}, strong > {})",
                        bundle.final_score, self.config.lay_score, self.config.value_back_score, self.config.strong_back_score
                    ),
                }
            }
        };

        let (condition, cited) = match rule.id {
            RuleId::StrongBack => (
                format!("score {:.1} > {} with hot connections and specialist", bundle.final_score, self.config.strong_back_score),
                bundle.cite(&[AnalyzerKind::Connections, AnalyzerKind::CourseDistance]),
            ),
            RuleId::ValueBack => (
                format!("score {:.1} > {} with market value", bundle.final_score, self.config.value_back_score),
                bundle.cite(&[AnalyzerKind::Market]),
            ),
            RuleId::Lay => (
                format!("score {:.1} < {}", bundle.final_score, self.config.lay_score),
                bundle.cite(&bundle.weakest(self.config.lay_score)),
            ),
        };

        if !self.odds_in_range(bundle.odds) {
            let price = bundle
                .odds
                .map(|o| format!("odds {:.2}", o))
                .unwrap_or_else(|| "no odds".to_string());
            return Decision {
                action: Action::Pass,
                stake_pct: 0.0,
                rule: Some(rule.id),
                gated: true,
                reason: format!(
                    "ODDS_GATE: {} outside [{:.2}, {:.2}] overrides {} {} ({}) | {}",
                    price,
                    self.config.odds_min,
                    self.config.odds_max,
                    rule.id,
                    rule.action,
                    condition,
                    cited
                ),
            };
        }

        Decision {
            action: rule.action,
            stake_pct: rule.stake_pct,
            rule: Some(rule.id),
            gated: false,
            reason: format!("{}: {} | {}", rule.id, condition, cited),
        }
    }
}
