//! 🏇 Race Card Model
//!
//! Normalized snapshot of one race: course/distance/going context plus one
//! `RunnerRecord` per horse (form, ratings, connections, market price).
//! Records are immutable for the duration of one analysis pass.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Maximum number of recent form figures carried per runner
pub const MAX_FORM_FIGURES: usize = 10;

/// Lowest decimal price accepted from the market feed
pub const MIN_VALID_ODDS: f64 = 1.01;

/// Race-level precondition failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RaceError {
    #[error("race {race_id} has no runners")]
    EmptyField { race_id: String },

    #[error("runner at position {position} has an empty horse name")]
    EmptyHorseName { position: usize },

    #[error("duplicate runner '{horse_name}' in race {race_id}")]
    DuplicateRunner { race_id: String, horse_name: String },

    #[error("invalid odds {odds} for '{horse_name}' (must be finite and >= 1.01)")]
    InvalidOdds { horse_name: String, odds: f64 },

    #[error("'{horse_name}' has {count} form figures (max 10)")]
    TooManyFormFigures { horse_name: String, count: usize },
}

/// Kinds of rating a runner may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingKind {
    Official,
    RacingPost,
    Speed,
}

impl RatingKind {
    /// Default order used to pick a race's rating basis when coverage ties
    pub const PREFERENCE: [RatingKind; 3] = [RatingKind::Official, RatingKind::RacingPost, RatingKind::Speed];

    pub fn as_str(&self) -> &'static str {
        match self {
            RatingKind::Official => "official",
            RatingKind::RacingPost => "racing_post",
            RatingKind::Speed => "speed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "official" | "or" => Some(RatingKind::Official),
            "racing_post" | "rpr" => Some(RatingKind::RacingPost),
            "speed" | "ts" => Some(RatingKind::Speed),
            _ => None,
        }
    }
}

/// Ratings snapshot; any kind may be absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ratings {
    #[serde(default)]
    pub official: Option<i32>,
    #[serde(default)]
    pub racing_post: Option<i32>,
    #[serde(default)]
    pub speed: Option<i32>,
}

impl Ratings {
    pub fn get(&self, kind: RatingKind) -> Option<i32> {
        match kind {
            RatingKind::Official => self.official,
            RatingKind::RacingPost => self.racing_post,
            RatingKind::Speed => self.speed,
        }
    }
}

/// Trainer and jockey; empty strings mean "not declared"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connections {
    #[serde(default)]
    pub trainer: String,
    #[serde(default)]
    pub jockey: String,
}

impl Connections {
    pub fn trainer(&self) -> Option<&str> {
        non_blank(&self.trainer)
    }

    pub fn jockey(&self) -> Option<&str> {
        non_blank(&self.jockey)
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// One horse's snapshot for a race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerRecord {
    pub horse_name: String,

    /// Recent finishing positions, most recent first (0 = did not complete)
    #[serde(default)]
    pub form_figures: Vec<u8>,

    #[serde(default)]
    pub ratings: Ratings,

    #[serde(default)]
    pub connections: Connections,

    /// Decimal market price, absent before a market forms
    #[serde(default)]
    pub odds: Option<f64>,
}

impl RunnerRecord {
    pub fn new(horse_name: impl Into<String>) -> Self {
        Self {
            horse_name: horse_name.into(),
            form_figures: Vec::new(),
            ratings: Ratings::default(),
            connections: Connections::default(),
            odds: None,
        }
    }

    pub fn with_form(mut self, figures: &[u8]) -> Self {
        self.form_figures = figures.to_vec();
        self
    }

    pub fn with_rating(mut self, kind: RatingKind, value: i32) -> Self {
        match kind {
            RatingKind::Official => self.ratings.official = Some(value),
            RatingKind::RacingPost => self.ratings.racing_post = Some(value),
            RatingKind::Speed => self.ratings.speed = Some(value),
        }
        self
    }

    pub fn with_connections(mut self, trainer: &str, jockey: &str) -> Self {
        self.connections = Connections {
            trainer: trainer.to_string(),
            jockey: jockey.to_string(),
        };
        self
    }

    pub fn with_odds(mut self, odds: f64) -> Self {
        self.odds = Some(odds);
        self
    }

    /// Check the record-level invariants (name, odds, form length)
    pub fn validate(&self, position: usize) -> Result<(), RaceError> {
        if self.horse_name.trim().is_empty() {
            return Err(RaceError::EmptyHorseName { position });
        }

        if let Some(odds) = self.odds {
            if !odds.is_finite() || odds < MIN_VALID_ODDS {
                return Err(RaceError::InvalidOdds {
                    horse_name: self.horse_name.clone(),
                    odds,
                });
            }
        }

        if self.form_figures.len() > MAX_FORM_FIGURES {
            return Err(RaceError::TooManyFormFigures {
                horse_name: self.horse_name.clone(),
                count: self.form_figures.len(),
            });
        }

        Ok(())
    }
}

/// A race and its declared runners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceCard {
    pub race_id: String,
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub distance: String,
    #[serde(default)]
    pub going: String,
    pub runners: Vec<RunnerRecord>,
}

/// A race file holds either one card or a whole day's card
#[derive(Deserialize)]
#[serde(untagged)]
enum RaceFile {
    Many(Vec<RaceCard>),
    One(RaceCard),
}

impl RaceCard {
    pub fn new(race_id: impl Into<String>, course: &str, distance: &str, going: &str) -> Self {
        Self {
            race_id: race_id.into(),
            course: course.to_string(),
            distance: distance.to_string(),
            going: going.to_string(),
            runners: Vec::new(),
        }
    }

    pub fn with_runner(mut self, runner: RunnerRecord) -> Self {
        self.runners.push(runner);
        self
    }

    /// Validate race-level preconditions before any scoring happens
    ///
    /// Non-empty field, every runner valid, horse names unique (case-insensitive).
    pub fn validate(&self) -> Result<(), RaceError> {
        if self.runners.is_empty() {
            return Err(RaceError::EmptyField {
                race_id: self.race_id.clone(),
            });
        }

        let mut seen = HashSet::with_capacity(self.runners.len());
        for (position, runner) in self.runners.iter().enumerate() {
            runner.validate(position)?;

            if !seen.insert(runner.horse_name.trim().to_lowercase()) {
                return Err(RaceError::DuplicateRunner {
                    race_id: self.race_id.clone(),
                    horse_name: runner.horse_name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Load one or more race cards from a JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Vec<RaceCard>> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read race file: {}", path.display()))?;

        let parsed: RaceFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse race file: {}", path.display()))?;

        Ok(match parsed {
            RaceFile::Many(cards) => cards,
            RaceFile::One(card) => vec![card],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_runner_race() -> RaceCard {
        RaceCard::new("R1", "Cheltenham", "2m", "good")
            .with_runner(RunnerRecord::new("Alpha").with_odds(4.0))
            .with_runner(RunnerRecord::new("Bravo").with_odds(6.5))
    }

    #[test]
    fn test_valid_race_passes() {
        assert!(two_runner_race().validate().is_ok());
    }

    #[test]
    fn test_empty_field_rejected() {
        let race = RaceCard::new("R2", "Ascot", "1m", "soft");
        assert_eq!(
            race.validate(),
            Err(RaceError::EmptyField { race_id: "R2".to_string() })
        );
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let race = two_runner_race().with_runner(RunnerRecord::new("alpha "));
        match race.validate() {
            Err(RaceError::DuplicateRunner { horse_name, .. }) => assert_eq!(horse_name, "alpha "),
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn test_degenerate_odds_rejected() {
        for odds in [1.0, 0.0, -3.0, f64::NAN, f64::INFINITY] {
            let race = RaceCard::new("R3", "York", "6f", "firm")
                .with_runner(RunnerRecord::new("Charlie").with_odds(odds));
            assert!(
                matches!(race.validate(), Err(RaceError::InvalidOdds { .. })),
                "odds {} should be rejected",
                odds
            );
        }
    }

    #[test]
    fn test_minimum_odds_accepted() {
        let race = RaceCard::new("R4", "York", "6f", "firm")
            .with_runner(RunnerRecord::new("Delta").with_odds(MIN_VALID_ODDS));
        assert!(race.validate().is_ok());
    }

    #[test]
    fn test_blank_name_rejected() {
        let race = two_runner_race().with_runner(RunnerRecord::new("   "));
        assert_eq!(race.validate(), Err(RaceError::EmptyHorseName { position: 2 }));
    }

    #[test]
    fn test_form_window_limit() {
        let race = RaceCard::new("R5", "Ayr", "5f", "good")
            .with_runner(RunnerRecord::new("Echo").with_form(&[1; 11]));
        assert!(matches!(race.validate(), Err(RaceError::TooManyFormFigures { count: 11, .. })));
    }

    #[test]
    fn test_rating_kind_parse() {
        assert_eq!(RatingKind::parse("OR"), Some(RatingKind::Official));
        assert_eq!(RatingKind::parse(" racing_post "), Some(RatingKind::RacingPost));
        assert_eq!(RatingKind::parse("speed"), Some(RatingKind::Speed));
        assert_eq!(RatingKind::parse("elo"), None);
    }

    #[test]
    fn test_parse_single_and_many() {
        let single = r#"{"race_id":"R1","course":"Ascot","runners":[{"horse_name":"A","odds":5.0}]}"#;
        let parsed: RaceFile = serde_json::from_str(single).unwrap();
        assert!(matches!(parsed, RaceFile::One(_)));

        let many = format!("[{}, {}]", single, single.replace("R1", "R2"));
        let parsed: RaceFile = serde_json::from_str(&many).unwrap();
        match parsed {
            RaceFile::Many(cards) => assert_eq!(cards.len(), 2),
            RaceFile::One(_) => panic!("expected a list of cards"),
        }
    }

    #[test]
    fn test_connections_blank_is_unknown() {
        let runner = RunnerRecord::new("Foxtrot").with_connections("  ", "R Moore");
        assert_eq!(runner.connections.trainer(), None);
        assert_eq!(runner.connections.jockey(), Some("R Moore"));
    }
}
