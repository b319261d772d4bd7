//! 📈 Velocity Statistics
//!
//! Precomputed win/run aggregates for trainers, jockeys and horses in a
//! course/distance/going context. A strike rate only exists when the entity
//! has actually run; zero runs is "no data", never a 0% strike rate.

use serde::{Deserialize, Serialize};

/// Course context a horse record is keyed on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum CourseContext {
    Course(String),
    Distance(String),
    Going(String),
}

impl CourseContext {
    pub fn label(&self) -> &'static str {
        match self {
            CourseContext::Course(_) => "course",
            CourseContext::Distance(_) => "distance",
            CourseContext::Going(_) => "going",
        }
    }
}

/// Entity a statistic belongs to
///
/// Names are normalized on construction so lookups ignore case and spacing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VelocityKey {
    Trainer(String),
    Jockey(String),
    Horse { horse: String, context: CourseContext },
}

impl VelocityKey {
    pub fn trainer(name: &str) -> Self {
        VelocityKey::Trainer(normalize(name))
    }

    pub fn jockey(name: &str) -> Self {
        VelocityKey::Jockey(normalize(name))
    }

    pub fn horse_at_course(horse: &str, course: &str) -> Self {
        VelocityKey::Horse {
            horse: normalize(horse),
            context: CourseContext::Course(normalize(course)),
        }
    }

    pub fn horse_at_distance(horse: &str, distance: &str) -> Self {
        VelocityKey::Horse {
            horse: normalize(horse),
            context: CourseContext::Distance(normalize(distance)),
        }
    }

    pub fn horse_on_going(horse: &str, going: &str) -> Self {
        VelocityKey::Horse {
            horse: normalize(horse),
            context: CourseContext::Going(normalize(going)),
        }
    }
}

/// Lowercase and collapse whitespace
pub fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Aggregation window of a statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatWindow {
    /// Last N days (N is fixed per store, see `VelocityCache`)
    Recent,
    Lifetime,
}

/// One entity's record over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityStat {
    pub key: VelocityKey,
    pub window: StatWindow,
    pub wins: u32,
    pub runs: u32,
    /// Level-stake profit/loss in points over the window, when known
    pub profit_loss: Option<f64>,
}

impl VelocityStat {
    pub fn new(key: VelocityKey, window: StatWindow, wins: u32, runs: u32) -> Self {
        Self {
            key,
            window,
            wins,
            runs,
            profit_loss: None,
        }
    }

    pub fn with_profit_loss(mut self, profit_loss: f64) -> Self {
        self.profit_loss = Some(profit_loss);
        self
    }

    /// wins / runs × 100, or `None` when the entity has no runs
    pub fn strike_rate(&self) -> Option<f64> {
        if self.runs == 0 {
            return None;
        }
        Some(self.wins as f64 / self.runs as f64 * 100.0)
    }

    /// Record string in "wins-runs" form
    pub fn record(&self) -> String {
        format!("{}-{}", self.wins, self.runs)
    }

    /// Positive cumulative P/L over the window (`None` if P/L unknown)
    pub fn is_profitable(&self) -> Option<bool> {
        self.profit_loss.map(|pl| pl > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strike_rate() {
        let stat = VelocityStat::new(VelocityKey::trainer("W P Mullins"), StatWindow::Recent, 3, 10);
        assert_eq!(stat.strike_rate(), Some(30.0));
        assert_eq!(stat.record(), "3-10");
    }

    #[test]
    fn test_zero_runs_is_no_data() {
        let stat = VelocityStat::new(VelocityKey::jockey("P Townend"), StatWindow::Recent, 0, 0);
        assert_eq!(stat.strike_rate(), None);
    }

    #[test]
    fn test_key_normalization() {
        assert_eq!(VelocityKey::trainer("  W  P Mullins "), VelocityKey::trainer("w p mullins"));
        assert_eq!(
            VelocityKey::horse_at_course("Galopin Des Champs", "LEOPARDSTOWN"),
            VelocityKey::horse_at_course("galopin des champs", "Leopardstown")
        );
        assert_ne!(
            VelocityKey::horse_at_course("Constitution Hill", "Kempton"),
            VelocityKey::horse_on_going("Constitution Hill", "Kempton")
        );
    }

    #[test]
    fn test_profitability() {
        let key = VelocityKey::trainer("N Henderson");
        let stat = VelocityStat::new(key.clone(), StatWindow::Recent, 2, 12);
        assert_eq!(stat.is_profitable(), None);
        assert_eq!(stat.clone().with_profit_loss(4.5).is_profitable(), Some(true));
        assert_eq!(stat.with_profit_loss(-2.0).is_profitable(), Some(false));
    }
}
