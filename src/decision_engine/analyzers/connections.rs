//! Connections analyzer: trainer and jockey recent strike rates.
//!
//! - +25 hot trainer (recent SR ≥ 25%)
//! - +20 hot jockey (recent SR ≥ 20%)
//! - +20 hot combo when trainer and jockey are both in profit over the window

use super::{Analyzer, AnalyzerConfig};
use crate::decision_engine::context::RaceContext;
use crate::decision_engine::evidence::{AgentScore, AnalyzerKind, ConnectionsEvidence, Evidence};
use crate::race::RunnerRecord;
use crate::velocity_cache::{StatWindow, VelocityKey, VelocityStat, VelocityStore};

const HOT_TRAINER_BONUS: f64 = 25.0;
const HOT_JOCKEY_BONUS: f64 = 20.0;
const HOT_COMBO_BONUS: f64 = 20.0;

pub struct ConnectionsAnalyzer {
    base_score: f64,
    hot_trainer_sr: f64,
    hot_jockey_sr: f64,
    window_days: u32,
}

impl ConnectionsAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            base_score: config.connections_base,
            hot_trainer_sr: config.hot_trainer_sr,
            hot_jockey_sr: config.hot_jockey_sr,
            window_days: config.recent_window_days,
        }
    }
}

impl Analyzer for ConnectionsAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Connections
    }

    fn score(&self, runner: &RunnerRecord, _ctx: &RaceContext, stats: &dyn VelocityStore) -> AgentScore {
        let trainer = runner
            .connections
            .trainer()
            .and_then(|name| stats.lookup(&VelocityKey::trainer(name), StatWindow::Recent));
        let jockey = runner
            .connections
            .jockey()
            .and_then(|name| stats.lookup(&VelocityKey::jockey(name), StatWindow::Recent));

        // A record with zero runs carries no strike rate; treat it like a miss
        let trainer = trainer.filter(|s| s.strike_rate().is_some());
        let jockey = jockey.filter(|s| s.strike_rate().is_some());

        if trainer.is_none() && jockey.is_none() {
            return AgentScore::neutral(Evidence::Connections(ConnectionsEvidence {
                window_days: self.window_days,
                insufficient_data: true,
                ..Default::default()
            }));
        }

        let trainer_sr = trainer.as_ref().and_then(VelocityStat::strike_rate);
        let jockey_sr = jockey.as_ref().and_then(VelocityStat::strike_rate);

        let hot_trainer = trainer_sr.map_or(false, |sr| sr >= self.hot_trainer_sr);
        let hot_jockey = jockey_sr.map_or(false, |sr| sr >= self.hot_jockey_sr);
        let hot_combo = trainer.as_ref().and_then(VelocityStat::is_profitable) == Some(true)
            && jockey.as_ref().and_then(VelocityStat::is_profitable) == Some(true);

        let mut score = self.base_score;
        if hot_trainer {
            score += HOT_TRAINER_BONUS;
        }
        if hot_jockey {
            score += HOT_JOCKEY_BONUS;
        }
        if hot_combo {
            score += HOT_COMBO_BONUS;
        }

        AgentScore::new(
            score,
            Evidence::Connections(ConnectionsEvidence {
                window_days: self.window_days,
                trainer_sr,
                trainer_record: trainer.as_ref().map(VelocityStat::record),
                trainer_pl: trainer.as_ref().and_then(|s| s.profit_loss),
                jockey_sr,
                jockey_record: jockey.as_ref().map(VelocityStat::record),
                jockey_pl: jockey.as_ref().and_then(|s| s.profit_loss),
                hot_trainer,
                hot_jockey,
                hot_combo,
                insufficient_data: false,
            }),
        )
    }
}
