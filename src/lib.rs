// VÉLØ Oracle - Race Verdict Engine
// Scores every runner in a race with five analyzers, combines them by fixed weights
// and maps the result onto BACK / LAY / PASS with a stake percentage

pub mod audit;
pub mod config;
pub mod decision_engine;
pub mod metrics;
pub mod race;
pub mod velocity_cache;

pub use decision_engine::{OracleConfig, RaceOrchestrator, RaceOutcome, RunError, Verdict};
pub use race::{RaceCard, RaceError, RunnerRecord};
