pub mod aggregator;
pub mod analyzers;
pub mod context;
pub mod evidence;
pub mod orchestrator;
pub mod policy;
pub mod verdict;

// Re-export main types for convenience
pub use aggregator::{AggregationError, AggregationWeights, ScoreAggregator};
pub use analyzers::{Analyzer, AnalyzerConfig, AnalyzerSet};
pub use context::RaceContext;
pub use evidence::{AgentScore, AgentScores, AnalyzerKind, Evidence, NEUTRAL_SCORE};
pub use orchestrator::{OracleConfig, RaceOrchestrator, RaceOutcome, RaceSummary, RunError};
pub use policy::{Action, Decision, DecisionPolicy, DecisionRule, EvidenceBundle, PolicyConfig, RuleId};
pub use verdict::Verdict;
