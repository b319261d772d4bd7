//! ⚖️ Score Aggregation
//!
//! Combines the five agent scores into one final score:
//! - 25% Connections
//! - 20% Ratings
//! - 20% Form
//! - 20% Course/Distance
//! - 15% Market
//!
//! The result is a convex combination, so it always lies between the lowest
//! and highest agent score.

use super::evidence::{AgentScores, AnalyzerKind};
use thiserror::Error;

/// Allowed drift from 1.0 when checking the weight total
const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregationError {
    #[error("missing {0} score")]
    MissingScore(AnalyzerKind),

    #[error("weights must sum to 1.0 (got {total:.6})")]
    WeightsDoNotSumToOne { total: f64 },

    #[error("invalid {kind} weight {value} (must be finite and >= 0)")]
    InvalidWeight { kind: AnalyzerKind, value: f64 },
}

/// Per-analyzer weights
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationWeights {
    pub connections: f64,
    pub ratings: f64,
    pub form: f64,
    pub course_distance: f64,
    pub market: f64,
}

impl Default for AggregationWeights {
    fn default() -> Self {
        Self {
            connections: 0.25,
            ratings: 0.20,
            form: 0.20,
            course_distance: 0.20,
            market: 0.15,
        }
    }
}

impl AggregationWeights {
    pub fn weight(&self, kind: AnalyzerKind) -> f64 {
        match kind {
            AnalyzerKind::Connections => self.connections,
            AnalyzerKind::Ratings => self.ratings,
            AnalyzerKind::Form => self.form,
            AnalyzerKind::CourseDistance => self.course_distance,
            AnalyzerKind::Market => self.market,
        }
    }

    pub fn total(&self) -> f64 {
        AnalyzerKind::ALL.iter().map(|k| self.weight(*k)).sum()
    }

    pub fn validate(&self) -> Result<(), AggregationError> {
        for kind in AnalyzerKind::ALL {
            let value = self.weight(kind);
            if !value.is_finite() || value < 0.0 {
                return Err(AggregationError::InvalidWeight { kind, value });
            }
        }

        let total = self.total();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(AggregationError::WeightsDoNotSumToOne { total });
        }
        Ok(())
    }
}

/// Weighted final-score calculator
#[derive(Debug, Clone)]
pub struct ScoreAggregator {
    weights: AggregationWeights,
}

impl ScoreAggregator {
    /// Fails on weights that do not form a convex combination
    pub fn new(weights: AggregationWeights) -> Result<Self, AggregationError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &AggregationWeights {
        &self.weights
    }

    /// Weighted mean of all five scores
    ///
    /// Summation runs in fixed analyzer order so the result does not depend on
    /// how the scores were produced.
    pub fn aggregate(&self, scores: &AgentScores) -> Result<f64, AggregationError> {
        let mut weighted = 0.0;
        let mut lo = f64::MAX;
        let mut hi = f64::MIN;

        for kind in AnalyzerKind::ALL {
            let score = scores.get(&kind).ok_or(AggregationError::MissingScore(kind))?.score;
            weighted += self.weights.weight(kind) * score;
            lo = lo.min(score);
            hi = hi.max(score);
        }

        // Rounding can push the mean a hair outside the inputs
        Ok((weighted / self.weights.total()).clamp(lo, hi))
    }
}
