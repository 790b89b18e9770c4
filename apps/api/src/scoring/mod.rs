//! Scoring stage — applies the fixed weighted rubric to evaluator
//! output and derives pass/fail, recommendation tier, and outreach.
//!
//! The weighted average is computed HERE, never delegated to the
//! evaluator, so identical dimension scores always produce identical
//! overall scores regardless of prompt drift. One bad candidate never
//! sinks the batch: persistent evaluator failure zeroes that candidate
//! and flags it instead.

pub mod evaluator;
pub mod prompts;

use std::sync::Arc;

use tracing::warn;

use crate::gate::{Capability, ConcurrencyGate};
use crate::models::candidate::{
    EnrichedCandidate, Recommendation, ScoreBreakdown, ScoredCandidate,
};
use crate::retry::RetryPolicy;

use self::evaluator::Evaluator;

/// Fixed dimension weights (percent). Must total 100.
pub const WEIGHT_EDUCATION: f64 = 20.0;
pub const WEIGHT_TRAJECTORY: f64 = 20.0;
pub const WEIGHT_COMPANY: f64 = 15.0;
pub const WEIGHT_SKILLS: f64 = 25.0;
pub const WEIGHT_LOCATION: f64 = 10.0;
pub const WEIGHT_TENURE: f64 = 10.0;

const WEIGHT_TOTAL: f64 = WEIGHT_EDUCATION
    + WEIGHT_TRAJECTORY
    + WEIGHT_COMPANY
    + WEIGHT_SKILLS
    + WEIGHT_LOCATION
    + WEIGHT_TENURE;

/// Weighted average of the six dimensions, two-decimal precision.
pub fn weighted_overall(scores: &ScoreBreakdown) -> f64 {
    let total = WEIGHT_EDUCATION * scores.education
        + WEIGHT_TRAJECTORY * scores.trajectory
        + WEIGHT_COMPANY * scores.company
        + WEIGHT_SKILLS * scores.skills
        + WEIGHT_LOCATION * scores.location
        + WEIGHT_TENURE * scores.tenure;
    round2(total / WEIGHT_TOTAL)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Templated greeting used when outreach generation fails — a passed
/// candidate always ships with a usable message.
pub fn fallback_outreach(candidate: &EnrichedCandidate) -> String {
    let c = &candidate.candidate;
    let mut message = format!("Hi {}! I came across your profile", c.name);
    if let Some(headline) = &c.headline {
        message.push_str(&format!(" as a {headline}"));
    }
    if let Some(location) = &c.location {
        message.push_str(&format!(" in {location}"));
    }
    message.push_str(
        ". I have an exciting opportunity that matches your expertise. \
         Would you be open to a brief chat?",
    );
    message
}

pub struct ScoringStage {
    evaluator: Arc<dyn Evaluator>,
    gate: Arc<ConcurrencyGate>,
}

impl ScoringStage {
    pub fn new(evaluator: Arc<dyn Evaluator>, gate: Arc<ConcurrencyGate>) -> Self {
        Self { evaluator, gate }
    }

    pub async fn score(&self, enriched: EnrichedCandidate, requirements: &str) -> ScoredCandidate {
        let retry = RetryPolicy::single_retry();

        let evaluation = {
            let _permit = self.gate.acquire(Capability::Evaluate).await;
            retry
                .run("evaluate", || self.evaluator.evaluate(&enriched, requirements))
                .await
        };

        match evaluation {
            Ok(raw) => {
                let dimension_scores = raw.clamped();
                let overall_score = weighted_overall(&dimension_scores);
                let recommendation = Recommendation::from_score(overall_score);
                let passed = recommendation.passed();

                // Outreach text costs a second call; only spend it on
                // candidates above the pass threshold.
                let outreach_message = if passed {
                    Some(self.outreach(&enriched, requirements).await)
                } else {
                    None
                };

                ScoredCandidate {
                    enriched,
                    dimension_scores,
                    overall_score,
                    recommendation,
                    passed,
                    outreach_message,
                    scoring_error: None,
                }
            }
            Err(e) => {
                warn!("evaluator failed for {}: {e}", enriched.candidate.name);
                ScoredCandidate {
                    enriched,
                    dimension_scores: ScoreBreakdown::default(),
                    overall_score: 0.0,
                    recommendation: Recommendation::NoMatch,
                    passed: false,
                    outreach_message: None,
                    scoring_error: Some(e.to_string()),
                }
            }
        }
    }

    async fn outreach(&self, enriched: &EnrichedCandidate, requirements: &str) -> String {
        let retry = RetryPolicy::single_retry();
        let _permit = self.gate.acquire(Capability::Evaluate).await;
        match retry
            .run("generate_outreach", || {
                self.evaluator.generate_outreach(enriched, requirements)
            })
            .await
        {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    "outreach generation failed for {}: {e}",
                    enriched.candidate.name
                );
                fallback_outreach(enriched)
            }
        }
    }
}
