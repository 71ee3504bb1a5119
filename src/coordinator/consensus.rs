//! Consensus engine - pools independent answers into one decision.
//!
//! Answers are compared by normalized text (trimmed, case-folded). The
//! agreement level is the fraction of participants matching the plurality
//! answer; plurality ties go to the answer whose earliest member responded
//! first, which is why callers collect answers in completion order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::CoordinatorError;
use crate::agent::AgentId;
use crate::task::ConsensusResult;

/// One agent's answer in a consensus round, in completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAnswer {
    pub agent_id: AgentId,
    pub answer: String,
    pub confidence: f64,
}

impl AgentAnswer {
    pub fn new(agent_id: AgentId, answer: impl Into<String>, confidence: f64) -> Self {
        Self {
            agent_id,
            answer: answer.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

fn normalize(answer: &str) -> String {
    answer.trim().to_lowercase()
}

/// Quorum analysis over pooled answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsensusEngine;

impl ConsensusEngine {
    pub fn new() -> Self {
        Self
    }

    /// Decide whether the pooled answers reach the threshold.
    ///
    /// # Errors
    /// - `InvalidConfiguration` when `threshold` is outside [0, 1]
    /// - `ConsensusNotReached` when there are no participating answers
    pub fn analyze(
        &self,
        answers: &[AgentAnswer],
        threshold: f64,
    ) -> Result<ConsensusResult, CoordinatorError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(CoordinatorError::InvalidConfiguration(format!(
                "consensus threshold {threshold} is outside [0, 1]"
            )));
        }

        if answers.is_empty() {
            return Err(CoordinatorError::ConsensusNotReached { level: 0.0 });
        }

        // (count, first completion index) per normalized answer
        let mut groups: HashMap<String, (usize, usize)> = HashMap::new();
        for (index, answer) in answers.iter().enumerate() {
            let entry = groups.entry(normalize(&answer.answer)).or_insert((0, index));
            entry.0 += 1;
        }

        let (count, first_index) = groups
            .values()
            .copied()
            .max_by(|(ca, fa), (cb, fb)| ca.cmp(cb).then(fb.cmp(fa)))
            .ok_or(CoordinatorError::ConsensusNotReached { level: 0.0 })?;

        let agreement = count as f64 / answers.len() as f64;
        let reached = agreement >= threshold;

        tracing::debug!(
            participants = answers.len(),
            agreement,
            reached,
            "consensus analyzed"
        );

        Ok(ConsensusResult {
            reached,
            agreement,
            answer: Some(answers[first_index].answer.trim().to_string()),
            participants: answers.len(),
        })
    }
}
