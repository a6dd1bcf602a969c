// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};

use crate::domain::agent::{AgentId, FeedbackEntry};

/// Weight given to the newest rating.
pub const TRUST_EMA_ALPHA: f64 = 0.3;

/// Number of most recent feedback entries surfaced after an update.
pub const RECENT_FEEDBACK_LIMIT: usize = 3;

/// Scores are stored at this resolution so that successive updates compose
/// (`0.5 -> 0.65 -> 0.755` for two ratings of `1.0`).
const SCORE_SCALE: f64 = 1000.0;

/// `(1 - α) * old + α * rating`, rounded to the stored score resolution.
pub fn ema_trust(old_score: f64, rating: f64) -> f64 {
    let blended = (1.0 - TRUST_EMA_ALPHA) * old_score + TRUST_EMA_ALPHA * rating;
    (blended * SCORE_SCALE).round() / SCORE_SCALE
}

/// Outcome of applying one feedback entry to an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustUpdate {
    pub agent_id: AgentId,
    pub old_score: f64,
    pub new_score: f64,
    pub recent_feedback: Vec<FeedbackEntry>,
}
