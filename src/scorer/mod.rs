//! Remote scorer client for the reflective interrogation.
//!
//! This module provides a trait-based abstraction over the scoring provider,
//! with the Gemini REST API as the primary implementation. The contract is
//! small: the full conversation goes out, and either a follow-up question or
//! a bare terminal score comes back.

mod error;
mod gemini;
pub mod prompt;

pub use error::{classify_http_status, RetryConfig, ScorerError, ScorerErrorKind};
pub use gemini::GeminiScorer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One answered question of the interrogation.
///
/// Immutable once appended to the conversation history. Serializes as
/// `{"question": ..., "answer": ...}`, which is also its wire form in
/// scoring requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

/// Wire request for a scoring call. The same shape is sent for every turn;
/// the provider decides from the history length whether to ask another
/// question or deliver the final verdict.
#[derive(Debug, Serialize)]
pub struct ScoreRequest<'a> {
    pub task: &'a str,
    #[serde(rename = "conversationHistory")]
    pub conversation_history: &'a [Turn],
}

/// Decoded scorer reply.
///
/// Both fields are defaulted so any JSON object decodes; validating the
/// score is the caller's job (out-of-range or missing scores normalize to
/// [`NEUTRAL_SCORE`]). A `question` of `None` is the terminal signal - there
/// is no separate flag.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ScorerReply {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub likelihood_score: Option<i64>,
}

impl ScorerReply {
    /// Whether this reply ends the interrogation.
    pub fn is_terminal(&self) -> bool {
        self.question.is_none()
    }
}

/// Fallback score when the provider sends something unusable in place of an
/// integer in [1,10]. One bad payload must not lose the conversation.
pub const NEUTRAL_SCORE: u8 = 5;

/// Clamp a raw reply score into a usable [1,10] value.
///
/// Missing, non-integer, and out-of-range scores all collapse to the
/// neutral default rather than failing the turn.
pub fn normalize_score(raw: Option<i64>) -> u8 {
    match raw {
        Some(s) if (1..=10).contains(&s) => s as u8,
        Some(s) => {
            tracing::warn!("Scorer sent out-of-range score {}, using neutral default", s);
            NEUTRAL_SCORE
        }
        None => {
            tracing::warn!("Scorer reply had no usable score, using neutral default");
            NEUTRAL_SCORE
        }
    }
}

/// Trait for scorer clients.
#[async_trait]
pub trait ScorerClient: Send + Sync {
    /// Run one scoring call with the task and the full conversation so far.
    async fn score(&self, task: &str, history: &[Turn]) -> Result<ScorerReply, ScorerError>;
}
