//! API request and response types.

use serde::{Deserialize, Serialize};

use crate::decision::Decision;
use crate::session::SessionState;

/// Request to submit a new task for interrogation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    /// The task text, as the user typed it
    pub text: String,
}

/// Request carrying the user's answer to the pending question.
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerRequest {
    pub answer: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// The session as seen by the presentation layer: its state, the question
/// waiting for an answer (if any), and the verdict once one exists.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub state: SessionState,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<VerdictView>,
}

/// Terminal outcome of a session.
#[derive(Debug, Clone, Serialize)]
pub struct VerdictView {
    pub accepted: bool,
    pub score: u8,
    pub message: String,
}

impl From<Decision> for VerdictView {
    fn from(decision: Decision) -> Self {
        Self {
            accepted: decision.accepted,
            score: decision.score,
            message: decision.message,
        }
    }
}
