//! The final accept/reject call on a task, given its terminal motivation score.
//!
//! Pure by design: the engine produces a [`Decision`] and nothing else. The
//! caller (the API layer) is responsible for actually appending the task to
//! the list on acceptance.

/// Scores at or below this threshold mean the interrogation worked: the user
/// is sufficiently demotivated and the task is rejected.
pub const DEMOTIVATION_THRESHOLD: u8 = 4;

/// Outcome of the final scoring call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub accepted: bool,
    pub score: u8,
    /// User-facing message, always embedding the task text and the score.
    pub message: String,
}

/// Map a terminal score to an accept/reject outcome.
///
/// A score exactly at the threshold rejects; there is no tie-break.
pub fn decide(task_text: &str, score: u8) -> Decision {
    if score > DEMOTIVATION_THRESHOLD {
        Decision {
            accepted: true,
            score,
            message: format!(
                "Despite your best efforts to question it (final score: {score}), \
                 \"{task_text}\" seems like it might actually happen. Task added. Good luck."
            ),
        }
    } else {
        Decision {
            accepted: false,
            score,
            message: format!(
                "Based on your profound reflections (final score: {score}), the universe \
                 has decided \"{task_text}\" is NOT worth your precious time. \
                 Task not added. You're welcome."
            ),
        }
    }
}
