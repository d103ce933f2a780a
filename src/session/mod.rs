//! The reflective interrogation session: conversation store + turn controller.
//!
//! One session gates one task. The controller walks the state machine
//! `Idle -> AwaitingQuestion -> AwaitingAnswer -> AwaitingVerdict -> Terminal`,
//! owning the ordered history of answered turns and the scorer client. The
//! scorer's reply shape is the authority on when the interrogation ends: a
//! reply without a question is the terminal signal, whatever the local turn
//! count says. The local count only picks which `Awaiting*` state to park in
//! while a call is in flight.
//!
//! Scorer failures never advance the machine. The controller stays parked in
//! its `Awaiting*` state and [`TurnController::request_next`] doubles as the
//! retry entry point.

use std::sync::Arc;
use thiserror::Error;

use crate::decision::{decide, Decision};
use crate::scorer::{normalize_score, ScorerClient, ScorerError};

pub use crate::scorer::Turn;

/// Total turn budget for one session: up to five questions, then the final
/// scoring call. While a session is active, `history.len()` stays in
/// `[0, MAX_TURNS - 1]`.
pub const MAX_TURNS: usize = 6;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("a reflective session is already in progress")]
    AlreadyActive,

    #[error("no question is awaiting an answer")]
    NotAwaitingAnswer,

    #[error("no scorer call is pending")]
    NothingToRequest,

    #[error(transparent)]
    Scorer(#[from] ScorerError),
}

/// States of the turn controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session. `start` is the only legal move.
    Idle,
    /// A question-generation call is due or in flight (also the parked state
    /// after such a call fails).
    AwaitingQuestion,
    /// A question is on display, waiting for the user's answer.
    AwaitingAnswer,
    /// The final-verdict call is due or in flight.
    AwaitingVerdict,
    /// The verdict was delivered; the session content is already torn down.
    Terminal,
}

impl SessionState {
    fn is_active(self) -> bool {
        matches!(
            self,
            SessionState::AwaitingQuestion | SessionState::AwaitingAnswer | SessionState::AwaitingVerdict
        )
    }
}

/// What came back from advancing the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The next question to put to the user.
    Question(String),
    /// The terminal outcome. On acceptance the caller appends `task` to the
    /// task list; the controller itself never touches it.
    Verdict { task: String, decision: Decision },
}

/// Drives one reflective session at a time against a scorer.
pub struct TurnController {
    scorer: Arc<dyn ScorerClient>,
    state: SessionState,
    task_text: Option<String>,
    current_question: Option<String>,
    history: Vec<Turn>,
}

impl TurnController {
    pub fn new(scorer: Arc<dyn ScorerClient>) -> Self {
        Self {
            scorer,
            state: SessionState::Idle,
            task_text: None,
            current_question: None,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The question currently awaiting an answer, if any.
    pub fn current_question(&self) -> Option<&str> {
        self.current_question.as_deref()
    }

    /// The task under interrogation, if a session is active.
    pub fn task_text(&self) -> Option<&str> {
        self.task_text.as_deref()
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Begin interrogating a new task. Clears any prior session content and
    /// immediately requests the first question.
    pub async fn start(&mut self, task_text: &str) -> Result<SessionEvent, SessionError> {
        if self.state.is_active() {
            return Err(SessionError::AlreadyActive);
        }
        let task_text = task_text.trim();
        if task_text.is_empty() {
            return Err(SessionError::InvalidInput("task text is empty"));
        }

        self.history.clear();
        self.current_question = None;
        self.task_text = Some(task_text.to_string());
        self.state = SessionState::AwaitingQuestion;

        self.request_next().await
    }

    /// Issue the pending scorer call. Called internally after `start` and
    /// every answer; called directly to retry after a scorer failure.
    pub async fn request_next(&mut self) -> Result<SessionEvent, SessionError> {
        if !matches!(
            self.state,
            SessionState::AwaitingQuestion | SessionState::AwaitingVerdict
        ) {
            return Err(SessionError::NothingToRequest);
        }
        let Some(task) = self.task_text.clone() else {
            return Err(SessionError::NothingToRequest);
        };

        // Park in the state matching what we expect back. Only the reply
        // decides what actually happens next.
        self.state = if self.history.len() < MAX_TURNS - 1 {
            SessionState::AwaitingQuestion
        } else {
            SessionState::AwaitingVerdict
        };

        // On failure the `?` leaves the machine exactly where it parked.
        let reply = self.scorer.score(&task, &self.history).await?;

        match reply.question {
            Some(question) => {
                // Intermediate scores are advisory only and never retained.
                if let Some(score) = reply.likelihood_score {
                    tracing::debug!("Discarding intermediate score {}", score);
                }
                self.current_question = Some(question.clone());
                self.state = SessionState::AwaitingAnswer;
                Ok(SessionEvent::Question(question))
            }
            None => {
                let score = normalize_score(reply.likelihood_score);
                let decision = decide(&task, score);
                tracing::info!(
                    "Session for \"{}\" reached verdict: score={}, accepted={}",
                    task,
                    score,
                    decision.accepted
                );
                self.teardown(SessionState::Terminal);
                Ok(SessionEvent::Verdict { task, decision })
            }
        }
    }

    /// Record the user's answer to the pending question, then request the
    /// next turn.
    pub async fn submit_answer(&mut self, answer: &str) -> Result<SessionEvent, SessionError> {
        if self.state != SessionState::AwaitingAnswer {
            return Err(SessionError::NotAwaitingAnswer);
        }
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(SessionError::InvalidInput("answer is empty"));
        }
        let Some(question) = self.current_question.take() else {
            return Err(SessionError::NotAwaitingAnswer);
        };

        self.history.push(Turn {
            question,
            answer: answer.to_string(),
        });
        self.state = SessionState::AwaitingQuestion;

        self.request_next().await
    }

    /// Discard the session from any state without side effects.
    pub fn abort(&mut self) {
        if self.state.is_active() {
            tracing::info!(
                "Aborting session for \"{}\" after {} turns",
                self.task_text.as_deref().unwrap_or(""),
                self.history.len()
            );
        }
        self.teardown(SessionState::Idle);
    }

    fn teardown(&mut self, state: SessionState) {
        self.history.clear();
        self.task_text = None;
        self.current_question = None;
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::{ScorerErrorKind, ScorerReply};
    use crate::tasks::TaskList;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scorer that plays back a fixed list of replies and records the
    /// history length of every call it receives.
    struct ScriptedScorer {
        replies: Mutex<VecDeque<Result<ScorerReply, ScorerError>>>,
        seen_history_lens: Mutex<Vec<usize>>,
    }

    impl ScriptedScorer {
        fn new(replies: Vec<Result<ScorerReply, ScorerError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen_history_lens: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<usize> {
            self.seen_history_lens.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ScorerClient for ScriptedScorer {
        async fn score(&self, _task: &str, history: &[Turn]) -> Result<ScorerReply, ScorerError> {
            self.seen_history_lens.lock().unwrap().push(history.len());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted scorer ran out of replies")
        }
    }

    fn question(text: &str, score: i64) -> Result<ScorerReply, ScorerError> {
        Ok(ScorerReply {
            question: Some(text.to_string()),
            likelihood_score: Some(score),
        })
    }

    fn verdict(score: Option<i64>) -> Result<ScorerReply, ScorerError> {
        Ok(ScorerReply {
            question: None,
            likelihood_score: score,
        })
    }

    #[tokio::test]
    async fn start_rejects_blank_task() {
        let scorer = ScriptedScorer::new(vec![]);
        let mut controller = TurnController::new(scorer.clone());

        let err = controller.start("   ").await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidInput(_)));
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(scorer.seen().is_empty());
    }

    #[tokio::test]
    async fn question_reply_awaits_answer_and_discards_score() {
        // An out-of-range score alongside a question is irrelevant: the
        // question is shown verbatim and the session keeps going.
        let scorer = ScriptedScorer::new(vec![question("Will anyone notice?", 11)]);
        let mut controller = TurnController::new(scorer);

        let event = controller.start("clean garage").await.unwrap();
        assert_eq!(event, SessionEvent::Question("Will anyone notice?".to_string()));
        assert_eq!(controller.state(), SessionState::AwaitingAnswer);
        assert_eq!(controller.current_question(), Some("Will anyone notice?"));
    }

    #[tokio::test]
    async fn terminal_reply_routes_to_decision_engine() {
        let scorer = ScriptedScorer::new(vec![verdict(Some(7))]);
        let mut controller = TurnController::new(scorer);

        let event = controller.start("write report").await.unwrap();
        match event {
            SessionEvent::Verdict { task, decision } => {
                assert_eq!(task, "write report");
                assert!(decision.accepted);
                assert_eq!(decision.score, 7);
            }
            SessionEvent::Question(_) => panic!("terminal reply must never yield a question"),
        }
        assert_eq!(controller.state(), SessionState::Terminal);
        assert!(controller.history().is_empty());
        assert_eq!(controller.task_text(), None);
    }

    #[tokio::test]
    async fn unusable_terminal_scores_normalize_to_neutral() {
        for raw in [Some(11), Some(0), None] {
            let scorer = ScriptedScorer::new(vec![verdict(raw)]);
            let mut controller = TurnController::new(scorer);

            let event = controller.start("stretch").await.unwrap();
            let SessionEvent::Verdict { decision, .. } = event else {
                panic!("expected verdict");
            };
            assert_eq!(decision.score, 5, "raw score {:?}", raw);
            // Neutral sits above the threshold, so leniency accepts.
            assert!(decision.accepted);
        }
    }

    #[tokio::test]
    async fn scorer_failure_parks_state_and_retry_recovers() {
        let scorer = ScriptedScorer::new(vec![
            Err(ScorerError::network_error("connection refused".to_string())),
            question("Still here?", 5),
        ]);
        let mut controller = TurnController::new(scorer.clone());

        let err = controller.start("clean garage").await.unwrap_err();
        assert!(matches!(err, SessionError::Scorer(e) if e.kind == ScorerErrorKind::NetworkError));
        assert_eq!(controller.state(), SessionState::AwaitingQuestion);
        assert_eq!(controller.task_text(), Some("clean garage"));

        let event = controller.request_next().await.unwrap();
        assert_eq!(event, SessionEvent::Question("Still here?".to_string()));
        // Both calls saw the same (empty) history.
        assert_eq!(scorer.seen(), vec![0, 0]);
    }

    #[tokio::test]
    async fn failure_on_final_call_parks_in_awaiting_verdict() {
        let mut replies: Vec<Result<ScorerReply, ScorerError>> = (1..=5)
            .map(|i| question(&format!("Q{i}?"), 5))
            .collect();
        replies.push(Err(ScorerError::server_error(503, "overloaded".to_string())));
        replies.push(verdict(Some(2)));

        let scorer = ScriptedScorer::new(replies);
        let mut controller = TurnController::new(scorer);

        controller.start("clean garage").await.unwrap();
        for i in 1..5 {
            let event = controller.submit_answer(&format!("answer {i}")).await.unwrap();
            assert!(matches!(event, SessionEvent::Question(_)));
        }

        // Fifth answer triggers the final-verdict call, which fails.
        let err = controller.submit_answer("answer 5").await.unwrap_err();
        assert!(matches!(err, SessionError::Scorer(_)));
        assert_eq!(controller.state(), SessionState::AwaitingVerdict);
        assert_eq!(controller.history().len(), MAX_TURNS - 1);

        let event = controller.request_next().await.unwrap();
        let SessionEvent::Verdict { decision, .. } = event else {
            panic!("expected verdict");
        };
        assert!(!decision.accepted);
    }

    #[tokio::test]
    async fn question_field_overrides_local_turn_count() {
        // Even with the budget spent, a reply carrying a question routes back
        // to AwaitingAnswer: the provider is the authority on when to stop.
        let mut replies: Vec<Result<ScorerReply, ScorerError>> = (1..=5)
            .map(|i| question(&format!("Q{i}?"), 5))
            .collect();
        replies.push(question("One more thing...", 5));

        let scorer = ScriptedScorer::new(replies);
        let mut controller = TurnController::new(scorer);

        controller.start("clean garage").await.unwrap();
        for i in 1..=4 {
            controller.submit_answer(&format!("answer {i}")).await.unwrap();
        }
        let event = controller.submit_answer("answer 5").await.unwrap();
        assert_eq!(event, SessionEvent::Question("One more thing...".to_string()));
        assert_eq!(controller.state(), SessionState::AwaitingAnswer);
    }

    #[tokio::test]
    async fn blank_answer_leaves_session_untouched() {
        let scorer = ScriptedScorer::new(vec![question("Why?", 5)]);
        let mut controller = TurnController::new(scorer);

        controller.start("clean garage").await.unwrap();
        let err = controller.submit_answer("  ").await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidInput(_)));
        assert_eq!(controller.state(), SessionState::AwaitingAnswer);
        assert_eq!(controller.current_question(), Some("Why?"));
        assert!(controller.history().is_empty());
    }

    #[tokio::test]
    async fn starting_while_active_is_rejected() {
        let scorer = ScriptedScorer::new(vec![question("Why?", 5)]);
        let mut controller = TurnController::new(scorer);

        controller.start("clean garage").await.unwrap();
        let err = controller.start("another task").await.unwrap_err();
        assert!(matches!(err, SessionError::AlreadyActive));
        assert_eq!(controller.task_text(), Some("clean garage"));
    }

    #[tokio::test]
    async fn start_resets_history_every_time() {
        let scorer = ScriptedScorer::new(vec![
            question("Q1?", 5),
            verdict(Some(8)),
            question("Q1 again?", 5),
        ]);
        let mut controller = TurnController::new(scorer.clone());

        controller.start("write report").await.unwrap();
        controller.submit_answer("yes").await.unwrap();
        assert_eq!(controller.state(), SessionState::Terminal);

        controller.start("clean garage").await.unwrap();
        // Third call saw an empty history again.
        assert_eq!(scorer.seen(), vec![0, 1, 0]);
    }

    #[tokio::test]
    async fn abort_discards_everything() {
        let scorer = ScriptedScorer::new(vec![question("Why?", 5)]);
        let mut controller = TurnController::new(scorer);

        controller.start("clean garage").await.unwrap();
        controller.abort();
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(controller.history().is_empty());
        assert_eq!(controller.task_text(), None);
        assert_eq!(controller.current_question(), None);
    }

    #[tokio::test]
    async fn end_to_end_rejection_leaves_list_unchanged() {
        let mut replies: Vec<Result<ScorerReply, ScorerError>> = (1..=5)
            .map(|i| question(&format!("Q{i}?"), 5))
            .collect();
        replies.push(verdict(Some(3)));

        let scorer = ScriptedScorer::new(replies);
        let mut controller = TurnController::new(scorer);
        let mut tasks = TaskList::new();

        let mut event = controller.start("clean garage").await.unwrap();
        for i in 1..=5 {
            assert!(matches!(event, SessionEvent::Question(_)));
            event = controller.submit_answer(&format!("answer {i}")).await.unwrap();
        }

        let SessionEvent::Verdict { task, decision } = event else {
            panic!("expected verdict after the sixth interaction");
        };
        if decision.accepted {
            tasks.append(&task).unwrap();
        }

        assert!(tasks.is_empty());
        assert!(decision.message.contains("clean garage"));
        assert!(decision.message.contains('3'));
    }

    #[tokio::test]
    async fn end_to_end_acceptance_appends_task() {
        let scorer = ScriptedScorer::new(vec![verdict(Some(8))]);
        let mut controller = TurnController::new(scorer);
        let mut tasks = TaskList::new();

        let event = controller.start("write report").await.unwrap();
        let SessionEvent::Verdict { task, decision } = event else {
            panic!("expected verdict");
        };
        if decision.accepted {
            tasks.append(&task).unwrap();
        }

        assert_eq!(tasks.len(), 1);
        let item = &tasks.items()[0];
        assert_eq!(item.text, "write report");
        assert!(!item.completed);
    }
}
