//! # taskgate
//!
//! A to-do list that argues back. Every new task is gated behind a
//! multi-turn reflective interrogation run by a remote language model: up to
//! five sarcastic, demotivating questions, then a final motivation score.
//! Tasks that survive the interrogation (score above the demotivation
//! threshold) join the list; the rest are declared not worth your time.
//!
//! ## Flow
//! 1. User submits task text
//! 2. The turn controller opens a session and asks the scorer for a question
//! 3. Question out, answer in, up to the turn budget
//! 4. The final scoring call returns a bare score (no question) - the
//!    terminal signal
//! 5. The decision engine accepts or rejects; accepted tasks land in the list
//!
//! ## Modules
//! - `session`: conversation store + turn controller state machine
//! - `scorer`: the remote scorer contract and the Gemini implementation
//! - `decision`: the accept/reject call on the terminal score
//! - `tasks`: the task list itself
//! - `api`: axum HTTP presentation layer

pub mod api;
pub mod config;
pub mod decision;
pub mod scorer;
pub mod session;
pub mod tasks;

pub use config::Config;
pub use decision::{decide, Decision, DEMOTIVATION_THRESHOLD};
pub use session::{SessionEvent, SessionState, TurnController, MAX_TURNS};
pub use tasks::{TaskItem, TaskList};
