//! HTTP API for taskgate.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `GET /api/tasks` - List tasks
//! - `POST /api/tasks` - Submit a task (starts the reflective session)
//! - `POST /api/tasks/{id}/toggle` - Flip a task's completion state
//! - `DELETE /api/tasks/{id}` - Remove a task
//! - `GET /api/session` - Current session state and pending question
//! - `POST /api/session/answer` - Answer the pending question
//! - `POST /api/session/retry` - Retry the pending scorer call after a failure
//! - `POST /api/session/abort` - Discard the session

mod routes;
mod types;

pub use routes::{serve, AppState};
pub use types::*;
