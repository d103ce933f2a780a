//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::Config;
use crate::scorer::{GeminiScorer, ScorerClient};
use crate::session::{SessionError, SessionEvent, TurnController};
use crate::tasks::{TaskItem, TaskList, TaskListError};

use super::types::*;

/// Shared application state.
///
/// The session sits behind a `Mutex` that every session handler holds across
/// its scorer await: one outstanding scoring call at a time, and no second
/// session can start while one is in flight.
pub struct AppState {
    pub tasks: RwLock<TaskList>,
    pub session: Mutex<TurnController>,
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let scorer: Arc<dyn ScorerClient> = Arc::new(GeminiScorer::new(
        config.api_key.clone(),
        config.scorer_model.clone(),
        config.scorer_timeout,
    )?);

    let state = Arc::new(AppState {
        tasks: RwLock::new(TaskList::new()),
        session: Mutex::new(TurnController::new(scorer)),
    });

    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/:id/toggle", post(toggle_task))
        .route("/api/tasks/:id", axum::routing::delete(remove_task))
        .route("/api/session", get(session_status))
        .route("/api/session/answer", post(submit_answer))
        .route("/api/session/retry", post(retry_session))
        .route("/api/session/abort", post(abort_session))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<Vec<TaskItem>> {
    Json(state.tasks.read().await.items().to_vec())
}

/// Submit a task. This starts the reflective session and returns either the
/// first question or, if the scorer cuts straight to the verdict, the
/// outcome itself.
async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<SessionResponse>, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    let event = session.start(&req.text).await.map_err(session_error)?;
    Ok(Json(consume_event(&state, &session, event).await))
}

async fn session_status(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    let session = state.session.lock().await;
    Json(SessionResponse {
        state: session.state(),
        question: session.current_question().map(String::from),
        verdict: None,
    })
}

async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<SessionResponse>, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    let event = session.submit_answer(&req.answer).await.map_err(session_error)?;
    Ok(Json(consume_event(&state, &session, event).await))
}

/// Re-issue the pending scorer call after a failure.
async fn retry_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionResponse>, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    let event = session.request_next().await.map_err(session_error)?;
    Ok(Json(consume_event(&state, &session, event).await))
}

async fn abort_session(State(state): State<Arc<AppState>>) -> StatusCode {
    state.session.lock().await.abort();
    StatusCode::NO_CONTENT
}

async fn toggle_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskItem>, (StatusCode, String)> {
    let mut tasks = state.tasks.write().await;
    tasks.toggle(id).map_err(task_error)?;
    let item = tasks
        .items()
        .iter()
        .find(|t| t.id == id)
        .cloned()
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Task {} not found", id)))?;
    Ok(Json(item))
}

async fn remove_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.tasks.write().await.remove(id).map_err(task_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Turn a session event into a response, applying the verdict's side effect:
/// an accepted task is appended to the list here, never by the decision
/// engine itself.
async fn consume_event(
    state: &AppState,
    session: &TurnController,
    event: SessionEvent,
) -> SessionResponse {
    match event {
        SessionEvent::Question(question) => SessionResponse {
            state: session.state(),
            question: Some(question),
            verdict: None,
        },
        SessionEvent::Verdict { task, decision } => {
            if decision.accepted {
                // The text was validated non-empty when the session started.
                if let Err(e) = state.tasks.write().await.append(&task) {
                    tracing::error!("Failed to append accepted task \"{}\": {}", task, e);
                }
            }
            SessionResponse {
                state: session.state(),
                question: None,
                verdict: Some(decision.into()),
            }
        }
    }
}

fn session_error(err: SessionError) -> (StatusCode, String) {
    match err {
        SessionError::InvalidInput(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        SessionError::AlreadyActive
        | SessionError::NotAwaitingAnswer
        | SessionError::NothingToRequest => (StatusCode::CONFLICT, err.to_string()),
        SessionError::Scorer(e) => (
            StatusCode::BAD_GATEWAY,
            format!("Could not reach the scorer ({}). The session is unchanged; retry when ready.", e),
        ),
    }
}

fn task_error(err: TaskListError) -> (StatusCode, String) {
    match err {
        TaskListError::EmptyText => (StatusCode::BAD_REQUEST, err.to_string()),
        TaskListError::UnknownTask(_) => (StatusCode::NOT_FOUND, err.to_string()),
    }
}
